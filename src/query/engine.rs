// Query execution engine

use serde::Serialize;

use crate::index::document::{IndexDocument, Record};
use crate::index::graph::{EdgeKind, GraphNode, NodeId};
use crate::index::inverted::IndexEntry;
use crate::index::{DefinitionKind, SymbolDefinition, UsageKind, UsageSite};

/// Definitions and usages found for one lookup key. Empty when the key is
/// unknown.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolMatches<'a> {
    pub symbol: String,
    pub count: usize,
    pub definitions: Vec<&'a SymbolDefinition>,
    pub usages: Vec<&'a UsageSite>,
}

impl<'a> SymbolMatches<'a> {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            count: 0,
            definitions: Vec::new(),
            usages: Vec::new(),
        }
    }

    fn push(&mut self, record: Record<'a>) {
        match record {
            Record::Definition(def) => self.definitions.push(def),
            Record::Usage(usage) => self.usages.push(usage),
        }
        self.count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub qualified_name: String,
    pub file: String,
    pub line: u32,
    pub kind: String,
}

/// Read-only queries over a built [`IndexDocument`]
pub struct QueryEngine<'a> {
    document: &'a IndexDocument,
}

impl<'a> QueryEngine<'a> {
    pub fn new(document: &'a IndexDocument) -> Self {
        Self { document }
    }

    fn collect<F>(&self, symbol: &str, entries: &[IndexEntry], mut keep: F) -> SymbolMatches<'a>
    where
        F: FnMut(&Record<'a>) -> bool,
    {
        let mut matches = SymbolMatches::new(symbol);
        for record in entries.iter().filter_map(|e| self.document.record(*e)) {
            if keep(&record) {
                matches.push(record);
            }
        }
        matches
    }

    /// Every definition and usage sharing this bare name
    pub fn find_all_usages(&self, symbol_name: &str) -> SymbolMatches<'a> {
        let entries = self.document.inverted_index.by_name(symbol_name);
        self.collect(symbol_name, entries, |_| true)
    }

    /// Definitions and resolved usages of this exact qualified name, across files
    pub fn find_symbol_by_qualified_name(&self, qualified_name: &str) -> SymbolMatches<'a> {
        let entries = self.document.inverted_index.by_qualified_name(qualified_name);
        self.collect(qualified_name, entries, |_| true)
    }

    /// The `(qualified_name, file_path)` view: definitions declared in that
    /// file and resolved usages located in it
    pub fn find_in_file(&self, qualified_name: &str, file_path: &str) -> SymbolMatches<'a> {
        let entries = self.document.inverted_index.by_qualified_name(qualified_name);
        self.collect(qualified_name, entries, |record| match record {
            Record::Definition(def) => def.file_path == file_path,
            Record::Usage(usage) => usage.file_path == file_path,
        })
    }

    /// Variable definitions plus read/write usages of this name
    pub fn find_variable_usages(&self, variable_name: &str) -> SymbolMatches<'a> {
        let entries = self.document.inverted_index.by_name(variable_name);
        self.collect(variable_name, entries, |record| match record {
            Record::Definition(def) => def.kind == DefinitionKind::Variable,
            Record::Usage(usage) => matches!(usage.kind, UsageKind::Read | UsageKind::Write),
        })
    }

    /// Case-insensitive substring search over definition names
    pub fn search_symbols(&self, query: &str, kind: Option<DefinitionKind>, limit: usize) -> Vec<QueryResult> {
        let needle = query.to_lowercase();
        self.document
            .definitions
            .iter()
            .filter(|d| kind.map_or(true, |k| d.kind == k))
            .filter(|d| d.symbol_name.to_lowercase().contains(&needle))
            .take(limit)
            .map(|d| QueryResult {
                qualified_name: d.qualified_name.clone(),
                file: d.file_path.clone(),
                line: d.line_number,
                kind: d.kind.as_str().to_string(),
            })
            .collect()
    }

    /// Find all callers of a symbol. `line` is the call site.
    pub fn find_callers(&self, qualified_name: &str) -> Vec<QueryResult> {
        let graph = &self.document.graph;
        let mut results = Vec::new();

        for target in self.definition_nodes(qualified_name) {
            for edge in graph.incoming(target, EdgeKind::Calls) {
                if let Some(caller) = graph.node(edge.source) {
                    results.push(result_for(caller, edge.line_number));
                }
            }
        }

        results
    }

    /// Find everything a symbol calls, including unresolved external names
    pub fn find_callees(&self, qualified_name: &str) -> Vec<QueryResult> {
        let graph = &self.document.graph;
        let mut results = Vec::new();

        for source in self.definition_nodes(qualified_name) {
            for edge in graph.outgoing(source, EdgeKind::Calls) {
                if let Some(callee) = graph.node(edge.target) {
                    results.push(result_for(callee, edge.line_number));
                }
            }
        }

        results
    }

    fn definition_nodes(&self, qualified_name: &str) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .document
            .inverted_index
            .by_qualified_name(qualified_name)
            .iter()
            .filter_map(|entry| match self.document.record(*entry)? {
                Record::Definition(def) => self
                    .document
                    .graph
                    .find_definition(&def.qualified_name, &def.file_path),
                Record::Usage(_) => None,
            })
            .collect();
        nodes.dedup();
        nodes
    }
}

fn result_for(node: &GraphNode, site_line: Option<u32>) -> QueryResult {
    match node {
        GraphNode::Definition {
            qualified_name,
            file_path,
            kind,
            line_number,
        } => QueryResult {
            qualified_name: qualified_name.clone(),
            file: file_path.clone(),
            line: site_line.unwrap_or(*line_number),
            kind: kind.as_str().to_string(),
        },
        GraphNode::File { path, .. } => QueryResult {
            qualified_name: "<module>".to_string(),
            file: path.clone(),
            line: site_line.unwrap_or(0),
            kind: "file".to_string(),
        },
        GraphNode::External { name } => QueryResult {
            qualified_name: name.clone(),
            file: String::new(),
            line: site_line.unwrap_or(0),
            kind: "external".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::builder::{FileOutcome, IndexBuilder};
    use crate::index::document::DocumentMetadata;
    use crate::index::{FileRecord, FileStatus};
    use crate::indexer::parser::ExtractorRegistry;

    fn document(sources: &[(&str, &str)]) -> IndexDocument {
        let registry = ExtractorRegistry::builtin();
        let mut builder = IndexBuilder::new();
        for (path, source) in sources {
            builder.add(FileOutcome {
                record: FileRecord {
                    path: path.to_string(),
                    size_bytes: source.len() as u64,
                    language: "python".to_string(),
                    extension: ".py".to_string(),
                    status: FileStatus::Parsed,
                    content_hash: None,
                },
                extraction: Some(registry.extract_file("python", path, source).unwrap()),
                warning: None,
            });
        }
        builder.build(DocumentMetadata::new(None))
    }

    fn sample() -> IndexDocument {
        document(&[
            (
                "handlers.py",
                "RETRIES = 3\n\nclass Handler:\n    def run(self):\n        return RETRIES\n",
            ),
            (
                "main.py",
                "from handlers import Handler\n\ndef main():\n    Handler().run()\n    Handler().run()\n    print('done')\n",
            ),
        ])
    }

    #[test]
    fn test_find_all_usages() {
        let doc = sample();
        let engine = QueryEngine::new(&doc);

        let run = engine.find_all_usages("run");
        assert_eq!(run.definitions.len(), 1);
        assert_eq!(run.usages.len(), 2);
        assert_eq!(run.count, 3);
    }

    #[test]
    fn test_unknown_symbol_is_empty() {
        let doc = sample();
        let engine = QueryEngine::new(&doc);

        let none = engine.find_all_usages("nonexistent_symbol");
        assert!(none.is_empty());
        assert_eq!(none.count, 0);
        assert!(engine.find_symbol_by_qualified_name("No.such").is_empty());
        assert!(engine.find_callers("No.such").is_empty());
    }

    #[test]
    fn test_find_symbol_by_qualified_name() {
        let doc = sample();
        let engine = QueryEngine::new(&doc);

        let matches = engine.find_symbol_by_qualified_name("Handler.run");
        assert_eq!(matches.definitions.len(), 1);
        assert_eq!(matches.usages.len(), 2);
        assert!(matches
            .usages
            .iter()
            .all(|u| u.referenced_qualified_name.as_deref() == Some("Handler.run")));

        let in_main = engine.find_in_file("Handler.run", "main.py");
        assert!(in_main.definitions.is_empty());
        assert_eq!(in_main.usages.len(), 2);
    }

    #[test]
    fn test_same_qualified_name_in_two_files() {
        let handlers = "class Handler:\n    def run(self):\n        pass\n";
        let doc = document(&[
            ("b/handlers.py", handlers),
            ("a/handlers.py", handlers),
            ("main.py", "from handlers import *\n\ndef main():\n    Handler().run()\n"),
        ]);
        let engine = QueryEngine::new(&doc);

        let all = engine.find_symbol_by_qualified_name("Handler.run");
        let files: Vec<_> = all.definitions.iter().map(|d| d.file_path.as_str()).collect();
        assert_eq!(files, vec!["a/handlers.py", "b/handlers.py"]);

        let in_b = engine.find_in_file("Handler.run", "b/handlers.py");
        assert_eq!(in_b.definitions.len(), 1);
        assert_eq!(in_b.definitions[0].file_path, "b/handlers.py");
        assert!(in_b.usages.is_empty());

        // the wildcard import picks the first file by path
        let graph = &doc.graph;
        let in_a = graph.find_definition("Handler.run", "a/handlers.py").unwrap();
        let in_b = graph.find_definition("Handler.run", "b/handlers.py").unwrap();
        assert_eq!(graph.incoming(in_a, EdgeKind::Calls).count(), 1);
        assert_eq!(graph.incoming(in_b, EdgeKind::Calls).count(), 0);

        let callers = engine.find_callers("Handler.run");
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].qualified_name, "main");
    }

    #[test]
    fn test_find_variable_usages() {
        let doc = sample();
        let engine = QueryEngine::new(&doc);

        let retries = engine.find_variable_usages("RETRIES");
        assert_eq!(retries.definitions.len(), 1);
        let kinds: Vec<_> = retries.usages.iter().map(|u| u.kind).collect();
        assert_eq!(kinds, vec![UsageKind::Write, UsageKind::Read]);

        // functions are not variables
        assert!(engine.find_variable_usages("main").definitions.is_empty());
    }

    #[test]
    fn test_search_symbols() {
        let doc = sample();
        let engine = QueryEngine::new(&doc);

        let found: Vec<_> = engine
            .search_symbols("HAND", None, 10)
            .into_iter()
            .map(|r| r.qualified_name)
            .collect();
        assert_eq!(found, vec!["Handler"]);

        let functions = engine.search_symbols("", Some(DefinitionKind::Function), 10);
        assert_eq!(functions.len(), 2);
        assert_eq!(engine.search_symbols("", None, 1).len(), 1);
    }

    #[test]
    fn test_callers_and_callees() {
        let doc = sample();
        let engine = QueryEngine::new(&doc);

        let callers = engine.find_callers("Handler.run");
        assert_eq!(callers.len(), 2);
        assert!(callers.iter().all(|c| c.qualified_name == "main" && c.file == "main.py"));
        assert_eq!(callers[0].line, 4);

        let callees = engine.find_callees("main");
        let names: Vec<_> = callees.iter().map(|c| (c.qualified_name.as_str(), c.kind.as_str())).collect();
        assert!(names.contains(&("Handler", "class")));
        assert!(names.contains(&("Handler.run", "function")));
        assert!(names.contains(&("print", "external")));
    }
}
