// Fan-in: per-file results -> resolved index document

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::document::{DocumentMetadata, IndexDocument, Statistics};
use super::graph::{EdgeKind, NodeId, RelationshipGraph};
use super::inverted::InvertedIndex;
use super::resolver::{qualify, Resolution, Resolver};
use super::{
    FileExtraction, FileRecord, FileWarning, ImportBinding, SymbolDefinition, UsageKind, UsageSite,
};

/// Result of processing one file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub record: FileRecord,
    /// Present only for successfully parsed files
    pub extraction: Option<FileExtraction>,
    pub warning: Option<FileWarning>,
}

/// Collects every file's outcome, then resolves and assembles the document.
/// Nothing is resolved until all outcomes are in.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    outcomes: Vec<FileOutcome>,
    /// Problems not tied to a recorded file (unreadable directory entries)
    warnings: Vec<FileWarning>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn add_warning(&mut self, warning: FileWarning) {
        self.warnings.push(warning);
    }

    pub fn build(mut self, metadata: DocumentMetadata) -> IndexDocument {
        self.outcomes.sort_by(|a, b| a.record.path.cmp(&b.record.path));

        let mut files = Vec::new();
        let mut warnings = self.warnings;
        let mut definitions: Vec<SymbolDefinition> = Vec::new();
        let mut usages: Vec<UsageSite> = Vec::new();
        let mut imports: HashMap<String, Vec<ImportBinding>> = HashMap::new();

        for outcome in self.outcomes {
            if let Some(warning) = outcome.warning {
                warnings.push(warning);
            }
            if let Some(extraction) = outcome.extraction {
                definitions.extend(extraction.definitions);
                usages.extend(extraction.usages);
                if !extraction.imports.is_empty() {
                    imports.insert(outcome.record.path.clone(), extraction.imports);
                }
            }
            files.push(outcome.record);
        }
        warnings.sort_by(|a, b| a.path.cmp(&b.path));

        let (resolutions, graph) = {
            let resolver = Resolver::new(&files, &definitions, &imports);
            let resolutions: Vec<Resolution> = usages.iter().map(|u| resolver.resolve(u)).collect();
            let graph = build_graph(&files, &definitions, &usages, &resolutions, &resolver);
            (resolutions, graph)
        };

        for (usage, resolution) in usages.iter_mut().zip(&resolutions) {
            if let Resolution::Definition(idx) = resolution {
                usage.referenced_qualified_name = Some(definitions[*idx].qualified_name.clone());
            }
        }

        let inverted_index = InvertedIndex::build(&definitions, &usages);
        let statistics = Statistics::compute(&files, &definitions, &usages, &graph);

        debug!(
            "Built index: {} files, {} definitions, {} usages ({} unresolved), {} nodes, {} edges",
            statistics.total_files,
            statistics.definitions,
            statistics.usages,
            statistics.unresolved_usages,
            statistics.graph_nodes,
            statistics.graph_edges
        );

        IndexDocument {
            metadata,
            statistics,
            files,
            definitions,
            usages,
            inverted_index,
            graph,
            warnings,
        }
    }
}

/// File nodes, then definition nodes, then external placeholders as first met
fn build_graph(
    files: &[FileRecord],
    definitions: &[SymbolDefinition],
    usages: &[UsageSite],
    resolutions: &[Resolution],
    resolver: &Resolver,
) -> RelationshipGraph {
    let mut graph = RelationshipGraph::new();

    let file_nodes: HashMap<&str, NodeId> = files
        .iter()
        .map(|f| (f.path.as_str(), graph.file_node(&f.path, &f.language)))
        .collect();

    let def_nodes: Vec<NodeId> = definitions
        .iter()
        .map(|d| graph.definition_node(&d.qualified_name, &d.file_path, d.kind, d.line_number))
        .collect();

    // a redefinition in the same file shares the first definition's node
    let mut defined: HashSet<NodeId> = HashSet::new();
    for (idx, def) in definitions.iter().enumerate() {
        if !defined.insert(def_nodes[idx]) {
            continue;
        }
        let parent = def
            .scope_path
            .split_last()
            .and_then(|(name, outer)| resolver.find(&def.file_path, &qualify(outer, name)))
            .map(|p| def_nodes[p]);
        let source = match parent {
            Some(node) => node,
            None => file_nodes[def.file_path.as_str()],
        };
        graph.add_edge(source, def_nodes[idx], EdgeKind::Defines, None);
    }

    for (usage, resolution) in usages.iter().zip(resolutions) {
        let kind = match usage.kind {
            UsageKind::Call => EdgeKind::Calls,
            UsageKind::Import => EdgeKind::Imports,
            UsageKind::Read | UsageKind::Write => continue,
        };

        let source = enclosing_definition(resolver, usage)
            .map(|idx| def_nodes[idx])
            .unwrap_or_else(|| file_nodes[usage.file_path.as_str()]);

        let target = match resolution {
            Resolution::Definition(idx) => def_nodes[*idx],
            Resolution::Module(module_files) if kind == EdgeKind::Imports => module_files
                .first()
                .and_then(|f| file_nodes.get(f.as_str()).copied())
                .unwrap_or_else(|| graph.external_node(&usage.referenced_name)),
            _ => graph.external_node(&usage.referenced_name),
        };

        graph.add_edge(source, target, kind, Some(usage.line_number));
    }

    graph
}

/// Innermost definition whose body contains the usage
fn enclosing_definition(resolver: &Resolver, usage: &UsageSite) -> Option<usize> {
    let scope = &usage.scope_path;
    (1..=scope.len())
        .rev()
        .find_map(|depth| resolver.find(&usage.file_path, &qualify(&scope[..depth - 1], &scope[depth - 1])))
}
