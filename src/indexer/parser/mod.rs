// Language extractors

pub mod go;
pub mod python;

use std::collections::{HashMap, HashSet};

use tree_sitter::{Language, Node, Parser as TreeParser, Tree};

use crate::error::ExtractError;
use crate::index::resolver::qualify;
use crate::index::{
    DefinitionKind, FileExtraction, ImportBinding, Receiver, SymbolDefinition, UsageKind, UsageSite,
};

pub use go::GoExtractor;
pub use python::PythonExtractor;

/// Whether a name is being loaded or stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    /// Store to a name declared `global`/`nonlocal`: a write, never a definition
    Rebind,
}

/// One syntactic fact pulled out of a file, before qualification.
///
/// `scope` is the scope stack at the site, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxItem {
    Function {
        name: String,
        scope: Vec<String>,
        line: u32,
        parameters: Vec<String>,
    },
    Class {
        name: String,
        scope: Vec<String>,
        line: u32,
        bases: Vec<String>,
    },
    Variable {
        name: String,
        scope: Vec<String>,
        line: u32,
        access: Access,
        receiver: Receiver,
    },
    Call {
        name: String,
        scope: Vec<String>,
        line: u32,
        receiver: Receiver,
    },
    Import(ImportBinding),
}

/// Stack of enclosing class/function names, owned by a single traversal
#[derive(Debug, Default, Clone)]
pub struct ScopeStack {
    frames: Vec<String>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.frames.push(name.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.frames.clone()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Syntax-only symbol extraction for one language
pub trait SymbolExtractor: Send + Sync {
    fn language(&self) -> &'static str;

    /// Items in traversal order. Fails only when the file cannot be parsed.
    fn extract(&self, content: &str) -> Result<Vec<SyntaxItem>, ExtractError>;
}

/// Extractors keyed by language name
pub struct ExtractorRegistry {
    extractors: HashMap<&'static str, Box<dyn SymbolExtractor>>,
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PythonExtractor::new()));
        registry.register(Box::new(GoExtractor::new()));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn SymbolExtractor>) {
        self.extractors.insert(extractor.language(), extractor);
    }

    /// Keep only the listed languages
    pub fn retain(&mut self, enabled: &[String]) {
        self.extractors
            .retain(|lang, _| enabled.iter().any(|e| e == lang));
    }

    pub fn get(&self, language: &str) -> Option<&dyn SymbolExtractor> {
        self.extractors.get(language).map(|e| e.as_ref())
    }

    pub fn supports(&self, language: &str) -> bool {
        self.extractors.contains_key(language)
    }

    pub fn languages(&self) -> Vec<&'static str> {
        let mut langs: Vec<_> = self.extractors.keys().copied().collect();
        langs.sort_unstable();
        langs
    }

    /// Extract and qualify one file's records
    pub fn extract_file(
        &self,
        language: &str,
        file_path: &str,
        content: &str,
    ) -> Result<FileExtraction, ExtractError> {
        let extractor = self
            .get(language)
            .ok_or_else(|| ExtractError::Unsupported(language.to_string()))?;
        let items = extractor.extract(content)?;
        Ok(lower(file_path, items))
    }
}

/// Parse `content`, rejecting trees that contain syntax errors
pub(crate) fn parse_tree(language: &Language, content: &str) -> Result<Tree, ExtractError> {
    let mut parser = TreeParser::new();
    parser.set_language(language)?;

    let tree = parser.parse(content, None).ok_or(ExtractError::NoTree)?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(ExtractError::Syntax { line });
    }

    Ok(tree)
}

fn first_error_line(node: Node) -> Option<u32> {
    if node.is_error() || node.is_missing() {
        return Some(line_of(node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(line) = first_error_line(child) {
                return Some(line);
            }
        }
    }
    None
}

/// 1-based line of a node's start
pub(crate) fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

pub(crate) fn node_text<'a>(node: Node, content: &'a str) -> Option<&'a str> {
    node.utf8_text(content.as_bytes()).ok()
}

/// Turn raw items into definitions, usages and import bindings.
///
/// A name's first plain assignment in a scope defines a variable unless the
/// file already defines that qualified name. Every store and load is a usage.
pub fn lower(file_path: &str, items: Vec<SyntaxItem>) -> FileExtraction {
    let mut extraction = FileExtraction::default();
    let mut defined: HashSet<String> = HashSet::new();

    let usage = |name: String, scope: Vec<String>, line: u32, kind: UsageKind, receiver: Receiver| UsageSite {
        referenced_name: name,
        referenced_qualified_name: None,
        file_path: file_path.to_string(),
        line_number: line,
        kind,
        scope_path: scope,
        receiver,
    };

    for item in items {
        match item {
            SyntaxItem::Function {
                name,
                scope,
                line,
                parameters,
            } => {
                let def = push_definition(&mut extraction, &mut defined, file_path, name, scope, line, DefinitionKind::Function);
                def.parameters = parameters;
            }
            SyntaxItem::Class {
                name,
                scope,
                line,
                bases,
            } => {
                let def = push_definition(&mut extraction, &mut defined, file_path, name, scope, line, DefinitionKind::Class);
                def.bases = bases;
            }
            SyntaxItem::Variable {
                name,
                scope,
                line,
                access,
                receiver,
            } => {
                let kind = match access {
                    Access::Read => UsageKind::Read,
                    Access::Write | Access::Rebind => UsageKind::Write,
                };
                if access == Access::Write
                    && receiver.is_none()
                    && !defined.contains(&qualify(&scope, &name))
                {
                    push_definition(
                        &mut extraction,
                        &mut defined,
                        file_path,
                        name.clone(),
                        scope.clone(),
                        line,
                        DefinitionKind::Variable,
                    );
                }
                extraction.usages.push(usage(name, scope, line, kind, receiver));
            }
            SyntaxItem::Call {
                name,
                scope,
                line,
                receiver,
            } => {
                extraction
                    .usages
                    .push(usage(name, scope, line, UsageKind::Call, receiver));
            }
            SyntaxItem::Import(binding) => {
                extraction.usages.push(usage(
                    binding.referenced_name().to_string(),
                    binding.scope_path.clone(),
                    binding.line_number,
                    UsageKind::Import,
                    Receiver::None,
                ));
                extraction.imports.push(binding);
            }
        }
    }

    extraction.definitions.sort_by_key(|d| d.line_number);
    extraction.usages.sort_by_key(|u| u.line_number);
    extraction.imports.sort_by_key(|b| b.line_number);
    extraction
}

fn push_definition<'e>(
    extraction: &'e mut FileExtraction,
    defined: &mut HashSet<String>,
    file_path: &str,
    name: String,
    scope: Vec<String>,
    line: u32,
    kind: DefinitionKind,
) -> &'e mut SymbolDefinition {
    let qualified_name = qualify(&scope, &name);
    defined.insert(qualified_name.clone());
    let idx = extraction.definitions.len();
    extraction.definitions.push(SymbolDefinition {
        symbol_name: name,
        qualified_name,
        kind,
        file_path: file_path.to_string(),
        scope_path: scope,
        line_number: line,
        parameters: Vec::new(),
        bases: Vec::new(),
    });
    &mut extraction.definitions[idx]
}
