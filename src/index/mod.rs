// Index data model: file records, definitions, usage sites

pub mod builder;
pub mod document;
pub mod graph;
pub mod inverted;
pub mod resolver;

use serde::{Deserialize, Serialize};

/// A discovered file. Only metadata is kept, never the file's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub size_bytes: u64,
    pub language: String,
    pub extension: String,
    pub status: FileStatus,
    /// blake3 of the content, present only for files that were read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// What the indexer did with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Parsed,
    Opaque,
    TooLarge,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Parsed => "parsed",
            FileStatus::Opaque => "opaque",
            FileStatus::TooLarge => "too_large",
            FileStatus::Failed => "failed",
        }
    }
}

/// Definition kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Function,
    Class,
    Variable,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Function => "function",
            DefinitionKind::Class => "class",
            DefinitionKind::Variable => "variable",
        }
    }
}

impl std::str::FromStr for DefinitionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "function" => Ok(DefinitionKind::Function),
            "class" => Ok(DefinitionKind::Class),
            "variable" => Ok(DefinitionKind::Variable),
            _ => anyhow::bail!("Unknown definition kind: {}", s),
        }
    }
}

/// A symbol definition (function, class, variable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    pub symbol_name: String,
    pub qualified_name: String,
    pub kind: DefinitionKind,
    pub file_path: String,
    /// Enclosing scope names, outermost first, excluding the symbol itself
    pub scope_path: Vec<String>,
    pub line_number: u32,
    /// Parameter names of a function, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    /// Base classes (Python) or embedded types (Go), as identifiers or
    /// dotted names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
}

/// Usage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Call,
    Import,
    Read,
    Write,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Call => "call",
            UsageKind::Import => "import",
            UsageKind::Read => "read",
            UsageKind::Write => "write",
        }
    }
}

/// What a member access or method call is made on.
///
/// Only identifiers are ever captured here, so a receiver never carries
/// source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum Receiver {
    /// Plain name, no receiver
    #[default]
    None,
    /// `self` / `cls` in Python, the method receiver variable in Go
    SelfRef,
    /// `X.m()`, `X().m()`, `pkg.F()`
    Name(String),
    /// Any other expression (`a.b.c()`, `f()[0].m()`)
    Opaque,
}

impl Receiver {
    pub fn is_none(&self) -> bool {
        matches!(self, Receiver::None)
    }
}

/// A reference to a name: call, import, read or write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSite {
    pub referenced_name: String,
    /// `None` when static resolution failed
    pub referenced_qualified_name: Option<String>,
    pub file_path: String,
    pub line_number: u32,
    pub kind: UsageKind,
    pub scope_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Receiver::is_none")]
    pub receiver: Receiver,
}

impl UsageSite {
    pub fn is_resolved(&self) -> bool {
        self.referenced_qualified_name.is_some()
    }
}

/// A name bound by an import statement. Resolution input only, not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Name the import introduces into scope (alias when present)
    pub local_name: String,
    /// Module as written, e.g. `pkg.handlers`, `..util`, `github.com/acme/app/db`
    pub module: String,
    /// Imported member for `from m import n`; `*` for wildcard imports
    pub member: Option<String>,
    pub scope_path: Vec<String>,
    pub line_number: u32,
}

impl ImportBinding {
    pub fn is_wildcard(&self) -> bool {
        self.member.as_deref() == Some("*")
    }

    /// Name recorded on the import's usage site
    pub fn referenced_name(&self) -> &str {
        match self.member.as_deref() {
            Some(member) if member != "*" => member,
            _ => &self.module,
        }
    }

    /// Module the local name refers to. `import a.b` binds `a`, not `a.b`.
    pub fn bound_module(&self) -> &str {
        if self.member.is_none()
            && self.module.len() > self.local_name.len()
            && self.module.starts_with(&self.local_name)
            && self.module[self.local_name.len()..].starts_with('.')
        {
            &self.module[..self.local_name.len()]
        } else {
            &self.module
        }
    }
}

/// Everything extracted from one parsed file
#[derive(Debug, Clone, Default)]
pub struct FileExtraction {
    pub definitions: Vec<SymbolDefinition>,
    pub usages: Vec<UsageSite>,
    pub imports: Vec<ImportBinding>,
}

/// A recoverable per-file problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWarning {
    pub path: String,
    pub reason: String,
}
