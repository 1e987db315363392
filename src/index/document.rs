// The persisted index document

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::graph::RelationshipGraph;
use super::inverted::{IndexEntry, InvertedIndex};
use super::{FileRecord, FileStatus, FileWarning, SymbolDefinition, UsageSite};
use crate::error::IndexError;

/// Bumped whenever the document layout changes
pub const FORMAT_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Repository identifier, a label only
    pub repository: Option<String>,
    pub indexed_at: String,
    pub format_version: String,
    pub tool_version: String,
}

impl DocumentMetadata {
    pub fn new(repository: Option<String>) -> Self {
        Self {
            repository,
            indexed_at: chrono::Utc::now().to_rfc3339(),
            format_version: FORMAT_VERSION.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_files: usize,
    pub parsed_files: usize,
    pub failed_files: usize,
    pub opaque_files: usize,
    pub too_large_files: usize,
    pub total_bytes: u64,
    pub by_language: BTreeMap<String, usize>,
    pub by_extension: BTreeMap<String, usize>,
    pub definitions: usize,
    pub usages: usize,
    pub unresolved_usages: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

impl Statistics {
    pub fn compute(
        files: &[FileRecord],
        definitions: &[SymbolDefinition],
        usages: &[UsageSite],
        graph: &RelationshipGraph,
    ) -> Self {
        let mut stats = Statistics {
            total_files: files.len(),
            definitions: definitions.len(),
            usages: usages.len(),
            unresolved_usages: usages.iter().filter(|u| !u.is_resolved()).count(),
            graph_nodes: graph.node_count(),
            graph_edges: graph.edge_count(),
            ..Default::default()
        };

        for file in files {
            stats.total_bytes += file.size_bytes;
            *stats.by_language.entry(file.language.clone()).or_default() += 1;
            let ext = if file.extension.is_empty() {
                "(none)".to_string()
            } else {
                file.extension.clone()
            };
            *stats.by_extension.entry(ext).or_default() += 1;

            match file.status {
                FileStatus::Parsed => stats.parsed_files += 1,
                FileStatus::Failed => stats.failed_files += 1,
                FileStatus::Opaque => stats.opaque_files += 1,
                FileStatus::TooLarge => stats.too_large_files += 1,
            }
        }

        stats
    }
}

/// Everything one indexing run produces. Holds metadata only, no source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub metadata: DocumentMetadata,
    pub statistics: Statistics,
    pub files: Vec<FileRecord>,
    pub definitions: Vec<SymbolDefinition>,
    pub usages: Vec<UsageSite>,
    pub inverted_index: InvertedIndex,
    pub graph: RelationshipGraph,
    pub warnings: Vec<FileWarning>,
}

/// A definition or usage pointed to by an [`IndexEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    Definition(&'a SymbolDefinition),
    Usage(&'a UsageSite),
}

impl IndexDocument {
    pub fn record(&self, entry: IndexEntry) -> Option<Record<'_>> {
        match entry {
            IndexEntry::Definition(i) => self.definitions.get(i).map(Record::Definition),
            IndexEntry::Usage(i) => self.usages.get(i).map(Record::Usage),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, IndexError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let mut document: IndexDocument = serde_json::from_str(json)?;
        document.graph.reindex();
        Ok(document)
    }

    /// Write to `path` through a temp file in the same directory, so readers
    /// never observe a partial document
    pub fn save(&self, path: impl AsRef<Path>, pretty: bool) -> Result<(), IndexError> {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            if pretty {
                serde_json::to_writer_pretty(&mut writer, self)?;
            } else {
                serde_json::to_writer(&mut writer, self)?;
            }
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

        tracing::debug!("Wrote index document to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}
