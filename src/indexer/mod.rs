// Source tree walking and per-file extraction

pub mod classifier;
pub mod parser;

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, PathFilter};
use crate::error::{ExtractError, IndexError};
use crate::index::builder::{FileOutcome, IndexBuilder};
use crate::index::document::{DocumentMetadata, IndexDocument};
use crate::index::{FileRecord, FileStatus, FileWarning};
use crate::source::SourceProvider;

use classifier::{FileAction, FileClassifier};
use parser::ExtractorRegistry;

/// A regular file found by the walk
#[derive(Debug, Clone)]
struct DiscoveredFile {
    path: PathBuf,
    relative: String,
    size_bytes: u64,
}

/// The main indexer: walks a tree, extracts each file on a bounded worker
/// pool, then hands everything to the [`IndexBuilder`]
pub struct Indexer {
    config: Config,
    classifier: FileClassifier,
    extractors: ExtractorRegistry,
    filter: PathFilter,
    progress: ProgressBar,
}

impl Indexer {
    pub fn new(config: Config) -> Result<Self, IndexError> {
        if config.performance.threads == 0 {
            return Err(IndexError::InvalidConfig("thread count must be greater than 0".to_string()));
        }

        let mut extractors = ExtractorRegistry::builtin();
        extractors.retain(&config.languages.enabled);

        let classifier = FileClassifier::new(
            config.extension_table(),
            extractors.languages().into_iter().map(String::from),
            config.indexing.max_file_size,
        );
        let filter = config.path_filter()?;

        Ok(Self {
            config,
            classifier,
            extractors,
            filter,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report per-file progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Acquire the tree, index it, and release it whatever the outcome
    pub fn index_source(&self, provider: &dyn SourceProvider) -> Result<IndexDocument, IndexError> {
        info!("Acquiring source tree: {}", provider.describe());
        let tree = provider.acquire()?;

        let result = self.index_tree(tree.root());

        if let Err(e) = tree.release() {
            warn!("Failed to release source tree: {}", e);
        }
        result
    }

    /// Index a directory already on local disk
    pub fn index_tree(&self, root: &Path) -> Result<IndexDocument, IndexError> {
        let unavailable = |source| IndexError::SourceUnavailable {
            path: root.to_path_buf(),
            source,
        };
        let metadata = std::fs::metadata(root).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(IndexError::NotADirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root).map_err(unavailable)?;

        let mut builder = IndexBuilder::new();
        let files = self.discover(root, &mut builder);
        info!("Discovered {} files under {}", files.len(), root.display());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.performance.threads)
            .build()?;

        self.progress.set_length(files.len() as u64);
        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let outcome = self.process(file);
                    self.progress.inc(1);
                    outcome
                })
                .collect()
        });
        self.progress.finish_and_clear();

        for outcome in outcomes {
            builder.add(outcome);
        }

        let document = builder.build(DocumentMetadata::new(Some(self.config.project.name.clone())));
        info!(
            "Indexed {} files ({} parsed, {} failed): {} definitions, {} usages",
            document.statistics.total_files,
            document.statistics.parsed_files,
            document.statistics.failed_files,
            document.statistics.definitions,
            document.statistics.usages
        );
        Ok(document)
    }

    /// Walk in file-name order, pruning excluded directories. Unreadable
    /// entries become warnings.
    fn discover(&self, root: &Path, builder: &mut IndexBuilder) -> Vec<DiscoveredFile> {
        let walker = WalkDir::new(root)
            .follow_links(self.config.indexing.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || self
                        .filter
                        .should_index(&relative_path(root, entry.path()), entry.file_type().is_dir())
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| relative_path(root, p)).unwrap_or_default();
                    let reason = match e.io_error() {
                        Some(io) => format!("unreadable: {}", io),
                        None => e.to_string(),
                    };
                    warn!("Skipping {}: {}", path, reason);
                    builder.add_warning(FileWarning { path, reason });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_path(root, entry.path());
            match entry.metadata() {
                Ok(metadata) => files.push(DiscoveredFile {
                    path: entry.path().to_path_buf(),
                    relative,
                    size_bytes: metadata.len(),
                }),
                Err(e) => {
                    let reason = format!("unreadable: {}", e);
                    warn!("Skipping {}: {}", relative, reason);
                    builder.add_warning(FileWarning {
                        path: relative,
                        reason,
                    });
                }
            }
        }
        files
    }

    /// Classify, read and extract one file. Never fails: problems end up in
    /// the outcome's warning.
    fn process(&self, file: &DiscoveredFile) -> FileOutcome {
        let class = self.classifier.classify(&file.path, file.size_bytes);
        let mut record = FileRecord {
            path: file.relative.clone(),
            size_bytes: file.size_bytes,
            language: class.language,
            extension: class.extension,
            status: FileStatus::Opaque,
            content_hash: None,
        };

        match class.action {
            FileAction::Opaque => return outcome(record),
            FileAction::TooLarge => {
                debug!(
                    "Not parsing {}: {} bytes exceeds limit of {}",
                    record.path, record.size_bytes, self.config.indexing.max_file_size
                );
                record.status = FileStatus::TooLarge;
                return outcome(record);
            }
            FileAction::Parse => {}
        }

        let bytes = match std::fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(e) => return failed(record, format!("unreadable: {}", e)),
        };
        let Ok(content) = std::str::from_utf8(&bytes) else {
            return failed(record, ExtractError::Encoding.to_string());
        };

        match self
            .extractors
            .extract_file(&record.language, &record.path, content)
        {
            Ok(extraction) => {
                debug!(
                    "Parsed {}: {} definitions, {} usages",
                    record.path,
                    extraction.definitions.len(),
                    extraction.usages.len()
                );
                record.status = FileStatus::Parsed;
                record.content_hash = Some(blake3::hash(&bytes).to_hex().to_string());
                FileOutcome {
                    record,
                    extraction: Some(extraction),
                    warning: None,
                }
            }
            Err(e) => failed(record, e.to_string()),
        }
    }
}

fn outcome(record: FileRecord) -> FileOutcome {
    FileOutcome {
        record,
        extraction: None,
        warning: None,
    }
}

fn failed(mut record: FileRecord, reason: String) -> FileOutcome {
    warn!("Skipping {}: {}", record.path, reason);
    record.status = FileStatus::Failed;
    FileOutcome {
        warning: Some(FileWarning {
            path: record.path.clone(),
            reason,
        }),
        record,
        extraction: None,
    }
}

/// Root-relative path with `/` separators
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_statuses() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ok.py", b"def f():\n    pass\n");
        write(dir.path(), "broken.py", b"def f(:\n");
        write(dir.path(), "latin1.py", b"x = '\xe9'\n");
        write(dir.path(), "notes.md", b"# notes\n");
        write(dir.path(), "big.go", &vec![b' '; 64]);

        let mut config = Config::default();
        config.indexing.max_file_size = 32;
        let document = Indexer::new(config).unwrap().index_tree(dir.path()).unwrap();

        let status = |path: &str| {
            document
                .files
                .iter()
                .find(|f| f.path == path)
                .map(|f| f.status)
                .unwrap()
        };
        assert_eq!(status("ok.py"), FileStatus::Parsed);
        assert_eq!(status("broken.py"), FileStatus::Failed);
        assert_eq!(status("latin1.py"), FileStatus::Failed);
        assert_eq!(status("notes.md"), FileStatus::Opaque);
        assert_eq!(status("big.go"), FileStatus::TooLarge);

        let warned: Vec<_> = document.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(warned, vec!["broken.py", "latin1.py"]);
        assert!(document.warnings[1].reason.contains("UTF-8"));

        let ok = document.files.iter().find(|f| f.path == "ok.py").unwrap();
        assert_eq!(ok.content_hash.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/main.py", b"x = 1\n");
        write(dir.path(), "node_modules/pkg/index.js", b"var x;\n");
        write(dir.path(), "app/__pycache__/main.cpython-311.pyc", b"\0");

        let document = Indexer::new(Config::default()).unwrap().index_tree(dir.path()).unwrap();
        let paths: Vec<_> = document.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["app/main.py"]);
    }

    #[test]
    fn test_disabled_language_is_opaque() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.go", b"package main\n\nfunc main() {}\n");

        let mut config = Config::default();
        config.languages.enabled = vec!["python".to_string()];
        let document = Indexer::new(config).unwrap().index_tree(dir.path()).unwrap();
        assert_eq!(document.files[0].status, FileStatus::Opaque);
        assert!(document.definitions.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let indexer = Indexer::new(Config::default()).unwrap();
        let err = indexer.index_tree(Path::new("/no/such/tree")).unwrap_err();
        assert!(matches!(err, IndexError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = Config::default();
        config.performance.threads = 0;
        assert!(matches!(Indexer::new(config), Err(IndexError::InvalidConfig(_))));
    }
}
