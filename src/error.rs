// Error taxonomy for indexing runs

use std::path::PathBuf;

/// Fatal errors. Any of these aborts the run before output is written.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Source tree unavailable at {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-file extraction failures. These never abort a run; the indexer turns
/// them into a [`FileWarning`](crate::index::FileWarning).
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("syntax error at line {line}")]
    Syntax { line: u32 },

    #[error("parser unavailable: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("no extractor for language: {0}")]
    Unsupported(String),

    #[error("unsupported encoding (not valid UTF-8)")]
    Encoding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_message_has_no_source_text() {
        let err = ExtractError::Syntax { line: 12 };
        assert_eq!(err.to_string(), "syntax error at line 12");
    }

    #[test]
    fn test_unsupported_names_language() {
        let err = ExtractError::Unsupported("kotlin".to_string());
        assert_eq!(err.to_string(), "no extractor for language: kotlin");
    }

    #[test]
    fn test_source_unavailable_names_path() {
        let err = IndexError::SourceUnavailable {
            path: PathBuf::from("/tmp/missing"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/missing"));
    }
}
