//! Privacy-preserving codebase indexer.
//!
//! Walks a source tree, extracts symbol definitions and usages from Python
//! and Go files, resolves references to qualified names, and emits a JSON
//! document (files, definitions, usages, inverted index, relationship graph)
//! that never carries source text.

pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod query;
pub mod source;

pub use config::Config;
pub use error::{ExtractError, IndexError};
pub use index::document::IndexDocument;
pub use indexer::Indexer;
pub use query::QueryEngine;
