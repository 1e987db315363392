// Query layer over built index documents

pub mod engine;

pub use engine::{QueryEngine, QueryResult, SymbolMatches};
