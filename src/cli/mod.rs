// CLI command implementations

pub mod index;
pub mod languages;
pub mod query;
pub mod stats;
