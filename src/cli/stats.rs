use std::path::PathBuf;

use anyhow::{Context, Result};

use codeindex::IndexDocument;

pub async fn show_stats(index: PathBuf, detailed: bool) -> Result<()> {
    let json = tokio::fs::read_to_string(&index)
        .await
        .with_context(|| format!("Failed to read index {}", index.display()))?;
    let document = IndexDocument::from_json(&json)?;
    let metadata = &document.metadata;
    let stats = &document.statistics;

    println!("codeindex Statistics v{}", env!("CARGO_PKG_VERSION"));
    println!("Index: {}", index.display());
    println!(
        "Repository: {}",
        metadata.repository.as_deref().unwrap_or("(unnamed)")
    );
    println!("Indexed at: {}", metadata.indexed_at);
    println!(
        "Format: v{} (written by codeindex {})",
        metadata.format_version, metadata.tool_version
    );

    println!("\nIndex Statistics:");
    println!("  Total files: {}", stats.total_files);
    println!("  Parsed files: {}", stats.parsed_files);
    println!("  Failed files: {}", stats.failed_files);
    println!("  Opaque files: {}", stats.opaque_files);
    println!("  Too large: {}", stats.too_large_files);
    println!("  Source size: {:.2} MB", stats.total_bytes as f64 / (1024.0 * 1024.0));
    println!("  Definitions: {}", stats.definitions);
    println!(
        "  Usages: {} ({} unresolved)",
        stats.usages, stats.unresolved_usages
    );
    println!("  Graph: {} nodes, {} edges", stats.graph_nodes, stats.graph_edges);
    println!("  Index size: {:.2} MB", json.len() as f64 / (1024.0 * 1024.0));

    if detailed {
        println!("\nDetailed Statistics:");

        if !stats.by_language.is_empty() {
            println!("  Languages:");
            for (lang, count) in sorted_by_count(&stats.by_language) {
                println!("    {}: {} files", lang, count);
            }
        }

        if !stats.by_extension.is_empty() {
            println!("  Extensions:");
            for (ext, count) in sorted_by_count(&stats.by_extension) {
                println!("    {}: {} files", ext, count);
            }
        }

        let mut by_kind = std::collections::BTreeMap::new();
        for def in &document.definitions {
            *by_kind.entry(def.kind.as_str().to_string()).or_insert(0usize) += 1;
        }
        if !by_kind.is_empty() {
            println!("  Definitions by kind:");
            for (kind, count) in sorted_by_count(&by_kind) {
                println!("    {}: {}", kind, count);
            }
        }

        if !document.warnings.is_empty() {
            println!("  Warnings:");
            for warning in &document.warnings {
                println!("    {}: {}", warning.path, warning.reason);
            }
        }
    }

    Ok(())
}

/// Largest count first, then by name
fn sorted_by_count(counts: &std::collections::BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut rows: Vec<_> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    rows
}
