use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

use codeindex::source::LocalDirectory;
use codeindex::{Config, Indexer};

/// Flags that override the loaded configuration
#[derive(Debug, Default)]
pub struct IndexOptions {
    pub output: Option<PathBuf>,
    pub repository: Option<String>,
    pub threads: Option<usize>,
    pub max_file_size: Option<u64>,
    pub show_progress: bool,
}

pub async fn index_project(project: PathBuf, mut config: Config, options: IndexOptions) -> Result<()> {
    info!("Indexing project: {}", project.display());

    if let Some(repository) = options.repository {
        config.project.name = repository;
    }
    if let Some(threads) = options.threads {
        config.performance.threads = threads;
    }
    if let Some(max_file_size) = options.max_file_size {
        config.indexing.max_file_size = max_file_size;
    }
    config.validate()?;

    // A relative configured path lands next to the indexed tree
    let output = options
        .output
        .unwrap_or_else(|| project.join(&config.output.path));
    let pretty = config.output.pretty;

    println!("codeindex v{}", env!("CARGO_PKG_VERSION"));
    println!("Project: {}", project.display());
    println!("Repository: {}", config.project.name);
    println!("Languages: {}", config.languages.enabled.join(", "));
    println!("Threads: {}", config.performance.threads);
    println!("Output: {}", output.display());

    let progress = if options.show_progress {
        let pb = ProgressBar::new(0);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let indexer = Indexer::new(config)?.with_progress(progress);
    let source = LocalDirectory::new(&project);

    // Extraction is CPU bound; keep it off the async runtime
    let (document, output) = tokio::task::spawn_blocking(move || -> Result<_> {
        let document = indexer.index_source(&source)?;
        document.save(&output, pretty)?;
        Ok((document, output))
    })
    .await
    .context("Indexing task panicked")??;

    let stats = &document.statistics;
    println!("\nIndexing complete!");
    println!(
        "Files: {} ({} parsed, {} failed, {} opaque, {} too large)",
        stats.total_files, stats.parsed_files, stats.failed_files, stats.opaque_files, stats.too_large_files
    );
    println!("Definitions: {}", stats.definitions);
    println!(
        "Usages: {} ({} unresolved)",
        stats.usages, stats.unresolved_usages
    );
    println!("Graph: {} nodes, {} edges", stats.graph_nodes, stats.graph_edges);

    if !document.warnings.is_empty() {
        println!("\n{} files skipped with warnings:", document.warnings.len());
        for warning in &document.warnings {
            println!("  - {}: {}", warning.path, warning.reason);
        }
    }

    println!("\nIndex written to {}", output.display());
    Ok(())
}
