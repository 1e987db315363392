use std::path::PathBuf;

use anyhow::{Context, Result};

use codeindex::index::DefinitionKind;
use codeindex::query::{QueryEngine, QueryResult, SymbolMatches};
use codeindex::IndexDocument;

const SEARCH_LIMIT: usize = 50;

pub struct QueryRequest {
    pub query_type: String,
    pub target: String,
    pub file: Option<String>,
    pub kind: Option<String>,
}

pub async fn query_index(request: QueryRequest, index: PathBuf, format: String) -> Result<()> {
    if format != "text" && format != "json" {
        anyhow::bail!("Unknown format: {}", format);
    }
    let kind = request
        .kind
        .as_deref()
        .map(str::parse::<DefinitionKind>)
        .transpose()?;

    let json = tokio::fs::read_to_string(&index)
        .await
        .with_context(|| format!("Failed to read index {}", index.display()))?;
    let document = IndexDocument::from_json(&json)?;
    let engine = QueryEngine::new(&document);
    let target = request.target.as_str();

    match request.query_type.as_str() {
        "usages" => print_matches(&engine.find_all_usages(target), &format),
        "qualified" => {
            let matches = match &request.file {
                Some(file) => engine.find_in_file(target, file),
                None => engine.find_symbol_by_qualified_name(target),
            };
            print_matches(&matches, &format)
        }
        "variable" => print_matches(&engine.find_variable_usages(target), &format),
        "search" => print_results("search", target, &engine.search_symbols(target, kind, SEARCH_LIMIT), &format),
        "callers" => print_results("callers", target, &engine.find_callers(target), &format),
        "callees" => print_results("callees", target, &engine.find_callees(target), &format),
        other => anyhow::bail!(
            "Unknown query type: {} (expected usages, qualified, variable, search, callers, callees)",
            other
        ),
    }
}

fn print_matches(matches: &SymbolMatches<'_>, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        println!("No results found for '{}'", matches.symbol);
        return Ok(());
    }

    println!("Found {} results for '{}':", matches.count, matches.symbol);
    if !matches.definitions.is_empty() {
        println!("\nDefinitions:");
        for def in &matches.definitions {
            println!(
                "  {}:{} - {} ({})",
                def.file_path,
                def.line_number,
                def.qualified_name,
                def.kind.as_str()
            );
        }
    }
    if !matches.usages.is_empty() {
        println!("\nUsages:");
        for usage in &matches.usages {
            println!(
                "  {}:{} - {} [{}] -> {}",
                usage.file_path,
                usage.line_number,
                usage.referenced_name,
                usage.kind.as_str(),
                usage.referenced_qualified_name.as_deref().unwrap_or("<unresolved>")
            );
        }
    }
    Ok(())
}

fn print_results(query_type: &str, target: &str, results: &[QueryResult], format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for {} of '{}'", query_type, target);
        return Ok(());
    }

    println!("Found {} results:", results.len());
    for result in results {
        if result.file.is_empty() {
            println!("  {} ({})", result.qualified_name, result.kind);
        } else {
            println!(
                "  {}:{} - {} ({})",
                result.file, result.line, result.qualified_name, result.kind
            );
        }
    }
    Ok(())
}
