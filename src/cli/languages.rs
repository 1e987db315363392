use codeindex::indexer::classifier::ExtensionTable;
use codeindex::indexer::parser::ExtractorRegistry;
use codeindex::Config;

pub fn list_languages(config: &Config) {
    let registry = ExtractorRegistry::builtin();
    let table = config.extension_table();

    println!("Parsed languages:");
    for language in registry.languages() {
        let status = if config.languages.enabled.iter().any(|l| l == language) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  {} ({}): {}", language, status, extensions_for(&table, language).join(", "));
    }

    println!("\nRecorded without parsing:");
    let mut others: Vec<&str> = table
        .entries()
        .into_iter()
        .map(|(_, language)| language)
        .filter(|language| !registry.supports(language))
        .collect();
    others.sort_unstable();
    others.dedup();
    for language in others {
        println!("  {}: {}", language, extensions_for(&table, language).join(", "));
    }
}

fn extensions_for<'a>(table: &'a ExtensionTable, language: &str) -> Vec<&'a str> {
    table
        .entries()
        .into_iter()
        .filter(|(_, lang)| *lang == language)
        .map(|(ext, _)| ext)
        .collect()
}
