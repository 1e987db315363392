// File classification by extension

use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Language label for extensions missing from the table
pub const OTHER_LANGUAGE: &str = "other";

const BUILTIN_EXTENSIONS: &[(&str, &str)] = &[
    (".kt", "kotlin"),
    (".kts", "kotlin"),
    (".java", "java"),
    (".m", "objective-c"),
    (".mm", "objective-c"),
    (".swift", "swift"),
    (".dart", "dart"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
    (".py", "python"),
    (".pyi", "python"),
    (".go", "go"),
    (".rs", "rust"),
    (".cpp", "cpp"),
    (".cc", "cpp"),
    (".cxx", "cpp"),
    (".hpp", "cpp"),
    (".c", "c"),
    (".h", "c"),
    (".cs", "csharp"),
    (".rb", "ruby"),
    (".php", "php"),
    (".json", "json"),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".toml", "toml"),
    (".xml", "xml"),
    (".html", "html"),
    (".css", "css"),
    (".md", "markdown"),
    (".txt", "text"),
    (".sh", "shell"),
    (".bash", "shell"),
    (".zsh", "shell"),
    (".sql", "sql"),
    (".dockerfile", "dockerfile"),
];

/// Extension (lower case, leading dot) to language table
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    map: HashMap<String, String>,
}

impl ExtensionTable {
    pub fn builtin() -> Self {
        let map = BUILTIN_EXTENSIONS
            .iter()
            .map(|(ext, lang)| (ext.to_string(), lang.to_string()))
            .collect();
        Self { map }
    }

    /// Merge overrides over the table. Keys are accepted with or without the dot.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (ext, lang) in overrides {
            self.map.insert(normalize_extension(ext), lang.to_lowercase());
        }
        self
    }

    pub fn language_of(&self, extension: &str) -> &str {
        self.map
            .get(extension)
            .map(String::as_str)
            .unwrap_or(OTHER_LANGUAGE)
    }

    /// All (extension, language) pairs, sorted by extension
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .map
            .iter()
            .map(|(e, l)| (e.as_str(), l.as_str()))
            .collect();
        entries.sort();
        entries
    }
}

pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Lower-cased extension with its leading dot, or "" when the file has none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// What to do with a classified file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Parse,
    /// Record metadata only: no extractor for the language
    Opaque,
    /// Parseable, but over the size threshold
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub language: String,
    pub extension: String,
    pub action: FileAction,
}

impl Classification {
    pub fn is_parseable(&self) -> bool {
        self.action == FileAction::Parse
    }
}

/// Pure function of extension and size
#[derive(Debug, Clone)]
pub struct FileClassifier {
    table: ExtensionTable,
    parseable: HashSet<String>,
    max_file_size: u64,
}

impl FileClassifier {
    pub fn new(table: ExtensionTable, parseable: impl IntoIterator<Item = String>, max_file_size: u64) -> Self {
        Self {
            table,
            parseable: parseable.into_iter().collect(),
            max_file_size,
        }
    }

    pub fn classify(&self, path: &Path, size_bytes: u64) -> Classification {
        let extension = extension_of(path);
        let language = self.table.language_of(&extension).to_string();

        let action = if !self.parseable.contains(&language) {
            FileAction::Opaque
        } else if size_bytes > self.max_file_size {
            FileAction::TooLarge
        } else {
            FileAction::Parse
        };

        Classification {
            language,
            extension,
            action,
        }
    }
}
