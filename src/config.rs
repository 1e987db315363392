// Configuration management for codeindex

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::indexer::classifier::{normalize_extension, ExtensionTable};
use crate::indexer::parser::ExtractorRegistry;

/// File name looked up in the indexed root
pub const CONFIG_FILE_NAME: &str = ".codeindex.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub languages: LanguagesConfig,
    pub indexing: IndexingConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Repository label written to the document metadata
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguagesConfig {
    /// Languages whose extractor may run
    pub enabled: Vec<String>,
    /// Extension -> language overrides, merged over the built-in table
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    /// Parseable files above this many bytes are recorded but not parsed
    pub max_file_size: u64,
    pub follow_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub pretty: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "unnamed-project".to_string(),
        }
    }
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["python".to_string(), "go".to_string()],
            extensions: BTreeMap::new(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            exclude: [
                "**/.git",
                "**/.gitignore",
                "**/.env",
                "**/.DS_Store",
                "**/__pycache__",
                "**/node_modules",
                "**/.pytest_cache",
                "**/.mypy_cache",
                "**/dist",
                "**/build",
                "**/target",
                "**/.idea",
                "**/.vscode",
                "**/.gradle",
                "**/.next",
                "**/.nuxt",
                "**/.cache",
                "**/*.pyc",
                "**/*.class",
                "**/*.o",
                "**/*.so",
                "**/*.dylib",
                "**/codeindex.json",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            include: vec![],
            max_file_size: 1024 * 1024,
            follow_links: false,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "codeindex.json".to_string(),
            pretty: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// An explicit file wins; otherwise `.codeindex.toml` in the project
    /// directory if present; otherwise defaults. Returns the file used.
    pub fn locate(explicit: Option<&Path>, project_dir: &Path) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let candidate = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(project_dir.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()),
        };

        match candidate {
            Some(path) => {
                let config = Self::from_file(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    pub fn extension_table(&self) -> ExtensionTable {
        ExtensionTable::builtin().with_overrides(&self.languages.extensions)
    }

    pub fn path_filter(&self) -> Result<PathFilter, IndexError> {
        PathFilter::new(&self.indexing.exclude, &self.indexing.include)
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        // Validate project settings
        if self.project.name.is_empty() {
            return Err(anyhow::anyhow!("Project name cannot be empty"));
        }

        // Validate languages
        let registry = ExtractorRegistry::builtin();
        for lang in &self.languages.enabled {
            if !registry.supports(lang) {
                return Err(anyhow::anyhow!(
                    "Unsupported language: {} (available: {})",
                    lang,
                    registry.languages().join(", ")
                ));
            }
        }
        for (ext, lang) in &self.languages.extensions {
            if normalize_extension(ext) == "." || lang.trim().is_empty() {
                return Err(anyhow::anyhow!("Invalid extension mapping: {:?} -> {:?}", ext, lang));
            }
        }

        // Validate indexing settings
        if self.indexing.max_file_size == 0 {
            return Err(anyhow::anyhow!("Max file size must be greater than 0"));
        }
        self.path_filter()?;

        // Validate performance settings
        if self.performance.threads == 0 {
            return Err(anyhow::anyhow!("Thread count must be greater than 0"));
        }

        // Validate logging
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!("Invalid log level: {}", self.logging.level));
        }
        let valid_formats = ["compact", "pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!("Invalid log format: {}", self.logging.format));
        }

        if self.output.path.is_empty() {
            return Err(anyhow::anyhow!("Output path cannot be empty"));
        }

        Ok(())
    }
}

/// Compiled include/exclude globs over root-relative, `/`-separated paths
#[derive(Debug, Clone)]
pub struct PathFilter {
    exclude: GlobSet,
    include: Option<GlobSet>,
}

impl PathFilter {
    pub fn new(exclude: &[String], include: &[String]) -> Result<Self, IndexError> {
        let exclude = compile(exclude)?;
        let include = if include.is_empty() {
            None
        } else {
            Some(compile(include)?)
        };
        Ok(Self { exclude, include })
    }

    /// Excluded directories are pruned whole; include patterns apply to files only
    pub fn should_index(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.exclude.is_match(relative_path) {
            return false;
        }
        if is_dir {
            return true;
        }
        match &self.include {
            Some(include) => include.is_match(relative_path),
            None => true,
        }
    }
}

fn compile(patterns: &[String]) -> Result<GlobSet, IndexError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| IndexError::InvalidConfig(format!("bad glob {:?}: {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| IndexError::InvalidConfig(e.to_string()))
}
