use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use codeindex::error::IndexError;
use codeindex::index::{DefinitionKind, FileStatus, UsageKind};
use codeindex::source::{LocalDirectory, SnapshotDirectory, SourceProvider, SourceTree};
use codeindex::{Config, IndexDocument, Indexer, QueryEngine};

fn setup_with_code(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    dir
}

fn index(root: &Path) -> IndexDocument {
    let mut config = Config::default();
    config.performance.threads = 2;
    Indexer::new(config).unwrap().index_tree(root).unwrap()
}

const HANDLERS: &str = "class Handler:\n    def run(self):\n        return 1\n";

#[test]
fn test_handler_run_resolves_through_import() {
    let dir = setup_with_code(&[
        ("handlers.py", HANDLERS),
        ("app.py", "from handlers import Handler\n\ndef main():\n    Handler().run()\n"),
        ("loose.py", "def other():\n    Handler().run()\n"),
    ]);
    let doc = index(dir.path());

    let run = doc
        .definitions
        .iter()
        .find(|d| d.qualified_name == "Handler.run")
        .expect("method definition");
    assert_eq!(run.file_path, "handlers.py");
    assert_eq!(run.kind, DefinitionKind::Function);
    assert_eq!(run.scope_path, vec!["Handler".to_string()]);

    let call_in = |file: &str| {
        doc.usages
            .iter()
            .find(|u| u.file_path == file && u.referenced_name == "run" && u.kind == UsageKind::Call)
            .unwrap_or_else(|| panic!("no run() call in {}", file))
    };
    assert_eq!(call_in("app.py").referenced_qualified_name.as_deref(), Some("Handler.run"));
    assert_eq!(call_in("loose.py").referenced_qualified_name, None);
}

#[test]
fn test_resolved_usages_point_at_definitions() {
    let dir = setup_with_code(&[
        ("pkg/__init__.py", ""),
        ("pkg/models.py", "class User:\n    def save(self):\n        self.validate()\n\n    def validate(self):\n        pass\n"),
        ("pkg/service.py", "from .models import User\n\ndef create():\n    u = User()\n    u.save()\n    return u\n"),
        ("cmd/main.go", "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(helper())\n}\n"),
        ("cmd/util.go", "package main\n\nfunc helper() string {\n\treturn \"ok\"\n}\n"),
    ]);
    let doc = index(dir.path());

    for usage in &doc.usages {
        if let Some(qn) = &usage.referenced_qualified_name {
            assert!(
                doc.definitions.iter().any(|d| &d.qualified_name == qn),
                "{} resolved to unknown {}",
                usage.referenced_name,
                qn
            );
        }
    }

    let resolved: Vec<_> = doc
        .usages
        .iter()
        .filter(|u| u.kind == UsageKind::Call && u.is_resolved())
        .map(|u| (u.file_path.as_str(), u.referenced_qualified_name.as_deref().unwrap_or_default()))
        .collect();
    assert!(resolved.contains(&("pkg/models.py", "User.validate")));
    assert!(resolved.contains(&("pkg/service.py", "User")));
    assert!(resolved.contains(&("cmd/main.go", "helper")));
}

#[test]
fn test_same_class_in_two_packages() {
    let dir = setup_with_code(&[
        ("b/handlers.py", HANDLERS),
        ("a/handlers.py", HANDLERS),
        ("app.py", "from handlers import Handler\n\ndef main():\n    Handler().run()\n"),
    ]);
    let doc = index(dir.path());
    let engine = QueryEngine::new(&doc);

    let all = engine.find_symbol_by_qualified_name("Handler.run");
    let files: Vec<_> = all.definitions.iter().map(|d| d.file_path.as_str()).collect();
    assert_eq!(files, vec!["a/handlers.py", "b/handlers.py"]);
    assert_eq!(all.usages.len(), 1);

    assert_eq!(engine.find_in_file("Handler.run", "a/handlers.py").definitions.len(), 1);
    assert_eq!(engine.find_in_file("Handler.run", "b/handlers.py").definitions.len(), 1);

    // the suffix-matched module resolves to the first file by path
    let callees = engine.find_callees("main");
    let run = callees
        .iter()
        .find(|c| c.qualified_name == "Handler.run")
        .expect("resolved call");
    assert_eq!(run.file, "a/handlers.py");
}

#[test]
fn test_indexing_is_deterministic() {
    let dir = setup_with_code(&[
        ("a.py", "from b import ping\n\ndef pong():\n    ping()\n"),
        ("b.py", "from a import pong\n\ndef ping():\n    pong()\n"),
        ("c/d.py", "import a\nVALUE = a.pong()\n"),
        ("main.go", "package main\n\nfunc main() {\n\tx := 1\n\t_ = x\n}\n"),
    ]);

    let first = index(dir.path());
    let second = index(dir.path());

    assert_eq!(first.files, second.files);
    assert_eq!(first.definitions, second.definitions);
    assert_eq!(first.usages, second.usages);
    assert_eq!(first.inverted_index, second.inverted_index);
    assert_eq!(first.graph, second.graph);
    assert_eq!(
        serde_json::to_string(&first.graph).unwrap(),
        serde_json::to_string(&second.graph).unwrap()
    );
}

#[test]
fn test_document_never_contains_source_text() {
    let secret = "API_KEY = 'sk-live-0123456789abcdef'  # rotate quarterly\n";
    let body = "def charge(amount):\n    fee = amount * 0.029 + 30\n    return amount - fee\n";
    let dir = setup_with_code(&[("billing.py", &format!("{}{}", secret, body))]);

    let doc = index(dir.path());
    let json = doc.to_json(true).unwrap();

    assert!(!json.contains("sk-live"));
    assert!(!json.contains("rotate quarterly"));
    assert!(!json.contains("0.029"));
    for line in secret.lines().chain(body.lines()) {
        let line = line.trim();
        if line.len() > 12 {
            assert!(!json.contains(line), "source line leaked: {}", line);
        }
    }

    // the names themselves are still indexed
    assert!(doc.definitions.iter().any(|d| d.qualified_name == "API_KEY"));
    assert!(doc.definitions.iter().any(|d| d.qualified_name == "charge.fee"));
}

#[test]
fn test_broken_file_degrades_gracefully() {
    let dir = setup_with_code(&[
        ("good.py", "def ok():\n    return 1\n"),
        ("broken.py", "def oops(:\n    return\n"),
        ("data.bin", "\u{0}\u{1}"),
    ]);
    let doc = index(dir.path());

    let broken = doc.files.iter().find(|f| f.path == "broken.py").unwrap();
    assert_eq!(broken.status, FileStatus::Failed);
    assert!(doc.definitions.iter().all(|d| d.file_path != "broken.py"));
    assert_eq!(doc.warnings.len(), 1);
    assert_eq!(doc.warnings[0].path, "broken.py");
    assert!(doc.warnings[0].reason.starts_with("syntax error at line"));

    assert!(doc.definitions.iter().any(|d| d.qualified_name == "ok"));
    assert_eq!(doc.statistics.failed_files, 1);
    assert_eq!(doc.statistics.opaque_files, 1);
}

#[test]
fn test_unknown_symbol_query_is_empty() {
    let dir = setup_with_code(&[("handlers.py", HANDLERS)]);
    let doc = index(dir.path());
    let engine = QueryEngine::new(&doc);

    let result = engine.find_all_usages("nonexistent_symbol");
    assert_eq!(result.count, 0);
    assert!(result.definitions.is_empty());
    assert!(result.usages.is_empty());
}

#[test]
fn test_missing_root_is_fatal_and_writes_nothing() {
    let out = TempDir::new().unwrap();
    let output = out.path().join("codeindex.json");

    let indexer = Indexer::new(Config::default()).unwrap();
    let result = indexer
        .index_source(&LocalDirectory::new("/definitely/not/here"))
        .and_then(|doc| doc.save(&output, false));

    assert!(matches!(result, Err(IndexError::SourceUnavailable { .. })));
    assert!(!output.exists());
}

#[test]
fn test_saved_document_answers_queries() {
    let dir = setup_with_code(&[
        ("handlers.py", HANDLERS),
        ("app.py", "from handlers import Handler\nHandler().run()\n"),
    ]);
    let out = TempDir::new().unwrap();
    let output = out.path().join("index.json");

    index(dir.path()).save(&output, true).unwrap();
    let loaded = IndexDocument::load(&output).unwrap();
    let engine = QueryEngine::new(&loaded);

    let callers = engine.find_callers("Handler.run");
    assert_eq!(callers.len(), 1);
    assert_eq!(callers[0].file, "app.py");
    assert_eq!(callers[0].kind, "file");
}

/// Remembers where the ephemeral tree lived so the test can check it is gone
struct RecordingProvider {
    inner: SnapshotDirectory,
    root: Mutex<Option<PathBuf>>,
}

impl SourceProvider for RecordingProvider {
    fn acquire(&self) -> Result<SourceTree, IndexError> {
        let tree = self.inner.acquire()?;
        *self.root.lock().unwrap() = Some(tree.root().to_path_buf());
        Ok(tree)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

#[test]
fn test_ephemeral_tree_is_released() {
    let dir = setup_with_code(&[("handlers.py", HANDLERS)]);
    let provider = RecordingProvider {
        inner: SnapshotDirectory::new(dir.path()),
        root: Mutex::new(None),
    };

    let doc = Indexer::new(Config::default())
        .unwrap()
        .index_source(&provider)
        .unwrap();
    assert!(doc.definitions.iter().any(|d| d.qualified_name == "Handler.run"));

    let root = provider.root.lock().unwrap().clone().unwrap();
    assert_ne!(root, dir.path());
    assert!(!root.exists());
    // the original tree is untouched
    assert!(dir.path().join("handlers.py").exists());
}
