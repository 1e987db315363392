use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use codeindex::index::builder::{FileOutcome, IndexBuilder};
use codeindex::index::document::DocumentMetadata;
use codeindex::index::{FileRecord, FileStatus};
use codeindex::indexer::parser::ExtractorRegistry;
use codeindex::{IndexDocument, QueryEngine};

/// `files` modules, each defining a class and calling into the previous one
fn synthetic_document(files: usize) -> IndexDocument {
    let registry = ExtractorRegistry::builtin();
    let mut builder = IndexBuilder::new();

    for i in 0..files {
        let mut source = String::new();
        if i > 0 {
            source.push_str(&format!("from mod_{prev} import Service{prev}\n", prev = i - 1));
        }
        source.push_str(&format!(
            "\nCOUNTER_{i} = 0\n\nclass Service{i}:\n    def run(self):\n        return self.helper()\n\n    def helper(self):\n        return COUNTER_{i}\n",
            i = i
        ));
        if i > 0 {
            source.push_str(&format!("\ndef main_{i}():\n    Service{prev}().run()\n", i = i, prev = i - 1));
        }

        let path = format!("mod_{}.py", i);
        let extraction = match registry.extract_file("python", &path, &source) {
            Ok(extraction) => extraction,
            Err(e) => panic!("synthetic module {} failed to parse: {}", path, e),
        };
        builder.add(FileOutcome {
            record: FileRecord {
                path,
                size_bytes: source.len() as u64,
                language: "python".to_string(),
                extension: ".py".to_string(),
                status: FileStatus::Parsed,
                content_hash: None,
            },
            extraction: Some(extraction),
            warning: None,
        });
    }

    builder.build(DocumentMetadata::new(Some("bench".to_string())))
}

fn bench_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_all_usages");
    for files in [10usize, 100, 1000] {
        let doc = synthetic_document(files);
        let engine = QueryEngine::new(&doc);
        group.bench_with_input(BenchmarkId::from_parameter(files), &files, |b, _| {
            b.iter(|| engine.find_all_usages(black_box("run")).count)
        });
    }
    group.finish();

    let doc = synthetic_document(200);
    let engine = QueryEngine::new(&doc);

    c.bench_function("find_symbol_by_qualified_name", |b| {
        b.iter(|| engine.find_symbol_by_qualified_name(black_box("Service42.run")).count)
    });
    c.bench_function("find_variable_usages", |b| {
        b.iter(|| engine.find_variable_usages(black_box("COUNTER_7")).count)
    });
    c.bench_function("find_callers", |b| {
        b.iter(|| engine.find_callers(black_box("Service42.run")).len())
    });
    c.bench_function("search_symbols", |b| {
        b.iter(|| engine.search_symbols(black_box("service1"), None, 50).len())
    });
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_100_files", |b| b.iter(|| synthetic_document(black_box(100))));
}

criterion_group!(benches, bench_lookups, bench_build);
criterion_main!(benches);
