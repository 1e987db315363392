use std::fs;
use std::path::Path;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

use codeindex::{Config, Indexer};

fn write_tree(root: &Path, files: usize) {
    for i in 0..files {
        let dir = root.join(format!("pkg_{}", i % 10));
        fs::create_dir_all(&dir).unwrap();

        let python = format!(
            "from pkg_0.mod_0 import Model0\n\nclass Model{i}(Model0):\n    def save(self, data):\n        self.validate(data)\n        return len(data)\n\n    def validate(self, data):\n        for item in data:\n            check(item)\n",
            i = i
        );
        fs::write(dir.join(format!("mod_{}.py", i)), python).unwrap();

        let go = format!(
            "package pkg\n\nimport \"fmt\"\n\ntype Server{i} struct{{}}\n\nfunc (s *Server{i}) Start() {{\n\tfmt.Println(\"start\")\n\ts.listen()\n}}\n\nfunc (s *Server{i}) listen() {{}}\n",
            i = i
        );
        fs::write(dir.join(format!("server_{}.go", i)), go).unwrap();
    }
}

fn bench_index_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_tree");
    group.sample_size(10);

    for files in [50usize, 200] {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path(), files);

        group.throughput(Throughput::Elements((files * 2) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files * 2), &files, |b, _| {
            let indexer = Indexer::new(Config::default()).unwrap();
            b.iter(|| indexer.index_tree(dir.path()).unwrap().statistics.definitions)
        });
    }
    group.finish();
}

criterion_group!(benches, bench_index_tree);
criterion_main!(benches);
