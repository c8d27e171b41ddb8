//! Indexing performance benchmarks
//!
//! Measures performance of:
//! - Structural chunking per language
//! - Feature-hash embedding of chunk batches
//! - Full incremental pass over a small project

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use semcode_core::db::SqliteStore;
use semcode_core::index::ast_chunker::chunk_source;
use semcode_core::index::{ChunkerRegistry, Indexer, IndexerOptions, Language};
use semcode_core::HashEmbedder;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn python_module(functions: usize) -> String {
    let mut source = String::from("\"\"\"Generated module.\"\"\"\n\nimport os\n\n");
    for i in 0..functions {
        source.push_str(&format!(
            "def handler_{i}(request, retries=3):\n    \"\"\"Handle request {i}.\"\"\"\n    for attempt in range(retries):\n        if request.ok:\n            return attempt\n    return None\n\n\n"
        ));
        if i % 5 == 0 {
            source.push_str(&format!(
                "class Service{i}:\n    def start(self):\n        return os.getpid()\n\n    def stop(self):\n        pass\n\n\n"
            ));
        }
    }
    source
}

fn rust_module(functions: usize) -> String {
    let mut source = String::from("//! Generated crate\n\nuse std::collections::HashMap;\n\n");
    for i in 0..functions {
        source.push_str(&format!(
            "/// Compute value {i}\npub fn compute_{i}(input: &[u32]) -> u64 {{\n    input.iter().map(|x| *x as u64).sum::<u64>() + {i}\n}}\n\n"
        ));
        if i % 5 == 0 {
            source.push_str(&format!(
                "pub struct Store{i} {{\n    map: HashMap<String, u32>,\n}}\n\nimpl Store{i} {{\n    pub fn get(&self, key: &str) -> Option<u32> {{\n        self.map.get(key).copied()\n    }}\n}}\n\n"
            ));
        }
    }
    source
}

fn markdown_doc(sections: usize) -> String {
    let mut source = String::from("# Handbook\n\nOverview paragraph.\n\n");
    for i in 0..sections {
        source.push_str(&format!(
            "## Topic {i}\n\nSome prose about topic {i} with a list:\n\n- one\n- two\n\n### Detail {i}\n\nMore text.\n\n"
        ));
    }
    source
}

fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");

    for size in [10, 100] {
        let cases = [
            (Language::Python, "module.py", python_module(size)),
            (Language::Rust, "lib.rs", rust_module(size)),
            (Language::Markdown, "guide.md", markdown_doc(size)),
        ];
        for (language, file, source) in cases {
            group.throughput(Throughput::Bytes(source.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(language.as_str(), size),
                &source,
                |b, source| {
                    b.iter(|| chunk_source(black_box(source), Path::new(file), language).unwrap())
                },
            );
        }
    }

    group.finish();
}

fn bench_embedding(c: &mut Criterion) {
    let embedder = HashEmbedder::default();
    let chunks = chunk_source(&python_module(64), Path::new("module.py"), Language::Python).unwrap();
    let texts: Vec<String> = chunks.into_iter().map(|c| c.content).collect();

    let mut group = c.benchmark_group("embedding");
    group.throughput(Throughput::Elements(texts.len() as u64));
    group.bench_function("feature_hash_batch", |b| {
        b.iter(|| {
            for text in &texts {
                black_box(embedder.embed_sync(text));
            }
        })
    });
    group.finish();
}

fn bench_full_pass(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let project = TempDir::new().unwrap();
    for i in 0..20 {
        std::fs::write(project.path().join(format!("mod_{}.py", i)), python_module(10)).unwrap();
        std::fs::write(project.path().join(format!("lib_{}.rs", i)), rust_module(10)).unwrap();
    }
    let registry = Arc::new(ChunkerRegistry::with_defaults().unwrap());

    c.bench_function("full_pass_40_files", |b| {
        b.iter(|| {
            let idx = TempDir::new().unwrap();
            let store = SqliteStore::open(idx.path()).unwrap();
            let indexer = Indexer::new(
                registry.clone(),
                Arc::new(HashEmbedder::default()),
                Arc::new(store),
                idx.path(),
                IndexerOptions::default(),
            );
            runtime
                .block_on(indexer.index(project.path(), false, None))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_chunking, bench_embedding, bench_full_pass);
criterion_main!(benches);
