use criterion::{Criterion, criterion_group, criterion_main};
use local_rag_mcp::embeddings::{ChunkingConfig, chunk_text};
use std::hint::black_box;

fn sample_document(words: usize) -> String {
    const VOCABULARY: &[&str] = &[
        "index", "vector", "chunk", "embedding", "distance", "query", "metadata", "source",
        "overlap", "window", "store", "retrieval",
    ];
    (0..words)
        .map(|i| VOCABULARY[(i * 7 + i / 3) % VOCABULARY.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = sample_document(100_000);
    let config = ChunkingConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_text(black_box(&document), black_box(&config)));
    });

    let dense = ChunkingConfig {
        chunk_size: 64,
        overlap: 48,
    };
    c.bench_function("chunking_dense_overlap", |b| {
        b.iter(|| chunk_text(black_box(&document), black_box(&dense)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
