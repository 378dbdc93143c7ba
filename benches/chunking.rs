use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ragforge::chunking::{self, ChunkParams, Strategy};

fn sample_text(paragraphs: usize) -> String {
    let mut text = String::new();
    for i in 0..paragraphs {
        text.push_str(&format!(
            "Paragraph {i} begins here. It has a few sentences. \
             Each sentence adds a bit more text to chunk. \
             This keeps the paragraph a realistic size for benchmarking.\n\n"
        ));
    }
    text
}

fn bench_strategy(c: &mut Criterion, name: &str, strategy: Strategy) {
    let mut group = c.benchmark_group(name);
    let params = ChunkParams::default();
    for paragraphs in [10usize, 100, 1000] {
        let text = sample_text(paragraphs);
        group.bench_with_input(BenchmarkId::from_parameter(paragraphs), &text, |b, text| {
            let rt = tokio::runtime::Runtime::new().unwrap();
            b.iter(|| {
                rt.block_on(chunking::chunk(black_box(text), strategy, &params, None))
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn fixed_benchmark(c: &mut Criterion) {
    bench_strategy(c, "fixed", Strategy::Fixed);
}

fn recursive_benchmark(c: &mut Criterion) {
    bench_strategy(c, "recursive", Strategy::Recursive);
}

fn sentence_benchmark(c: &mut Criterion) {
    bench_strategy(c, "sentence", Strategy::Sentence);
}

fn paragraph_benchmark(c: &mut Criterion) {
    bench_strategy(c, "paragraph", Strategy::Paragraph);
}

criterion_group!(
    benches,
    fixed_benchmark,
    recursive_benchmark,
    sentence_benchmark,
    paragraph_benchmark
);
criterion_main!(benches);
