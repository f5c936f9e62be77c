use criterion::{criterion_group, criterion_main, Criterion};
use msc_core::{Course, Engine, Scheme};

const WORDS: &[&str] = &[
    "data", "science", "statistics", "physics", "quantum", "machine", "learning", "economics",
    "finance", "law", "history", "biology", "chemistry", "engineering", "management", "marketing",
];

fn synthetic_corpus(n: usize) -> Vec<Course> {
    (0..n)
        .map(|i| {
            let title = format!("{} {}", WORDS[i % WORDS.len()], WORDS[(i / 3) % WORDS.len()]);
            let description: Vec<&str> = (0..24).map(|j| WORDS[(i * 7 + j * 5) % WORDS.len()]).collect();
            Course::new(title, description.join(" "))
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let engine = Engine::build(synthetic_corpus(2_000), &Scheme::WEIGHTED);
    c.bench_function("search_tfidf", |b| b.iter(|| engine.search("data science statistics", 10, Scheme::Tfidf)));
    c.bench_function("search_blended", |b| b.iter(|| engine.search("data science statistics", 10, Scheme::Blended)));
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
