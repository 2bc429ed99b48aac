use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memm::train::TrainingContext;
use memm::vocabulary::ClassStatistics;
use memm::{Corpus, Template, ThresholdPolicy, Vocabulary};

const LINES: [&str; 4] = [
    "The_DT dog_NN barked_VBD loudly_RB ._.",
    "A_DT big_JJ cat_NN sat_VBD on_IN the_DT mat_NN ._.",
    "Smith_NNP sold_VBD 1,200_CD shares_NNS in_IN 1984_CD ._.",
    "Re-election_NN is_VBZ mid-1980s_CD news_NN ;_: really_RB ._.",
];

fn benchmark_objective(c: &mut Criterion) {
    let text = LINES.repeat(100).join("\n");
    let corpus = Corpus::parse_tagged(text.as_bytes()).unwrap();
    let template = Template::default();
    let stats = ClassStatistics::collect(&corpus, &template).unwrap();
    let vocabulary = Vocabulary::from_statistics(&stats, &ThresholdPolicy::default());

    c.bench_function("prepare", |b| {
        b.iter(|| {
            let context =
                TrainingContext::prepare(&corpus, &template, &vocabulary, stats.tags()).unwrap();
            black_box(context);
        });
    });

    let context = TrainingContext::prepare(&corpus, &template, &vocabulary, stats.tags()).unwrap();
    let weights: Vec<f64> = (0..vocabulary.len())
        .map(|k| ((k * 13 % 7) as f64 - 3.0) * 0.05)
        .collect();
    let mut gradient = vec![0.0; vocabulary.len()];
    c.bench_function("objective_and_gradient", |b| {
        b.iter(|| {
            let value = context
                .evaluate_into(black_box(&weights), 0.2, &mut gradient)
                .unwrap();
            black_box(value);
        });
    });
}

criterion_group!(benches, benchmark_objective);
criterion_main!(benches);
