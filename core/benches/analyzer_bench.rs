use criterion::{criterion_group, criterion_main, Criterion};
use songdex_core::analyzer::{AnalysisSettings, Analyzer};
use songdex_core::tokenizer::tokenize;

const LYRICS: &str = "Helan går, sjung hopp faderallan lallan lej! \
    Ja, ja, kyllä me juodaan ja lauletaan, ei huolet paina meitä. \
    We'll drink to the summer, the sun and the singing, till morning comes.";

fn bench_analyzer(c: &mut Criterion) {
    let text = LYRICS.repeat(50);
    let analyzer = Analyzer::new(&AnalysisSettings::default()).expect("default analyzer");
    c.bench_function("tokenize_lyrics", |b| b.iter(|| tokenize(&text).count()));
    c.bench_function("analyze_lyrics_multi", |b| b.iter(|| analyzer.analyze(&text).count()));
}

criterion_group!(benches, bench_analyzer);
criterion_main!(benches);
