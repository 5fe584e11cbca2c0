use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

fn bench_parse_message(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("with_attachments.eml");
    let raw = std::fs::read(&fixture_path).unwrap();

    c.bench_function("parse_with_attachments", |b| {
        b.iter(|| eml2md::parser::mime::parse(&raw).unwrap())
    });
}

fn bench_slugify(c: &mut Criterion) {
    let subject = "Re: Fwd: Nabídka na projekt Ácme – cenová kalkulace (verze 3) ".repeat(4);

    c.bench_function("slugify_subject", |b| {
        b.iter(|| eml2md::normalize::slugify(&subject, eml2md::normalize::DEFAULT_SLUG_LENGTH))
    });
}

criterion_group!(benches, bench_parse_message, bench_slugify);
criterion_main!(benches);
