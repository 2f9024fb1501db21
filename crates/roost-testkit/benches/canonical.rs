use criterion::{black_box, criterion_group, criterion_main, Criterion};

use roost_core::{render_bundle, tokenize, Message};
use roost_testkit::vectors::{all_vectors, generate_message_from_vector};
use roost_testkit::TestFixture;

fn messages() -> Vec<Message> {
    all_vectors().iter().map(generate_message_from_vector).collect()
}

fn bench_render(c: &mut Criterion) {
    let messages = messages();
    c.bench_function("render_vectors", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(message.render());
            }
        })
    });
    c.bench_function("multihash_vectors", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(message.multihash());
            }
        })
    });
}

fn bench_tokenize(c: &mut Criterion) {
    let fixture = TestFixture::with_seed([9; 32]);
    let bundle = render_bundle(&fixture.make_chain("count", 64));
    c.bench_function("tokenize_bundle_64", |b| {
        b.iter(|| black_box(tokenize(black_box(&bundle)).unwrap()))
    });
}

criterion_group!(benches, bench_render, bench_tokenize);
criterion_main!(benches);
