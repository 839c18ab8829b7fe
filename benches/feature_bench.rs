//! Benchmarks for graph construction, feature extraction, and vectorization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use convograph::convo::Conversation;
use convograph::feature::{conv, post_in_conv, ConversationVectorizer, Normalization, PostVectorizer, VectorInput};
use convograph::graph::ConvoGraph;
use convograph::message::{Message, MessageFields, Tweet, Uid};
use convograph::tokenize;

/// Builds a random reply tree: every post after the first replies to a
/// uniformly chosen earlier post. Seeded so runs are comparable.
fn synthetic_convo(size: i64, seed: u64) -> Conversation {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut convo = Conversation::new();
    for ix in 0..size {
        let mut fields = MessageFields::new(ix)
            .with_text(format!("Synthetic post {ix} with a handful of #tokens and @user{} mentioned", ix % 8))
            .with_author(format!("user{}", ix % 8))
            .with_created_at(ix as f64);
        if ix > 0 {
            fields = fields.with_reply_to([rng.gen_range(0..ix)]);
        }
        convo.add_post(Message::Twitter(Tweet::new(fields)));
    }
    convo
}

fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");

    for size in [10i64, 100, 500] {
        let convo = synthetic_convo(size, 7);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("build", size), &convo, |b, convo| {
            b.iter(|| ConvoGraph::build(black_box(convo)))
        });
    }

    group.finish();
}

fn bench_conversation_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversation_features");

    for size in [10i64, 100, 500] {
        // Graph built once; the aggregates are what is being timed.
        let convo = synthetic_convo(size, 7);
        let graph = ConvoGraph::build(&convo);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("ints", size), &size, |b, _| {
            b.iter(|| conv::ints(black_box(&convo), black_box(&graph)))
        });
        group.bench_with_input(BenchmarkId::new("floats", size), &size, |b, _| {
            b.iter(|| conv::floats(black_box(&convo), black_box(&graph)))
        });
    }

    group.finish();
}

fn bench_post_in_conv_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_in_conv_features");

    let convo = synthetic_convo(100, 7);
    let graph = ConvoGraph::build(&convo);
    let mid = Uid::Num(50);

    group.bench_function("ints_100", |b| {
        b.iter(|| post_in_conv::ints(black_box(&convo), black_box(&graph), black_box(&mid)))
    });

    // Dominated by the token entropy splits, which re-tokenize every
    // slice of the conversation around the post.
    group.bench_function("floats_100", |b| {
        b.iter(|| post_in_conv::floats(black_box(&convo), black_box(&mid)))
    });

    group.finish();
}

fn bench_tokenization(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenization");

    let text = "RT @someone: check https://example.com/a/long/path?q=1 #topic \
                and then a run of ordinary words to pad the length out a bit";
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("partition", |b| b.iter(|| tokenize::partition(black_box(text))));

    group.finish();
}

fn bench_vectorization(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorization");

    for size in [10i64, 100] {
        let convo = synthetic_convo(size, 7);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("post_fit_transform", size), &size, |b, _| {
            b.iter(|| {
                PostVectorizer::new(Normalization::MinMax)
                    .fit_transform(black_box(VectorInput::Convo(&convo)))
            })
        });
    }

    let convos: Vec<Conversation> = (0..20)
        .map(|seed| {
            let mut convo = synthetic_convo(25, seed);
            convo.set_convo_id(format!("bench-{seed}"));
            convo
        })
        .collect();
    group.throughput(Throughput::Elements(convos.len() as u64));
    group.bench_function("conversation_fit_transform_20", |b| {
        b.iter(|| {
            ConversationVectorizer::new(Normalization::Standard)
                .fit_transform(black_box(VectorInput::Convos(&convos)))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_construction,
    bench_conversation_features,
    bench_post_in_conv_features,
    bench_tokenization,
    bench_vectorization
);
criterion_main!(benches);
