use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use timeline_relay::models::{DeliveryMode, DeliveryPolicy, PublicMetrics, Tweet, TweetAuthor};
use timeline_relay::services::digest::format_digest;
use timeline_relay::store::StateDocument;

/// A state document with `entries` committed seen records.
fn seeded_document(entries: usize) -> StateDocument {
    let mut doc = StateDocument::default();
    let ids: Vec<String> = (0..entries).map(|i| format!("18{:06}", i)).collect();
    doc.commit_seen(&ids, Utc::now());
    doc
}

/// A fetched page of 100 ids starting at `base`, so roughly half overlap
/// the seeded ledger.
fn page_ids(base: usize) -> Vec<String> {
    (base..base + 100).map(|i| format!("18{:06}", i)).collect()
}

fn benchmark_seen_filter(c: &mut Criterion) {
    let small = seeded_document(100);
    let full = seeded_document(500);
    let page_against_small = page_ids(50);
    let page_against_full = page_ids(450);

    let mut group = c.benchmark_group("seen_filter");

    group.bench_function("ledger_100", |b| {
        b.iter(|| small.seen_subset(black_box(&page_against_small)))
    });

    group.bench_function("ledger_500_at_cap", |b| {
        b.iter(|| full.seen_subset(black_box(&page_against_full)))
    });

    group.finish();
}

fn benchmark_digest_format(c: &mut Criterion) {
    let tweets: Vec<Tweet> = (0..50u32)
        .map(|i| Tweet {
            id: format!("18{:06}", i),
            author_id: "99".to_string(),
            text: format!("Update number {} with enough text to look like a real post", i),
            created_at: None,
            public_metrics: PublicMetrics {
                like_count: i * 7,
                retweet_count: i,
                reply_count: 0,
            },
        })
        .collect();
    let authors = vec![TweetAuthor {
        id: "99".to_string(),
        username: "elonmusk".to_string(),
        name: "Elon Musk".to_string(),
    }];
    let policy = DeliveryPolicy {
        mode: DeliveryMode::Batched,
        channel: None,
        prompt: None,
    };

    c.bench_function("digest_50_tweets", |b| {
        b.iter(|| format_digest(black_box(&tweets), &authors, &policy))
    });
}

criterion_group!(benches, benchmark_seen_filter, benchmark_digest_format);
criterion_main!(benches);
