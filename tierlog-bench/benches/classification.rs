//! tierlog Benchmark Suite
//!
//! Per-tier cost of classifying one message:
//!   rule_match_hit ................. first built-in rule that matches
//!   rule_match_miss ................ every built-in rule tried
//!   hashing_embed_384 .............. bag-of-words embedding
//!   logistic_predict_4x384 ......... softmax over four classes
//!   embedding_tier_end_to_end ...... embed + predict + threshold
//!   router_chain_to_llm_stub ....... all three tiers, LLM stubbed

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tierlog_core::embedding::{DEFAULT_DIMENSIONS, EmbeddingProvider, HashingEmbeddingProvider};
use tierlog_core::model::{LogisticModel, ProbabilisticClassifier};
use tierlog_core::{EmbeddingClassifier, GenerativeClassifier, Router, RuleSet};

const HTTP_LINE: &str = "GET /v2/3454/servers/detail HTTP/1.1 RCODE   404 len: 1583 time: 0.1878400";
const CHATTER: &str = "Hey bro, chill ya!";

/// Deterministic non-trivial weights.
fn make_model(classes: usize, dims: usize) -> LogisticModel {
    let labels = (0..classes).map(|i| format!("Class {i}")).collect();
    let rows = (0..classes)
        .map(|c| {
            (0..dims)
                .map(|d| ((c * dims + d) as f32 * 0.37).sin() * 0.1)
                .collect()
        })
        .collect();
    LogisticModel::new(labels, rows, vec![0.0; classes])
        .expect("model")
        .with_embedding_model("hashing-bow")
}

struct FixedLlm;

#[async_trait]
impl GenerativeClassifier for FixedLlm {
    async fn classify(&self, _message: &str) -> tierlog_core::Result<String> {
        Ok("Unclassified".to_string())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

fn bench_rules(c: &mut Criterion) {
    let rules = RuleSet::builtin();
    c.bench_function("rule_match_hit", |b| {
        b.iter(|| black_box(rules.match_label(black_box("User User123 logged in."))));
    });
    c.bench_function("rule_match_miss", |b| {
        b.iter(|| black_box(rules.match_label(black_box(HTTP_LINE))));
    });
}

fn bench_embedding(c: &mut Criterion) {
    let embedder = HashingEmbeddingProvider::new(DEFAULT_DIMENSIONS);
    c.bench_function("hashing_embed_384", |b| {
        b.iter(|| black_box(embedder.embed(black_box(HTTP_LINE)).expect("embed")));
    });

    let model = make_model(4, DEFAULT_DIMENSIONS);
    let vector = embedder.embed(HTTP_LINE).expect("embed");
    c.bench_function("logistic_predict_4x384", |b| {
        b.iter(|| black_box(model.predict_proba(black_box(vector.as_slice())).expect("predict")));
    });

    let tier = EmbeddingClassifier::new(Arc::new(embedder), Arc::new(model));
    c.bench_function("embedding_tier_end_to_end", |b| {
        b.iter(|| black_box(tier.predict(black_box(HTTP_LINE)).expect("predict")));
    });
}

fn bench_router(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let router = Router::new(RuleSet::builtin())
        .with_embedding_classifier(EmbeddingClassifier::new(
            Arc::new(HashingEmbeddingProvider::new(DEFAULT_DIMENSIONS)),
            Arc::new(make_model(4, DEFAULT_DIMENSIONS)),
        ))
        .with_llm(Arc::new(FixedLlm));

    c.bench_function("router_chain_to_llm_stub", |b| {
        b.iter(|| {
            let result = runtime.block_on(router.classify(black_box(CHATTER)));
            black_box(result.expect("classify"));
        });
    });
}

criterion_group!(benches, bench_rules, bench_embedding, bench_router);
criterion_main!(benches);
