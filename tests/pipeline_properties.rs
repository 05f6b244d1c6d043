//! End-to-end behaviour of the verdict pipeline with scripted collaborators

mod common;

use common::{candidate, resolver, ScriptedEmbedder, StubOracle};
use factscreen::ai::FallbackError;
use factscreen::models::{NormalizedRating, ProviderResult, SourceApi, Verdict, VerdictSource};
use factscreen::pipeline::{aggregate, RatingNormalizer};
use factscreen::Error;
use std::sync::Arc;
use std::time::Duration;

const CLAIM: &str = "5G towers spread the coronavirus";

fn five_sources() -> Vec<ProviderResult> {
    vec![
        candidate(SourceApi::Google, "5G spreads covid", "False", "PolitiFact"),
        candidate(SourceApi::Google, "5G causes coronavirus", "Pants on Fire", "Snopes"),
        candidate(SourceApi::RapidApi, "Cell towers spread virus", "Misleading", "AFP"),
        candidate(SourceApi::RapidApi, "5G linked to covid", "Mostly True", "Outlier News"),
        candidate(SourceApi::ClaimBuster, "5G and covid", "Needs context", "Lead Stories"),
    ]
}

fn five_source_embedder(score: f32) -> ScriptedEmbedder {
    ScriptedEmbedder::new(&[
        ("5G spreads covid", score),
        ("5G causes coronavirus", score),
        ("Cell towers spread virus", score),
        ("5G linked to covid", score),
        ("5G and covid", score),
    ])
}

#[tokio::test]
async fn test_five_source_majority_without_fallback() {
    let oracle = Arc::new(StubOracle::answering(Verdict::True, 0.99, "should not be used"));
    let resolver = resolver(five_source_embedder(0.9), oracle.clone());

    let result = resolver.resolve(CLAIM, &five_sources(), Some(0.75)).await.unwrap();

    assert_eq!(result.verdict(), Verdict::Misleading);
    assert!((result.confidence() - 0.6).abs() < 1e-6);
    assert!(!result.used_ai_fallback());
    assert_eq!(result.verdict_source(), VerdictSource::Majority);
    assert_eq!(result.sources().len(), 5);
    assert_eq!(oracle.classify_count(), 0);
    assert_eq!(oracle.explain_count(), 1);
    assert_eq!(result.votes()[&NormalizedRating::FalseOrMisleading], 3);
    assert_eq!(result.votes()[&NormalizedRating::True], 1);
    assert_eq!(result.votes()[&NormalizedRating::Unknown], 1);
    assert!(result
        .explanation()
        .starts_with("3 of 5 sources rate this claim as false or misleading."));
    assert_eq!(
        result.providers_checked(),
        &[SourceApi::Google, SourceApi::RapidApi, SourceApi::ClaimBuster]
    );
}

#[tokio::test]
async fn test_high_threshold_empties_evidence_and_invokes_ai() {
    let oracle = Arc::new(StubOracle::answering(
        Verdict::Misleading,
        0.82,
        "Health agencies have repeatedly debunked this.",
    ));
    let resolver = resolver(five_source_embedder(0.8), oracle.clone());

    let result = resolver.resolve(CLAIM, &five_sources(), Some(0.9)).await.unwrap();

    assert!(result.sources().is_empty());
    assert_eq!(oracle.classify_count(), 1);
    assert!(oracle.last_evidence.lock().unwrap().is_empty());
    assert!(result.used_ai_fallback());
    assert_eq!(result.verdict_source(), VerdictSource::Ai);
    assert_eq!(result.verdict(), Verdict::Misleading);
    assert!((result.confidence() - 0.82).abs() < 1e-6);
    assert_eq!(result.explanation(), "Health agencies have repeatedly debunked this.");
}

#[tokio::test]
async fn test_high_threshold_without_ai_is_unknown() {
    let oracle = Arc::new(StubOracle::failing(FallbackError::MissingApiKey));
    let resolver = resolver(five_source_embedder(0.8), oracle.clone());

    let result = resolver.resolve(CLAIM, &five_sources(), Some(0.9)).await.unwrap();

    assert_eq!(result.verdict(), Verdict::Unknown);
    assert_eq!(result.confidence(), 0.0);
    assert!(!result.used_ai_fallback());
    assert_eq!(oracle.classify_count(), 1);
    assert_eq!(
        result.explanation(),
        "No matching fact-checks were found; verdict is inconclusive."
    );
}

#[tokio::test]
async fn test_empty_input() {
    let oracle = Arc::new(StubOracle::failing(FallbackError::UpstreamError("HTTP 503".into())));
    let resolver = resolver(ScriptedEmbedder::new(&[]), oracle);

    let result = resolver.resolve(CLAIM, &[], None).await.unwrap();

    assert_eq!(result.verdict(), Verdict::Unknown);
    assert_eq!(result.confidence(), 0.0);
    assert!(result.sources().is_empty());
    assert!(result.providers_checked().is_empty());
    assert_eq!(result.claim_text(), CLAIM);
}

#[tokio::test]
async fn test_tie_prefers_misleading_when_ai_unavailable() {
    let sources = vec![
        candidate(SourceApi::Google, "a", "True", "One"),
        candidate(SourceApi::Google, "b", "Correct", "Two"),
        candidate(SourceApi::RapidApi, "c", "False", "Three"),
        candidate(SourceApi::ClaimBuster, "d", "Fake", "Four"),
    ];
    let embedder = ScriptedEmbedder::new(&[("a", 0.9), ("b", 0.9), ("c", 0.9), ("d", 0.9)]);
    let oracle = Arc::new(StubOracle::failing(FallbackError::QuotaExceeded("429".into())));
    let resolver = resolver(embedder, oracle.clone());

    let result = resolver.resolve(CLAIM, &sources, None).await.unwrap();

    assert_eq!(oracle.classify_count(), 1);
    assert_eq!(result.verdict(), Verdict::Misleading);
    assert_eq!(result.confidence(), 0.5);
    assert_eq!(result.verdict_source(), VerdictSource::Majority);
    assert!(result
        .explanation()
        .starts_with("2 of 4 sources rate this claim as false or misleading (Three, Four)."));
}

#[tokio::test]
async fn test_fallback_timeout_keeps_provisional_result() {
    let sources = vec![
        candidate(SourceApi::Google, "a", "True", "One"),
        candidate(SourceApi::Google, "b", "Unproven", "Two"),
        candidate(SourceApi::RapidApi, "c", "Needs context", "Three"),
    ];
    let embedder = ScriptedEmbedder::new(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
    let oracle = Arc::new(StubOracle {
        delay: Duration::from_secs(5),
        ..StubOracle::answering(Verdict::True, 0.9, "late")
    });
    let resolver = resolver(embedder, oracle.clone());

    let result = resolver.resolve(CLAIM, &sources, None).await.unwrap();

    assert_eq!(oracle.classify_count(), 1);
    assert_eq!(result.verdict(), Verdict::Unknown);
    assert!((result.confidence() - 2.0 / 3.0).abs() < 1e-6);
    assert!(!result.used_ai_fallback());
    assert!(!result.explanation().contains("late"));
}

#[tokio::test]
async fn test_ai_authoritative_when_invoked() {
    let sources = vec![
        candidate(SourceApi::Google, "a", "True", "One"),
        candidate(SourceApi::RapidApi, "b", "False", "Two"),
    ];
    let embedder = ScriptedEmbedder::new(&[("a", 0.9), ("b", 0.9)]);
    let oracle = Arc::new(StubOracle::answering(Verdict::True, 0.7, "   "));
    let resolver = resolver(embedder, oracle);

    let result = resolver.resolve(CLAIM, &sources, None).await.unwrap();

    assert_eq!(result.verdict(), Verdict::True);
    assert!((result.confidence() - 0.7).abs() < 1e-6);
    assert_eq!(result.verdict_source(), VerdictSource::Ai);
    // Blank AI text falls back to the template, which flags the override
    assert!(result.explanation().contains("Provider ratings were inconclusive"));
}

#[tokio::test]
async fn test_explain_failure_uses_template() {
    let sources = vec![
        candidate(SourceApi::Google, "a", "True", "One"),
        candidate(SourceApi::RapidApi, "b", "Accurate", "Two"),
    ];
    let embedder = ScriptedEmbedder::new(&[("a", 0.9), ("b", 0.9)]);
    let oracle = Arc::new(StubOracle::failing(FallbackError::InvalidKey("bad key".into())));
    let resolver = resolver(embedder, oracle.clone());

    let result = resolver.resolve(CLAIM, &sources, None).await.unwrap();

    assert_eq!(oracle.classify_count(), 0);
    assert_eq!(result.verdict(), Verdict::True);
    assert_eq!(result.confidence(), 1.0);
    assert_eq!(result.explanation(), "2 of 2 sources rate this claim as true (One, Two).");
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let oracle = Arc::new(StubOracle::failing(FallbackError::Timeout(100)));
    let resolver = resolver(five_source_embedder(0.9), oracle);
    let sources = five_sources();

    let first = resolver.resolve(CLAIM, &sources, None).await.unwrap();
    let second = resolver.resolve(CLAIM, &sources, None).await.unwrap();

    assert_eq!(first.verdict(), second.verdict());
    assert_eq!(first.confidence(), second.confidence());
    assert_eq!(first.explanation(), second.explanation());
    assert_eq!(first.sources(), second.sources());
    assert_eq!(first.votes(), second.votes());
}

#[tokio::test]
async fn test_screen_rates_without_consulting_ai() {
    let oracle = Arc::new(StubOracle::answering(Verdict::True, 1.0, "x"));
    let embedder = ScriptedEmbedder::new(&[
        ("5G spreads covid", 0.9),
        ("5G causes coronavirus", 0.5),
        ("5G linked to covid", 0.8),
    ]);
    let resolver = resolver(embedder, oracle.clone());

    let kept = resolver.screen(CLAIM, &five_sources(), None).await.unwrap();

    let texts: Vec<&str> = kept.iter().map(|s| s.claim_text.as_str()).collect();
    assert_eq!(texts, vec!["5G spreads covid", "5G linked to covid"]);
    assert_eq!(kept[0].normalized_rating(), Some(NormalizedRating::FalseOrMisleading));
    assert_eq!(kept[1].normalized_rating(), Some(NormalizedRating::True));
    assert_eq!(oracle.classify_count(), 0);
    assert_eq!(oracle.explain_count(), 0);
}

#[tokio::test]
async fn test_invalid_threshold_fails_before_ai() {
    let oracle = Arc::new(StubOracle::answering(Verdict::True, 1.0, "x"));
    let resolver = resolver(five_source_embedder(0.9), oracle.clone());

    for threshold in [-0.5, 1.5, f32::NAN] {
        let result = resolver.resolve(CLAIM, &five_sources(), Some(threshold)).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
    assert_eq!(oracle.classify_count(), 0);
    assert_eq!(oracle.explain_count(), 0);
}

#[test]
fn test_agreeing_source_never_lowers_confidence() {
    let normalizer = RatingNormalizer::default();
    let ratings = ["False", "True", "Fake", "Unproven", "Misleading", "Correct", "False"];

    let mut sources: Vec<ProviderResult> = Vec::new();
    for (i, rating) in ratings.into_iter().enumerate() {
        sources.push(
            ProviderResult::new(SourceApi::Google, format!("claim {}", i))
                .rated(normalizer.normalize(Some(rating))),
        );

        let before = aggregate(&sources);
        let mut extended = sources.clone();
        extended.push(ProviderResult::new(SourceApi::RapidApi, "agreeing").rated(before.winner));
        let after = aggregate(&extended);

        assert_eq!(after.winner, before.winner);
        assert!(after.confidence >= before.confidence);
    }
}

/// `n` sources of which the first `agreeing` are false and the rest unknown
fn ballot(n: usize, agreeing: usize) -> Vec<ProviderResult> {
    (0..n)
        .map(|i| {
            let rating = if i < agreeing {
                NormalizedRating::FalseOrMisleading
            } else {
                NormalizedRating::Unknown
            };
            ProviderResult::new(SourceApi::Google, format!("claim {}", i)).rated(rating)
        })
        .collect()
}

#[test]
fn test_confidence_rises_with_winner_count() {
    let confidences: Vec<f32> = [3, 4, 5]
        .into_iter()
        .map(|agreeing| {
            let provisional = aggregate(&ballot(5, agreeing));
            assert_eq!(provisional.winner, NormalizedRating::FalseOrMisleading);
            assert_eq!(provisional.total, 5);
            provisional.confidence
        })
        .collect();

    assert!((confidences[0] - 0.6).abs() < 1e-6);
    assert!((confidences[1] - 0.8).abs() < 1e-6);
    assert!((confidences[2] - 1.0).abs() < 1e-6);
    assert!(confidences[0] < confidences[1]);
    assert!(confidences[1] < confidences[2]);
}

#[test]
fn test_aggregate_is_idempotent() {
    let normalizer = RatingNormalizer::default();
    let sources = normalizer.normalize_all(five_sources());

    let first = aggregate(&sources);
    let second = aggregate(&sources);

    assert_eq!(first, second);
    assert_eq!(first.verdict, Verdict::Misleading);
    assert_eq!(first.count, 3);
    assert!(!first.needs_fallback);
}

#[test]
fn test_normalizer_is_total() {
    let normalizer = RatingNormalizer::default();
    let samples = [
        "", " ", "TRUE", "true!!!", "Pants on Fire!", "🤷", "ложь", "null", "0", "N/A",
        "Mostly True / Partly False", "\u{200b}", "Misattributed", "Satire",
    ];
    for sample in samples {
        let rating = normalizer.normalize(Some(sample));
        assert!(NormalizedRating::PRECEDENCE.contains(&rating));
    }
    assert_eq!(normalizer.normalize(None), NormalizedRating::Unknown);
}
