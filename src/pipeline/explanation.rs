//! Explanation composer
//!
//! Builds the user-facing rationale. An AI explanation is used verbatim when
//! present, prefixed with the provider tally; otherwise a templated sentence
//! cites the winning bucket.

use super::aggregator::{aggregate, Provisional};
use crate::models::{NormalizedRating, ProviderResult, Verdict};

pub const NO_SOURCES_EXPLANATION: &str =
    "No matching fact-checks were found; verdict is inconclusive.";

/// Compose the explanation for `verdict`.
///
/// Only sources that went through the rating normalizer are cited; unrated
/// records are ignored entirely, including in the "of M" total.
pub fn compose(verdict: Verdict, sources: &[ProviderResult], ai_explanation: Option<&str>) -> String {
    let rated: Vec<ProviderResult> = sources
        .iter()
        .filter(|s| s.normalized_rating().is_some())
        .cloned()
        .collect();
    let provisional = aggregate(&rated);

    let ai_text = ai_explanation.map(str::trim).filter(|t| !t.is_empty());

    match ai_text {
        Some(text) if rated.is_empty() => text.to_string(),
        Some(text) => format!("{} {}", tally_sentence(&provisional), text),
        None if rated.is_empty() => NO_SOURCES_EXPLANATION.to_string(),
        None => templated(verdict, &provisional, &rated),
    }
}

/// "N of M sources rate this claim as <category>."
fn tally_sentence(provisional: &Provisional) -> String {
    format!(
        "{} of {} {} rate this claim as {}.",
        provisional.count,
        provisional.total,
        if provisional.total == 1 { "source" } else { "sources" },
        provisional.winner.label()
    )
}

fn templated(verdict: Verdict, provisional: &Provisional, rated: &[ProviderResult]) -> String {
    let names = cited_names(rated, provisional.winner);
    let mut sentence = format!(
        "{} of {} {} rate this claim as {}",
        provisional.count,
        provisional.total,
        if provisional.total == 1 { "source" } else { "sources" },
        provisional.winner.label()
    );
    if !names.is_empty() {
        sentence.push_str(&format!(" ({})", names.join(", ")));
    }
    sentence.push('.');

    if Verdict::from(provisional.winner) != verdict {
        sentence.push_str(&format!(
            " Provider ratings were inconclusive; the final verdict is {}.",
            verdict.as_str()
        ));
    } else if provisional.needs_fallback {
        sentence.push_str(" There is no clear majority among the sources, so treat this verdict with caution.");
    }

    sentence
}

/// Distinct cited names in the given bucket, in source order
fn cited_names(rated: &[ProviderResult], bucket: NormalizedRating) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for source in rated.iter().filter(|s| s.bucket() == bucket) {
        let name = source.cited_name().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
