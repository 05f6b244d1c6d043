//! Prompt construction and response parsing for the AI collaborator

use super::{AiJudgement, FallbackError};
use crate::models::{ProviderResult, Verdict};
use crate::pipeline::RatingNormalizer;
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Model labels share the provider rating vocabulary
static LABELS: Lazy<RatingNormalizer> = Lazy::new(RatingNormalizer::default);

/// Characters of a source's claim text quoted as evidence
const EVIDENCE_SNIPPET_CHARS: usize = 300;

/// Render up to `max_sources` sources as a bullet list.
/// Sources with neither claim text nor rating are skipped.
pub fn evidence_summary(sources: &[ProviderResult], max_sources: usize) -> String {
    sources
        .iter()
        .take(max_sources)
        .filter(|s| !s.claim_text.trim().is_empty() || s.raw_rating.is_some())
        .map(|s| {
            let snippet: String = s.claim_text.chars().take(EVIDENCE_SNIPPET_CHARS).collect();
            format!(
                "- Source: {}\n  Verdict: {}\n  Context: {}\n  URL: {}",
                s.cited_name(),
                s.raw_rating.as_deref().unwrap_or(""),
                snippet,
                s.review_link.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

const JSON_CONTRACT: &str = r#"Respond ONLY with a JSON object in this exact format:
{
    "label": "True" or "False" or "Unclear",
    "confidence": 0.0 to 1.0,
    "explanation": "clear, concise explanation of your reasoning"
}"#;

pub fn classify_prompt(claim: &str, sources: &[ProviderResult], max_sources: usize) -> String {
    let evidence = evidence_summary(sources, max_sources);
    if evidence.is_empty() {
        format!(
            "You are a fact-checking assistant. Classify the following claim.\n\n\
             Claim to verify: \"{claim}\"\n\n\
             Task:\n\
             1. Analyze the claim using your knowledge\n\
             2. Classify the claim as \"True\", \"False\", or \"Unclear\"\n\
             3. Provide a confidence score between 0.0 and 1.0\n\
             4. Generate a clear, concise explanation\n\n\
             {JSON_CONTRACT}\n\n\
             Guidelines:\n\
             - \"True\": Claim appears to be accurate\n\
             - \"False\": Claim appears to be inaccurate or misleading\n\
             - \"Unclear\": Insufficient information to determine\n\
             - Confidence should reflect your certainty level"
        )
    } else {
        format!(
            "You are a fact-checking assistant. Classify the following claim based on the provided fact-checking sources.\n\n\
             Claim to verify: \"{claim}\"\n\n\
             Fact-Checking Sources:\n{evidence}\n\n\
             Task:\n\
             1. Analyze the claim against the provided fact-checking sources\n\
             2. Classify the claim as \"True\", \"False\", or \"Unclear\"\n\
             3. Provide a confidence score between 0.0 and 1.0\n\
             4. Generate a clear, concise explanation based on the sources\n\n\
             {JSON_CONTRACT}\n\n\
             Guidelines:\n\
             - \"True\": Claim is accurate and supported by sources\n\
             - \"False\": Claim is inaccurate or misleading, contradicted by sources\n\
             - \"Unclear\": Insufficient information or conflicting evidence\n\
             - Confidence should reflect source quality and agreement\n\
             - Explanation should reference specific sources and their verdicts"
        )
    }
}

pub fn explain_prompt(
    claim: &str,
    verdict: Verdict,
    sources: &[ProviderResult],
    max_sources: usize,
) -> String {
    let evidence = evidence_summary(sources, max_sources);
    let evidence = if evidence.is_empty() {
        "(no fact-checking sources available)".to_string()
    } else {
        evidence
    };
    format!(
        "You are a fact-checking assistant. Generate a clear, informative explanation based on the provided fact-checking sources.\n\n\
         Claim being verified: \"{claim}\"\n\
         Verdict reached: {verdict}\n\n\
         Fact-Checking Sources:\n{evidence}\n\n\
         Task: Generate a comprehensive explanation that:\n\
         1. Summarizes what the fact-checking sources found\n\
         2. References specific sources and their verdicts\n\
         3. Explains the reasoning behind the verdicts\n\
         4. Is clear and easy to understand\n\n\
         Respond with ONLY the explanation text (no JSON, no markdown formatting, just plain text)."
    )
}

/// Strip a ```json (or bare ```) fence if the model wrapped its answer in one
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = if let Some((_, rest)) = trimmed.split_once("```json") {
        rest
    } else if let Some((_, rest)) = trimmed.split_once("```") {
        rest
    } else {
        return trimmed;
    };
    body.split("```").next().unwrap_or(body).trim()
}

/// Map a free-text label onto a verdict. Negative readings win.
pub fn label_to_verdict(label: &str) -> Verdict {
    Verdict::from(LABELS.normalize(Some(label)))
}

#[derive(Debug, Deserialize)]
struct RawJudgement {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
    #[serde(default)]
    explanation: Option<String>,
}

/// Parse the model's classification answer
pub fn parse_judgement(text: &str) -> Result<AiJudgement, FallbackError> {
    let body = strip_code_fence(text);
    let raw: RawJudgement = serde_json::from_str(body)
        .map_err(|e| FallbackError::Malformed(format!("not a JSON object: {}", e)))?;

    let confidence = match raw.confidence {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|c| c.is_finite())
    .ok_or_else(|| FallbackError::Malformed("missing or non-numeric confidence".to_string()))?;

    let verdict = raw
        .label
        .as_deref()
        .map(label_to_verdict)
        .unwrap_or(Verdict::Unknown);

    Ok(AiJudgement {
        verdict,
        confidence: (confidence as f32).clamp(0.0, 1.0),
        explanation: raw
            .explanation
            .map(|e| e.trim().to_string())
            .unwrap_or_default(),
    })
}
