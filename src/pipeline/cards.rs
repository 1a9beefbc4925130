//! Card extraction: turn a model reply into [`StudyCard`]s.
//!
//! The model is asked for a bare JSON array of `{"question", "answer"}`
//! objects, but replies drift: the array arrives wrapped in ```` ```json ````
//! fences, or with a sentence of preamble. Cleanup is deterministic: strip
//! an outer fence, then parse the outermost `[...]`. Cards with a blank
//! question or answer are dropped.

use crate::error::BatchError;
use crate::output::StudyCard;
use crate::pipeline::batch::Batch;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*)\r?\n```\s*$").unwrap());

#[derive(Debug, Deserialize)]
struct RawCard {
    #[serde(alias = "front", alias = "q")]
    question: String,
    #[serde(alias = "back", alias = "a")]
    answer: String,
}

/// Parse the reply for `batch` into study cards.
pub fn parse_cards(reply: &str, batch: &Batch) -> Result<Vec<StudyCard>, BatchError> {
    let malformed = |detail: String| BatchError::MalformedResponse {
        batch: batch.batch_index,
        detail,
    };

    let body = strip_fences(reply.trim());
    let (start, end) = match (body.find('['), body.rfind(']')) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return Err(malformed("reply contains no JSON array".into())),
    };

    let raw: Vec<RawCard> =
        serde_json::from_str(&body[start..=end]).map_err(|e| malformed(e.to_string()))?;

    let source_chunks: Vec<usize> = batch.sequence_range().collect();
    let chapter_path = batch
        .chunks
        .first()
        .map(|c| c.chapter_path.clone())
        .unwrap_or_default();

    Ok(raw
        .into_iter()
        .filter(|c| !c.question.trim().is_empty() && !c.answer.trim().is_empty())
        .map(|c| StudyCard {
            question: c.question.trim().to_string(),
            answer: c.answer.trim().to_string(),
            source_chunks: source_chunks.clone(),
            chapter_path: chapter_path.clone(),
        })
        .collect())
}

fn strip_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => input,
    }
}
