use serde::Serialize;

use crate::{error::ClassifierError, model::LabelSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f32,
}

/// Pair each score with its same-index label and return the top `k`,
/// descending by score. The sort is stable, so equal scores keep their
/// original index order and the output is deterministic.
pub fn rank(
    scores: &[f32],
    labels: &LabelSet,
    k: usize,
) -> Result<Vec<ScoredLabel>, ClassifierError> {
    if scores.len() != labels.len() {
        return Err(ClassifierError::LengthMismatch {
            scores: scores.len(),
            labels: labels.len(),
        });
    }

    let mut ranked: Vec<ScoredLabel> = scores
        .iter()
        .zip(labels.iter())
        .map(|(&score, label)| ScoredLabel {
            label: label.to_string(),
            score,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(k);
    Ok(ranked)
}
