//! Arg-max decision and ranked probability table.

use serde::Serialize;
use thiserror::Error;

use crate::classifier::ClassVocabulary;

/// Errors that can occur while ranking a probability vector
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Probability vector has {actual} entries but the vocabulary has {expected} labels")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Probability at index {index} is not finite ({value})")]
    NonFinite { index: usize, value: f32 },

    #[error("Probability vector is empty")]
    Empty,
}

/// One row of the ranked probability table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLabel {
    pub label: String,
    pub probability: f32,
}

/// Outcome of classifying one utterance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Label with the highest probability
    pub label: String,
    /// Vocabulary index of `label`
    pub index: usize,
    /// Probabilities in vocabulary order
    pub probabilities: Vec<f32>,
    /// (label, probability) pairs, most likely first
    pub ranked: Vec<RankedLabel>,
}

impl PredictionResult {
    /// Probability assigned to the top label
    pub fn confidence(&self) -> Option<f32> {
        self.probabilities.get(self.index).copied()
    }

    /// First `n` rows of the ranked table
    pub fn top_k(&self, n: usize) -> &[RankedLabel] {
        &self.ranked[..n.min(self.ranked.len())]
    }
}

/// Index of the largest probability, lowest index on ties
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ if p.is_nan() => {}
            _ => best = Some((i, p)),
        }
    }
    best.map(|(i, _)| i)
}

/// Pick the top label and rank every label by probability
///
/// Ranking is descending and stable: labels with equal probability keep
/// their vocabulary order.
pub fn decide(
    probabilities: &[f32],
    vocabulary: &ClassVocabulary,
) -> Result<PredictionResult, RankingError> {
    if probabilities.len() != vocabulary.len() {
        return Err(RankingError::LengthMismatch {
            expected: vocabulary.len(),
            actual: probabilities.len(),
        });
    }

    if let Some((index, &value)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite())
    {
        return Err(RankingError::NonFinite { index, value });
    }

    let index = argmax(probabilities).ok_or(RankingError::Empty)?;

    let mut ranked: Vec<RankedLabel> = vocabulary
        .labels()
        .iter()
        .zip(probabilities)
        .map(|(label, &probability)| RankedLabel {
            label: label.clone(),
            probability,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(PredictionResult {
        label: vocabulary
            .label(index)
            .ok_or(RankingError::Empty)?
            .to_string(),
        index,
        probabilities: probabilities.to_vec(),
        ranked,
    })
}
