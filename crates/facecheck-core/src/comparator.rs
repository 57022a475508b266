//! Reference-versus-candidate verification.

use crate::imaging::ImageData;
use crate::provider::{VisionError, VisionProvider};
use crate::session::ReferenceFace;
use crate::types::Threshold;
use serde::Serialize;

/// Result of comparing a candidate image against the reference face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Similarity percentage of the provider's top-ranked match.
    Matched { similarity: f32 },
    NotMatched,
}

impl Outcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Matched { .. })
    }

    pub fn similarity(&self) -> Option<f32> {
        match self {
            Outcome::Matched { similarity } => Some(*similarity),
            Outcome::NotMatched => None,
        }
    }
}

/// Compare `candidate` against the reference at `threshold`.
///
/// The provider applies the threshold; any returned match counts.
pub fn verify<P: VisionProvider + ?Sized>(
    provider: &P,
    reference: &ReferenceFace,
    candidate: &ImageData,
    threshold: Threshold,
) -> Result<Outcome, VisionError> {
    compare_bytes(provider, reference.image.bytes(), candidate.bytes(), threshold)
}

pub(crate) fn compare_bytes<P: VisionProvider + ?Sized>(
    provider: &P,
    reference: &[u8],
    candidate: &[u8],
    threshold: Threshold,
) -> Result<Outcome, VisionError> {
    let matches = provider.compare_faces(reference, candidate, threshold)?;

    let outcome = match matches.first() {
        Some(best) => Outcome::Matched {
            similarity: best.similarity,
        },
        None => Outcome::NotMatched,
    };

    tracing::debug!(
        threshold = threshold.value(),
        matches = matches.len(),
        ?outcome,
        "comparison finished"
    );

    Ok(outcome)
}
