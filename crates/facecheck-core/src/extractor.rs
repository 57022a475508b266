//! Turns provider face details into ordered, display-ready records.

use crate::types::{AgeRange, BoundingBox, Emotion, FaceDetail};
use serde::Serialize;

/// One detected face, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceRecord {
    /// 1-based position in detection order.
    pub index: usize,
    pub age_range: AgeRange,
    /// Emotion labels in provider order.
    pub detected_emotions: Vec<String>,
    /// Emotions sorted by confidence, highest first.
    pub emotions: Vec<Emotion>,
    pub predominant_emotion: Option<Emotion>,
    pub bounding_box: BoundingBox,
}

/// Build a record per face, preserving detection order.
pub fn extract(faces: &[FaceDetail]) -> Vec<FaceRecord> {
    faces
        .iter()
        .enumerate()
        .map(|(i, face)| {
            let emotions = sort_by_confidence(&face.emotions);
            FaceRecord {
                index: i + 1,
                age_range: face.age_range,
                detected_emotions: face.emotions.iter().map(|e| e.label.clone()).collect(),
                predominant_emotion: emotions.first().cloned(),
                emotions,
                bounding_box: face.bounding_box,
            }
        })
        .collect()
}

/// Stable descending sort: equal confidences keep provider order.
pub fn sort_by_confidence(emotions: &[Emotion]) -> Vec<Emotion> {
    let mut sorted = emotions.to_vec();
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    sorted
}
