//! Locate the reference person within a group photo.
//!
//! Every detected face is cropped out, compared on its own against the
//! reference, and outlined on a copy of the crowd image.

use crate::comparator::{compare_bytes, Outcome};
use crate::imaging::{draw_outline, ImageData, OutlineStyle};
use crate::provider::{VisionError, VisionProvider};
use crate::session::ReferenceFace;
use crate::types::{PixelRect, Threshold};
use image::DynamicImage;
use serde::Serialize;

/// Comparison result for one face of the crowd image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrowdFace {
    /// 1-based position in detection order.
    pub index: usize,
    pub rect: PixelRect,
    pub matched: bool,
    pub similarity: Option<f32>,
}

/// Annotated crowd image with per-face results.
#[derive(Debug, Clone)]
pub struct CrowdReport {
    pub image: DynamicImage,
    pub faces: Vec<CrowdFace>,
    pub any_match: bool,
}

/// Detect, crop, compare and outline every face in `crowd`.
///
/// Detection failures are returned. A failed comparison or an empty crop
/// only marks that face as not matched.
pub fn locate<P: VisionProvider + ?Sized>(
    provider: &P,
    reference: &ReferenceFace,
    crowd: &ImageData,
    threshold: Threshold,
    style: &OutlineStyle,
) -> Result<CrowdReport, VisionError> {
    let detected = provider.detect_faces(crowd.bytes())?;
    tracing::info!(
        faces = detected.len(),
        width = crowd.width(),
        height = crowd.height(),
        threshold = threshold.value(),
        "crowd: faces detected"
    );

    if detected.is_empty() {
        return Ok(CrowdReport {
            image: crowd.pixels().clone(),
            faces: Vec::new(),
            any_match: false,
        });
    }

    let mut canvas = crowd.pixels().clone();
    if !canvas.color().has_color() {
        canvas = DynamicImage::ImageRgba8(canvas.to_rgba8());
    }

    let mut faces = Vec::with_capacity(detected.len());
    for (i, face) in detected.iter().enumerate() {
        let rect = face
            .bounding_box
            .to_pixels(crowd.width(), crowd.height())
            .clamp_to(crowd.width(), crowd.height());

        let outcome = compare_crop(provider, reference, crowd, rect, threshold, i + 1);
        let color = if outcome.is_match() {
            style.match_color
        } else {
            style.miss_color
        };
        draw_outline(&mut canvas, rect, color, style.stroke_width);

        faces.push(CrowdFace {
            index: i + 1,
            rect,
            matched: outcome.is_match(),
            similarity: outcome.similarity(),
        });
    }

    let any_match = faces.iter().any(|f| f.matched);
    tracing::info!(
        faces = faces.len(),
        matched = faces.iter().filter(|f| f.matched).count(),
        any_match,
        "crowd: search finished"
    );

    Ok(CrowdReport {
        image: canvas,
        faces,
        any_match,
    })
}

fn compare_crop<P: VisionProvider + ?Sized>(
    provider: &P,
    reference: &ReferenceFace,
    crowd: &ImageData,
    rect: PixelRect,
    threshold: Threshold,
    index: usize,
) -> Outcome {
    let crop = match crowd.crop(rect) {
        Ok(crop) => crop,
        Err(err) => {
            tracing::warn!(face = index, ?rect, error = %err, "crowd: cannot crop face");
            return Outcome::NotMatched;
        }
    };

    match compare_bytes(provider, reference.image.bytes(), crop.bytes(), threshold) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(face = index, error = %err, "crowd: comparison failed; treating as no match");
            Outcome::NotMatched
        }
    }
}
