//! facecheck-core: identity verification against a document photo.
//!
//! Threads a document image, a verification image (selfie, camera capture or
//! crowd photo) and a similarity threshold through a hosted vision service,
//! and renders bounding-box overlays for crowd searches.

pub mod comparator;
pub mod crowd;
pub mod extractor;
pub mod imaging;
pub mod provider;
pub mod session;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use comparator::Outcome;
pub use crowd::{CrowdFace, CrowdReport};
pub use extractor::FaceRecord;
pub use imaging::{ImageData, ImageError, OutlineStyle};
pub use provider::{VisionError, VisionProvider};
pub use session::{ReferenceFace, Session};
pub use types::{AgeRange, BoundingBox, Emotion, FaceDetail, FaceMatch, PixelRect, Threshold};
pub use workflow::{
    BannerLevel, CaptureSource, CrowdOutcome, DocumentOutcome, Presenter, Step,
    VerificationOutcome, Workflow, WorkflowSettings,
};
