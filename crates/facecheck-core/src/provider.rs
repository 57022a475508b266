//! Seam to the hosted vision service.
//!
//! Detection and comparison are black-box RPCs. Implementations convert the
//! provider's responses into typed records before returning them.

use crate::types::{FaceDetail, FaceMatch, Threshold};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    /// The service rejected the request (bad image, auth, throttling, ...).
    #[error("{code}: {message}")]
    Provider { code: String, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl VisionError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Face detection and comparison over raw encoded JPEG/PNG bytes.
pub trait VisionProvider {
    /// Detect every face in the image with its full attribute set.
    fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceDetail>, VisionError>;

    /// Compare the largest face in `source` against the faces in `target`.
    ///
    /// An empty result means no face reached `threshold`; it is not an error.
    /// Empty buffers fail with [`VisionError::InvalidArgument`].
    fn compare_faces(
        &self,
        source: &[u8],
        target: &[u8],
        threshold: Threshold,
    ) -> Result<Vec<FaceMatch>, VisionError>;
}

impl<P: VisionProvider + ?Sized> VisionProvider for &P {
    fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceDetail>, VisionError> {
        (**self).detect_faces(image)
    }

    fn compare_faces(
        &self,
        source: &[u8],
        target: &[u8],
        threshold: Threshold,
    ) -> Result<Vec<FaceMatch>, VisionError> {
        (**self).compare_faces(source, target, threshold)
    }
}

impl<P: VisionProvider + ?Sized> VisionProvider for Box<P> {
    fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceDetail>, VisionError> {
        (**self).detect_faces(image)
    }

    fn compare_faces(
        &self,
        source: &[u8],
        target: &[u8],
        threshold: Threshold,
    ) -> Result<Vec<FaceMatch>, VisionError> {
        (**self).compare_faces(source, target, threshold)
    }
}

/// Reject empty buffers before they reach the wire.
pub fn ensure_image_bytes(name: &str, bytes: &[u8]) -> Result<(), VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::InvalidArgument(format!("{name} image is empty")));
    }
    Ok(())
}
