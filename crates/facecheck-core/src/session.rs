//! Per-session verification context.

use crate::imaging::ImageData;
use crate::types::FaceDetail;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The accepted document image and the faces detected in it.
#[derive(Debug, Clone)]
pub struct ReferenceFace {
    pub image: ImageData,
    pub faces: Vec<FaceDetail>,
    pub accepted_at: DateTime<Utc>,
}

/// State carried across the upload → verify → locate steps of one operator session.
///
/// The reference is set by the first document that yields a face and is only
/// ever replaced by a later successful document, never cleared.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    reference: Option<ReferenceFace>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            reference: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn reference(&self) -> Option<&ReferenceFace> {
        self.reference.as_ref()
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Store a document image with at least one face, replacing any previous one.
    pub(crate) fn accept_reference(&mut self, image: ImageData, faces: Vec<FaceDetail>) {
        debug_assert!(!faces.is_empty(), "reference requires a detected face");
        tracing::info!(
            session = %self.id,
            faces = faces.len(),
            replaced = self.reference.is_some(),
            "reference face accepted"
        );
        self.reference = Some(ReferenceFace {
            image,
            faces,
            accepted_at: Utc::now(),
        });
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
