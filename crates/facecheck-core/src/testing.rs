//! Scripted vision provider and image helpers for unit tests.

use crate::imaging::{encode_pixels, EncodedFormat, ImageData};
use crate::provider::{VisionError, VisionProvider};
use crate::types::{AgeRange, BoundingBox, Emotion, FaceDetail, FaceMatch, Threshold};
use image::{DynamicImage, Rgb, RgbImage};
use std::cell::RefCell;
use std::collections::VecDeque;

/// A compare call as seen by the provider.
#[derive(Debug, Clone)]
pub struct CompareCall {
    pub source_len: usize,
    pub target_len: usize,
    pub threshold: Threshold,
}

/// Replays queued responses in order. Panics when a queue runs dry.
#[derive(Default)]
pub struct ScriptedProvider {
    detections: RefCell<VecDeque<Result<Vec<FaceDetail>, VisionError>>>,
    comparisons: RefCell<VecDeque<Result<Vec<FaceMatch>, VisionError>>>,
    pub detect_calls: RefCell<usize>,
    pub compare_calls: RefCell<Vec<CompareCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_detect(self, response: Result<Vec<FaceDetail>, VisionError>) -> Self {
        self.detections.borrow_mut().push_back(response);
        self
    }

    pub fn on_compare(self, response: Result<Vec<FaceMatch>, VisionError>) -> Self {
        self.comparisons.borrow_mut().push_back(response);
        self
    }

    pub fn compare_count(&self) -> usize {
        self.compare_calls.borrow().len()
    }
}

impl VisionProvider for ScriptedProvider {
    fn detect_faces(&self, image: &[u8]) -> Result<Vec<FaceDetail>, VisionError> {
        assert!(!image.is_empty(), "detect called with empty image");
        *self.detect_calls.borrow_mut() += 1;
        self.detections
            .borrow_mut()
            .pop_front()
            .expect("unexpected detect_faces call")
    }

    fn compare_faces(
        &self,
        source: &[u8],
        target: &[u8],
        threshold: Threshold,
    ) -> Result<Vec<FaceMatch>, VisionError> {
        self.compare_calls.borrow_mut().push(CompareCall {
            source_len: source.len(),
            target_len: target.len(),
            threshold,
        });
        self.comparisons
            .borrow_mut()
            .pop_front()
            .expect("unexpected compare_faces call")
    }
}

pub fn bbox(left: f32, top: f32, width: f32, height: f32) -> BoundingBox {
    BoundingBox { left, top, width, height }
}

pub fn face_at(bounding_box: BoundingBox) -> FaceDetail {
    FaceDetail {
        age_range: AgeRange { low: 25, high: 35 },
        emotions: vec![
            Emotion { label: "CALM".into(), confidence: 2.0 },
            Emotion { label: "HAPPY".into(), confidence: 97.5 },
        ],
        bounding_box,
    }
}

pub fn matched(similarity: f32) -> FaceMatch {
    FaceMatch {
        similarity,
        bounding_box: bbox(0.0, 0.0, 1.0, 1.0),
    }
}

/// Solid grey PNG of the given size.
pub fn png_image(width: u32, height: u32) -> ImageData {
    let pixels = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 90, 90])));
    let bytes = encode_pixels(&pixels, EncodedFormat::Png).expect("encode test png");
    ImageData::decode(bytes).expect("decode test png")
}

/// Something the workflow rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Banner(crate::workflow::BannerLevel, String),
    Text(String),
    Image { caption: String, width: u32, height: u32 },
}

/// Presenter that records everything it is asked to show.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub rendered: Vec<Rendered>,
}

impl RecordingPresenter {
    pub fn texts(&self) -> Vec<&str> {
        self.rendered
            .iter()
            .filter_map(|r| match r {
                Rendered::Text(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn banners(&self) -> Vec<(crate::workflow::BannerLevel, &str)> {
        self.rendered
            .iter()
            .filter_map(|r| match r {
                Rendered::Banner(level, message) => Some((*level, message.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn images(&self) -> Vec<&str> {
        self.rendered
            .iter()
            .filter_map(|r| match r {
                Rendered::Image { caption, .. } => Some(caption.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl crate::workflow::Presenter for RecordingPresenter {
    fn banner(&mut self, level: crate::workflow::BannerLevel, message: &str) {
        self.rendered.push(Rendered::Banner(level, message.to_string()));
    }

    fn text(&mut self, line: &str) {
        self.rendered.push(Rendered::Text(line.to_string()));
    }

    fn image(&mut self, caption: &str, image: &DynamicImage) {
        self.rendered.push(Rendered::Image {
            caption: caption.to_string(),
            width: image.width(),
            height: image.height(),
        });
    }
}
