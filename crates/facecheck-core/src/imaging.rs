//! Encoded image plus its decoded pixel buffer, cropping and outline drawing.

use crate::types::PixelRect;
use image::{DynamicImage, GenericImage, ImageFormat, Rgba};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// File extensions accepted for uploads.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("image dimensions are zero")]
    ZeroDimensions,
}

/// Container formats the vision service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFormat {
    Jpeg,
    Png,
}

impl From<EncodedFormat> for ImageFormat {
    fn from(format: EncodedFormat) -> Self {
        match format {
            EncodedFormat::Jpeg => ImageFormat::Jpeg,
            EncodedFormat::Png => ImageFormat::Png,
        }
    }
}

/// An uploaded or captured image. Immutable once loaded.
#[derive(Clone)]
pub struct ImageData {
    bytes: Vec<u8>,
    pixels: DynamicImage,
    format: EncodedFormat,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("format", &self.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl ImageData {
    /// Decode raw JPEG/PNG bytes. The format is sniffed from the magic bytes.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, ImageError> {
        let format = match image::guess_format(&bytes) {
            Ok(ImageFormat::Jpeg) => EncodedFormat::Jpeg,
            Ok(ImageFormat::Png) => EncodedFormat::Png,
            _ => return Err(ImageError::UnsupportedFormat),
        };

        let pixels = image::load_from_memory_with_format(&bytes, format.into())
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImageError::ZeroDimensions);
        }

        Ok(Self { bytes, pixels, format })
    }

    /// Encode a pixel buffer, keeping both representations.
    pub fn encode(pixels: DynamicImage, format: EncodedFormat) -> Result<Self, ImageError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImageError::ZeroDimensions);
        }
        let bytes = encode_pixels(&pixels, format)?;
        Ok(Self { bytes, pixels, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn format(&self) -> EncodedFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Crop to `rect` (clamped to the image) and re-encode in the same format.
    pub fn crop(&self, rect: PixelRect) -> Result<ImageData, ImageError> {
        let rect = rect.clamp_to(self.width(), self.height());
        if rect.is_empty() {
            return Err(ImageError::ZeroDimensions);
        }
        let cropped = self.pixels.crop_imm(rect.x, rect.y, rect.width, rect.height);
        Self::encode(cropped, self.format)
    }
}

/// Encode pixels to bytes. JPEG has no alpha channel, so it is fed RGB.
pub fn encode_pixels(pixels: &DynamicImage, format: EncodedFormat) -> Result<Vec<u8>, ImageError> {
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        EncodedFormat::Jpeg => {
            DynamicImage::ImageRgb8(pixels.to_rgb8()).write_to(&mut buf, ImageFormat::Jpeg)
        }
        EncodedFormat::Png => pixels.write_to(&mut buf, ImageFormat::Png),
    };
    result.map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Whether `path` carries one of the [`SUPPORTED_EXTENSIONS`] (case-insensitive).
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Colors and stroke used when outlining faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineStyle {
    pub stroke_width: u32,
    pub match_color: Rgba<u8>,
    pub miss_color: Rgba<u8>,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            stroke_width: 5,
            match_color: Rgba([0, 255, 0, 255]),
            miss_color: Rgba([255, 0, 0, 255]),
        }
    }
}

/// Draw a rectangle outline `stroke` pixels thick, inward from the edges of `rect`.
pub fn draw_outline(canvas: &mut DynamicImage, rect: PixelRect, color: Rgba<u8>, stroke: u32) {
    let rect = rect.clamp_to(canvas.width(), canvas.height());
    if rect.is_empty() || stroke == 0 {
        return;
    }

    // A stroke wider than half the rectangle simply fills it.
    let stroke_x = stroke.min(rect.width.div_ceil(2));
    let stroke_y = stroke.min(rect.height.div_ceil(2));

    for y in rect.y..rect.bottom() {
        let on_horizontal_edge = y < rect.y + stroke_y || y >= rect.bottom() - stroke_y;
        for x in rect.x..rect.right() {
            let on_vertical_edge = x < rect.x + stroke_x || x >= rect.right() - stroke_x;
            if on_horizontal_edge || on_vertical_edge {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}
