use thiserror::Error;

use crate::geometry::Rect;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("image dimensions are zero ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("crop {rect:?} does not fit inside a {image_w}x{image_h} image")]
    CropOutOfBounds { rect: Rect, image_w: u32, image_h: u32 },

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

pub type Result<T, E = VisionError> = std::result::Result<T, E>;
