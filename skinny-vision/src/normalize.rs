//! Model-input normalization and transport encoding.
//!
//! The analysis server expects a 224x224 JPEG wrapped in a data URI.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{
    codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ExtendedColorType,
    GenericImageView, ImageEncoder,
};
use log::debug;

use crate::error::{Result, VisionError};

/// Input edge length of the remote skin-analysis model.
pub const MODEL_INPUT_SIZE: u32 = 224;

/// Calibrated JPEG quality for skin texture vs. payload size.
pub const DEFAULT_JPEG_QUALITY: u8 = 88;

pub const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Qualities probed by [`compare_qualities`] when tuning the transport encoding.
pub const QUALITY_SWEEP: [u8; 6] = [70, 80, 85, 88, 90, 95];

/// Resize to the fixed 224x224 model input with bilinear filtering.
pub fn normalize_for_model(image: &DynamicImage) -> DynamicImage {
    image.resize_exact(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, FilterType::Triangle)
}

/// Shrink an image for upload.
///
/// A `max_size` at or below the model size means the upload is for analysis, so
/// the result is the 224x224 model input. Larger limits only ever down-scale,
/// keeping the aspect ratio.
pub fn optimize_for_upload(image: &DynamicImage, max_size: u32) -> DynamicImage {
    if max_size <= MODEL_INPUT_SIZE {
        return normalize_for_model(image);
    }
    let (width, height) = image.dimensions();
    let ratio = (max_size as f32 / width as f32).min(max_size as f32 / height as f32);
    if ratio >= 1.0 {
        return image.clone();
    }
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// JPEG-encode `image` at `quality` (1-100).
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| VisionError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Encode as `data:image/jpeg;base64,<payload>`.
pub fn encode_for_transport(image: &DynamicImage, quality: u8) -> Result<String> {
    let jpeg = encode_jpeg(image, quality)?;
    debug!(
        "encoded {}x{} at quality {}: {} KB",
        image.width(),
        image.height(),
        quality,
        jpeg.len() / 1024
    );
    Ok(format!("{}{}", DATA_URI_PREFIX, BASE64.encode(&jpeg)))
}

/// Normalize to the model size and encode at the default quality.
pub fn prepare_for_analysis(image: &DynamicImage) -> Result<String> {
    let normalized = normalize_for_model(image);
    let payload = encode_for_transport(&normalized, DEFAULT_JPEG_QUALITY)?;
    debug!("analysis payload: {} characters", payload.len());
    Ok(payload)
}

#[derive(Debug, Clone)]
pub struct QualityProbe {
    pub quality: u8,
    pub jpeg_bytes: usize,
    pub payload: String,
}

/// Encode the model-sized image at each of `qualities` and report the sizes.
pub fn compare_qualities(image: &DynamicImage, qualities: &[u8]) -> Result<Vec<QualityProbe>> {
    let normalized = normalize_for_model(image);
    qualities
        .iter()
        .map(|&quality| {
            let jpeg = encode_jpeg(&normalized, quality)?;
            debug!("quality {}: {} KB", quality, jpeg.len() / 1024);
            Ok(QualityProbe {
                quality,
                jpeg_bytes: jpeg.len(),
                payload: format!("{}{}", DATA_URI_PREFIX, BASE64.encode(&jpeg)),
            })
        })
        .collect()
}
