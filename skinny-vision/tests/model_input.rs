use std::path::PathBuf;

use anyhow::Result;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use skinny_vision::detector::{ScriptedDetector, ScriptedResponse};
use skinny_vision::model::DETECTOR_MODEL_FILE;
use skinny_vision::normalize::{
    encode_for_transport, normalize_for_model, prepare_for_analysis, DATA_URI_PREFIX,
    MODEL_INPUT_SIZE,
};
use skinny_vision::{
    BoundingBox, CropStage, FaceCandidate, OrientationHint, Pipeline, YuNetDetector,
};

fn skin_tone(w: u32, h: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
        Rgb([200 - (x % 40) as u8, 160 - (y % 30) as u8, 140])
    }))
}

#[test]
fn pipeline_output_normalizes_to_model_input() -> Result<()> {
    let pipeline = Pipeline::new(ScriptedDetector::new([
        ScriptedResponse::Faces(vec![FaceCandidate::new(
            BoundingBox::new(900, 1200, 600, 700),
            0.97,
        )]),
        ScriptedResponse::Faces(vec![FaceCandidate::new(
            BoundingBox::new(700, 650, 600, 700),
            0.97,
        )]),
    ]));

    let result = pipeline.run_pipeline(skin_tone(3024, 4032), OrientationHint::Unknown)?;
    assert_eq!(result.stage, CropStage::Precise);

    let normalized = normalize_for_model(&result.image);
    assert_eq!(normalized.dimensions(), (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE));

    let payload = prepare_for_analysis(&result.image)?;
    assert!(payload.starts_with(DATA_URI_PREFIX));
    Ok(())
}

#[test]
fn quality_is_overridable() -> Result<()> {
    let img = normalize_for_model(&skin_tone(500, 500));
    let low = encode_for_transport(&img, 20)?;
    let high = encode_for_transport(&img, 100)?;
    assert!(low.starts_with("data:image/jpeg;base64,"));
    assert!(low.len() < high.len());
    Ok(())
}

fn model_path() -> PathBuf {
    std::env::var_os("SKINNY_YUNET_MODEL")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models").join(DETECTOR_MODEL_FILE))
}

/// Needs the YuNet ONNX file; skipped when it is not available.
#[test]
fn yunet_finds_no_face_in_synthetic_pattern() -> Result<()> {
    env_logger::try_init().ok();
    let path = model_path();
    if !path.exists() {
        eprintln!("Skipping: {} not found", path.display());
        return Ok(());
    }

    let detector = YuNetDetector::from_file(&path, 0.6, 0.3)?;
    let pipeline = Pipeline::new(detector);
    let result = pipeline.run_pipeline(skin_tone(640, 480), OrientationHint::Unknown)?;

    assert!(!result.face_detected);
    assert_eq!(result.stage, CropStage::CenterFallback);
    assert_eq!(result.image.dimensions(), (480, 480));
    Ok(())
}
