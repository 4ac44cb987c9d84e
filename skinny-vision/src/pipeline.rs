use image::{DynamicImage, GenericImageView};
use log::{debug, info, warn};

use crate::detector::{detect_or_none, FaceDetector};
use crate::diagnostics::{center_distance, CenterAccuracy};
use crate::error::{Result, VisionError};
use crate::geometry::{
    apply_crop, compute_first_stage_crop, compute_precise_center_crop, crop_center_fallback,
    BoundingBox, Rect,
};
use crate::orientation::{correct_orientation, OrientationHint};

/// Confidence reported whenever a detected face drove the crop.
pub const FACE_CONFIDENCE: f32 = 0.95;

/// Which path produced the final crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropStage {
    /// No usable face: centered square of the whole input.
    CenterFallback,
    /// Face found once but lost on re-detection: centered square of the first-stage crop.
    FirstStageFallback,
    /// Face re-detected: tight crop centered on it.
    Precise,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub image: DynamicImage,
    pub face_detected: bool,
    /// Faces found by the first detection pass.
    pub face_count: usize,
    pub confidence: f32,
    /// Box from the last successful detection pass, in the coordinates of the
    /// image that pass ran on. Diagnostic only.
    pub face_box: Option<BoundingBox>,
    pub stage: CropStage,
    /// Rect applied for the final crop, in the coordinates of the image it cut.
    pub final_rect: Rect,
    /// Distance between face center and crop center after a precise crop.
    pub center_offset_px: Option<f64>,
}

/// Two-stage face centering: detect, crop wide, re-detect, crop tight.
pub struct Pipeline<D> {
    detector: D,
}

impl<D: FaceDetector> Pipeline<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Rotate `image` upright according to `hint`, then center it on the face.
    pub fn run_pipeline(&self, image: DynamicImage, hint: OrientationHint) -> Result<PipelineResult> {
        let rotation = hint.resolve();
        let (w, h) = image.dimensions();
        let upright = correct_orientation(image, rotation);
        debug!(
            "orientation {}°: {}x{} -> {}x{}",
            rotation.degrees(),
            w,
            h,
            upright.width(),
            upright.height()
        );
        self.center_face(&upright)
    }

    /// Produce a square, face-centered crop of an already upright image.
    ///
    /// Only a zero-sized input is an error; every detector or geometry failure
    /// ends in a center crop instead.
    pub fn center_face(&self, image: &DynamicImage) -> Result<PipelineResult> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::EmptyImage { width, height });
        }

        let first = detect_or_none(&self.detector, image);
        let face_count = first.face_count();
        let Some(primary) = first.largest().copied() else {
            info!("no face detected, using center crop");
            return center_fallback(image);
        };
        debug!(
            "detected {} face(s), primary {:?} in {}x{}",
            face_count, primary.bbox, width, height
        );

        match self.two_stage(image, primary.bbox, face_count) {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("two-stage crop failed, using center crop: {}", e);
                center_fallback(image)
            }
        }
    }

    fn two_stage(
        &self,
        image: &DynamicImage,
        face: BoundingBox,
        face_count: usize,
    ) -> Result<PipelineResult> {
        let (width, height) = image.dimensions();
        let first_rect = compute_first_stage_crop(width, height, &face);
        let stage1 = apply_crop(image, first_rect)?;
        debug!("first stage crop {:?}", first_rect);

        let second = detect_or_none(&self.detector, &stage1);
        let Some(refined) = second.largest().copied() else {
            info!("face lost on re-detection, center cropping first stage");
            let rect = crop_center_fallback(stage1.width(), stage1.height());
            return Ok(PipelineResult {
                image: apply_crop(&stage1, rect)?,
                face_detected: true,
                face_count,
                confidence: FACE_CONFIDENCE,
                face_box: Some(face),
                stage: CropStage::FirstStageFallback,
                final_rect: rect,
                center_offset_px: None,
            });
        };
        debug!(
            "re-detected {} face(s), using {:?}",
            second.face_count(),
            refined.bbox
        );

        let final_rect = compute_precise_center_crop(stage1.width(), &refined.bbox);
        let final_image = apply_crop(&stage1, final_rect)?;
        let offset = center_distance(refined.bbox.center(), final_rect.center());
        info!(
            "precise crop {:?}: face {:.1}px from center ({})",
            final_rect,
            offset,
            CenterAccuracy::grade(offset, final_rect.width).label()
        );

        Ok(PipelineResult {
            image: final_image,
            face_detected: true,
            face_count,
            confidence: FACE_CONFIDENCE,
            face_box: Some(refined.bbox),
            stage: CropStage::Precise,
            final_rect,
            center_offset_px: Some(offset),
        })
    }
}

fn center_fallback(image: &DynamicImage) -> Result<PipelineResult> {
    let rect = crop_center_fallback(image.width(), image.height());
    Ok(PipelineResult {
        image: apply_crop(image, rect)?,
        face_detected: false,
        face_count: 0,
        confidence: 0.0,
        face_box: None,
        stage: CropStage::CenterFallback,
        final_rect: rect,
        center_offset_px: None,
    })
}
