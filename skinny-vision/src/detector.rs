//! Face detector capability consumed by the centering pipeline.
//!
//! A detector is passed into the pipeline explicitly. Whatever goes wrong inside
//! an adapter is folded into [`DetectionOutcome::NoFace`] by [`detect_or_none`],
//! because the pipeline recovers from "detector failed" and "no face present"
//! in exactly the same way.

use std::collections::VecDeque;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use log::{debug, warn};

use crate::geometry::BoundingBox;

/// One detected face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCandidate {
    pub bbox: BoundingBox,
    pub score: f32,
}

impl FaceCandidate {
    pub fn new(bbox: BoundingBox, score: f32) -> Self {
        Self { bbox, score }
    }

    /// Relative size used to pick the dominant face.
    pub fn area(&self) -> u64 {
        self.bbox.area()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    NoFace,
    Faces(Vec<FaceCandidate>),
}

impl DetectionOutcome {
    pub fn from_candidates(candidates: Vec<FaceCandidate>) -> Self {
        if candidates.is_empty() {
            Self::NoFace
        } else {
            Self::Faces(candidates)
        }
    }

    pub fn face_count(&self) -> usize {
        match self {
            Self::NoFace => 0,
            Self::Faces(faces) => faces.len(),
        }
    }

    /// Largest face by area. Ties go to the first one in detector order.
    pub fn largest(&self) -> Option<&FaceCandidate> {
        match self {
            Self::NoFace => None,
            Self::Faces(faces) => faces.iter().fold(None, |best, face| match best {
                Some(b) if b.area() >= face.area() => Some(b),
                _ => Some(face),
            }),
        }
    }
}

/// A face detection backend.
///
/// Implementations must be usable from several threads at once, serialising
/// internally if the underlying model needs exclusive access.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in `image`. Boxes are in `image` pixel coordinates.
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<FaceCandidate>>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for std::sync::Arc<T> {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<FaceCandidate>> {
        (**self).detect(image)
    }
}

/// Run `detector` and reduce the result to a [`DetectionOutcome`].
///
/// Adapter errors become `NoFace`. Boxes are clipped to the image and boxes
/// that end up empty are dropped.
pub fn detect_or_none<D: FaceDetector + ?Sized>(
    detector: &D,
    image: &DynamicImage,
) -> DetectionOutcome {
    let (width, height) = image.dimensions();
    match detector.detect(image) {
        Ok(candidates) => {
            let raw = candidates.len();
            let clipped: Vec<FaceCandidate> = candidates
                .into_iter()
                .filter_map(|c| {
                    c.bbox
                        .clip_to(width, height)
                        .map(|bbox| FaceCandidate { bbox, ..c })
                })
                .collect();
            if clipped.len() != raw {
                debug!(
                    "dropped {} detection(s) outside the {}x{} frame",
                    raw - clipped.len(),
                    width,
                    height
                );
            }
            DetectionOutcome::from_candidates(clipped)
        }
        Err(e) => {
            warn!("face detection failed, treating as no face: {:#}", e);
            DetectionOutcome::NoFace
        }
    }
}

/// Scripted detector that replays canned responses, one per call.
///
/// Once the script runs out every further call reports no faces.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: Mutex<VecDeque<ScriptedResponse>>,
    seen: Mutex<Vec<(u32, u32)>>,
}

#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Faces(Vec<FaceCandidate>),
    Fail(String),
}

impl ScriptedDetector {
    pub fn new(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Dimensions of every image this detector has been asked about, in order.
    pub fn seen_dimensions(&self) -> Vec<(u32, u32)> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<FaceCandidate>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(image.dimensions());
        }
        let next = self
            .script
            .lock()
            .map_err(|_| anyhow::anyhow!("scripted detector lock poisoned"))?
            .pop_front();
        match next {
            Some(ScriptedResponse::Faces(faces)) => Ok(faces),
            Some(ScriptedResponse::Fail(msg)) => Err(anyhow::anyhow!(msg)),
            None => Ok(Vec::new()),
        }
    }
}
