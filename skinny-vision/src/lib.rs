pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod face;
pub mod geometry;
pub mod model;
pub mod normalize;
pub mod orientation;
pub mod pipeline;
pub mod yunet;

// Re-export commonly used types
pub use detector::{DetectionOutcome, FaceCandidate, FaceDetector};
pub use error::VisionError;
pub use face::YuNetDetector;
pub use geometry::{BoundingBox, Rect};
pub use orientation::{OrientationHint, Rotation};
pub use pipeline::{CropStage, Pipeline, PipelineResult};
