pub mod api;
pub mod config;

// Re-export vision types for convenience
pub use skinny_vision::{
    detector, geometry, normalize, orientation, pipeline, CropStage, FaceDetector,
    OrientationHint, Pipeline, PipelineResult, Rotation, YuNetDetector,
};
