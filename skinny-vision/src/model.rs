use std::path::Path;

use anyhow::{Context, Result};
#[cfg(any(feature = "openvino", feature = "cuda"))]
use ort::ep::{self, ExecutionProvider};
use ort::session::{
    builder::{GraphOptimizationLevel, SessionBuilder},
    Session,
};

/// File name of the YuNet release the detector is written against.
pub const DETECTOR_MODEL_FILE: &str = "face_detection_yunet_2023mar.onnx";

pub fn session_builder() -> Result<SessionBuilder> {
    #[cfg(any(feature = "openvino", feature = "cuda"))]
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    #[cfg(not(any(feature = "openvino", feature = "cuda")))]
    let builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

/// Load the face detector from an ONNX file on disk.
pub fn detector_session(path: &Path) -> Result<Session> {
    log::debug!("loading detector model from {}", path.display());
    session_builder()?
        .commit_from_file(path)
        .with_context(|| format!("load detector model {}", path.display()))
}
