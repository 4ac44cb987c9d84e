use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use skinny_vision::model::DETECTOR_MODEL_FILE;
use skinny_vision::normalize::DEFAULT_JPEG_QUALITY;

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("SKINNY_CONFIG_PATH").unwrap_or("/usr/local/etc/skinny/config.toml"))
});

pub static MODEL_PREFIX: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("SKINNY_MODEL_PREFIX").unwrap_or("/usr/local/share/skinny"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YuNet ONNX model used for face detection.
    pub model_path: PathBuf,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    /// JPEG quality of the analysis upload.
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: MODEL_PREFIX.join(DETECTOR_MODEL_FILE),
            score_threshold: 0.6,
            nms_threshold: 0.3,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}
