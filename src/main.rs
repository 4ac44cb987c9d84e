use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use skinny::api::SkinAnalysisRequest;
use skinny::{config, normalize, orientation, OrientationHint, Pipeline, PipelineResult, YuNetDetector};

#[derive(Parser)]
#[command(name = "skinny")]
#[command(version, about = "Face-centered crops for skin analysis uploads")]
struct Cli {
    /// Config file (defaults to the installed config path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop a photo around its face and report how the crop was made
    Center {
        input: PathBuf,
        /// Where to write the final crop
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Clockwise rotation in degrees, overrides EXIF orientation
        #[arg(long, allow_hyphen_values = true)]
        rotation: Option<i32>,
    },
    /// Produce the data URI sent to the analysis server
    Prepare {
        input: PathBuf,
        /// JPEG quality (defaults to the configured quality)
        #[arg(short, long)]
        quality: Option<u8>,
        /// Print the whole request body instead of the bare data URI
        #[arg(long)]
        request: bool,
    },
    /// Compare payload sizes across JPEG qualities
    Qualities { input: PathBuf },
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Center {
            input,
            output,
            rotation,
        } => center(&cfg, &input, output.as_deref(), rotation),
        Commands::Prepare {
            input,
            quality,
            request,
        } => prepare(&cfg, &input, quality.unwrap_or(cfg.jpeg_quality), request),
        Commands::Qualities { input } => qualities(&cfg, &input),
        Commands::Config { write } => show_config(&cfg, cli.config.as_deref(), write),
    }
}

fn open_pipeline(cfg: &config::Config) -> Result<Pipeline<YuNetDetector>> {
    let detector = YuNetDetector::from_file(&cfg.model_path, cfg.score_threshold, cfg.nms_threshold)
        .context("Failed to initialize face detector")?;
    Ok(Pipeline::new(detector))
}

/// Decode `input` and run it through the two-stage crop.
fn crop_face(cfg: &config::Config, input: &Path, rotation: Option<i32>) -> Result<PipelineResult> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let (image, hint) = match rotation {
        Some(degrees) => {
            let image = image::load_from_memory(&bytes)
                .with_context(|| format!("decoding {}", input.display()))?;
            (image, OrientationHint::Degrees(degrees))
        }
        None => {
            let (image, applied) = orientation::decode_oriented(&bytes)
                .with_context(|| format!("decoding {}", input.display()))?;
            info!("EXIF orientation: {}°", applied.degrees());
            // already upright
            (image, OrientationHint::Unknown)
        }
    };

    let pipeline = open_pipeline(cfg)?;
    let result = pipeline.run_pipeline(image, hint)?;
    if result.face_detected {
        info!(
            "Face centered ({:?}), {} face(s) found",
            result.stage, result.face_count
        );
    } else {
        warn!("No face detected, using center crop");
    }
    Ok(result)
}

fn summary(result: &PipelineResult) -> serde_json::Value {
    let rect = result.final_rect;
    serde_json::json!({
        "face_detected": result.face_detected,
        "face_count": result.face_count,
        "confidence": result.confidence,
        "stage": format!("{:?}", result.stage),
        "face_box": result.face_box.map(|b| [b.left as i64, b.top as i64, b.width as i64, b.height as i64]),
        "final_rect": [rect.left, rect.top, rect.width, rect.height],
        "center_offset_px": result.center_offset_px,
        "output_size": [result.image.width(), result.image.height()],
    })
}

fn center(
    cfg: &config::Config,
    input: &Path,
    output: Option<&Path>,
    rotation: Option<i32>,
) -> Result<()> {
    let result = crop_face(cfg, input, rotation)?;

    if let Some(path) = output {
        result
            .image
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Crop written to {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&summary(&result))?);
    Ok(())
}

fn prepare(cfg: &config::Config, input: &Path, quality: u8, request: bool) -> Result<()> {
    let result = crop_face(cfg, input, None)?;
    let resized = normalize::normalize_for_model(&result.image);
    let payload = normalize::encode_for_transport(&resized, quality)?;
    info!("Payload: {} chars at quality {}", payload.len(), quality);

    if request {
        let body = SkinAnalysisRequest::new(payload);
        println!("{}", serde_json::to_string(&body)?);
    } else {
        println!("{payload}");
    }
    Ok(())
}

fn qualities(cfg: &config::Config, input: &Path) -> Result<()> {
    let result = crop_face(cfg, input, None)?;
    let probes = normalize::compare_qualities(&result.image, &normalize::QUALITY_SWEEP)?;

    println!("{:>7} {:>10} {:>10}", "quality", "jpeg", "payload");
    for probe in probes {
        println!(
            "{:>7} {:>10} {:>10}",
            probe.quality,
            probe.jpeg_bytes,
            probe.payload.len()
        );
    }
    Ok(())
}

fn show_config(cfg: &config::Config, path: Option<&Path>, write: bool) -> Result<()> {
    print!("{}", toml::to_string_pretty(cfg)?);
    if write {
        config::save_config(cfg, path).context("Failed to write config")?;
        let written: &Path = path.unwrap_or(&config::CONFIG_PATH);
        info!("Config written to {}", written.display());
    }
    Ok(())
}
