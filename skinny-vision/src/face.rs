use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::detector::{FaceCandidate, FaceDetector};
use crate::geometry::BoundingBox;
use crate::yunet::YuNetOutputs;

/// YuNet takes a fixed `[1, 3, 640, 640]` BGR input.
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// Detection in source-image pixels.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    pub landmarks: [f32; 10],
}

/// How the source image was placed on the square detector canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = target as f32 / width.max(height) as f32;
        let new_w = ((width as f32 * scale) as u32).min(target);
        let new_h = ((height as f32 * scale) as u32).min(target);
        Self {
            scale,
            offset_x: (target - new_w) / 2,
            offset_y: (target - new_h) / 2,
        }
    }

    /// Map a canvas-normalized x coordinate back to source pixels.
    fn source_x(&self, normalized: f32, target: u32) -> f32 {
        (normalized * target as f32 - self.offset_x as f32) / self.scale
    }

    fn source_y(&self, normalized: f32, target: u32) -> f32 {
        (normalized * target as f32 - self.offset_y as f32) / self.scale
    }
}

/// Pad `img` onto a black square canvas and lay it out as planar BGR `f32`.
pub fn letterbox_input(img: &DynamicImage, target: u32) -> Result<(Array4<f32>, Letterbox)> {
    let (width, height) = img.dimensions();
    let fit = Letterbox::fit(width, height, target);
    let new_w = ((width as f32 * fit.scale) as u32).clamp(1, target);
    let new_h = ((height as f32 * fit.scale) as u32).clamp(1, target);

    let resized = img.resize_exact(new_w, new_h, FilterType::Triangle);
    let mut canvas = DynamicImage::new_rgb8(target, target);
    image::imageops::overlay(
        &mut canvas,
        &resized,
        fit.offset_x as i64,
        fit.offset_y as i64,
    );
    let rgb = canvas.to_rgb8();

    let plane = (target * target) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    let (b, rest) = data.split_at_mut(plane);
    let (g, r) = rest.split_at_mut(plane);
    for (i, px) in rgb.as_raw().chunks_exact(3).enumerate() {
        r[i] = px[0] as f32;
        g[i] = px[1] as f32;
        b[i] = px[2] as f32;
    }

    let tensor = Array4::from_shape_vec((1, 3, target as usize, target as usize), data)?;
    Ok((tensor, fit))
}

/// Detect faces with a YuNet session.
pub fn detect_faces(
    session: &mut Session,
    img: &DynamicImage,
    score_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>> {
    let target = DETECTOR_INPUT_SIZE;
    let (input, fit) = letterbox_input(img, target)?;
    let input_tensor = Value::from_array(input)?;
    let outputs = session.run(ort::inputs![input_tensor])?;

    let mut tensors: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
    for (_name, output) in outputs.iter() {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        tensors.push((shape.iter().copied().collect(), data.to_vec()));
    }
    let refs: Vec<(&[i64], &[f32])> = tensors
        .iter()
        .map(|(s, d)| (s.as_slice(), d.as_slice()))
        .collect();

    let mut parsed = YuNetOutputs::parse(&refs, target as usize).context("parsing YuNet outputs")?;
    parsed.apply_sigmoid();
    let raw = parsed.decode(score_threshold, target as usize)?;

    let detections: Vec<Detection> = raw
        .into_iter()
        .map(|d| {
            let mut landmarks = [0.0f32; 10];
            for k in 0..5 {
                landmarks[k * 2] = fit.source_x(d.landmarks[k * 2], target);
                landmarks[k * 2 + 1] = fit.source_y(d.landmarks[k * 2 + 1], target);
            }
            Detection {
                bbox: [
                    fit.source_x(d.bbox[0], target),
                    fit.source_y(d.bbox[1], target),
                    d.bbox[2] * target as f32 / fit.scale,
                    d.bbox[3] * target as f32 / fit.scale,
                ],
                score: d.score,
                landmarks,
            }
        })
        .collect();

    if nms_threshold < 1.0 {
        Ok(nms(&detections, nms_threshold))
    } else {
        Ok(detections)
    }
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| compute_iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}

/// [`FaceDetector`] backed by a YuNet ONNX session.
///
/// The session needs exclusive access per run, so concurrent callers queue on a mutex.
pub struct YuNetDetector {
    session: Mutex<Session>,
    score_threshold: f32,
    nms_threshold: f32,
}

impl YuNetDetector {
    pub fn new(session: Session, score_threshold: f32, nms_threshold: f32) -> Self {
        Self {
            session: Mutex::new(session),
            score_threshold,
            nms_threshold,
        }
    }

    pub fn from_file(path: &Path, score_threshold: f32, nms_threshold: f32) -> Result<Self> {
        let session = crate::model::detector_session(path)?;
        Ok(Self::new(session, score_threshold, nms_threshold))
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceCandidate>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("detector session lock poisoned"))?;
        let detections = detect_faces(
            &mut session,
            image,
            self.score_threshold,
            self.nms_threshold,
        )
        .context("detecting faces")?;
        Ok(detections
            .iter()
            .map(|d| FaceCandidate::new(BoundingBox::from_xywh(d.bbox), d.score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(bbox: [f32; 4], score: f32) -> Detection {
        Detection {
            bbox,
            score,
            landmarks: [0.0; 10],
        }
    }

    #[test]
    fn test_iou() {
        let a = [10.0, 10.0, 20.0, 20.0];
        let b = [15.0, 15.0, 20.0, 20.0];
        let iou = compute_iou(&a, &b);
        assert!(iou > 0.0 && iou < 1.0);

        let c = [100.0, 100.0, 10.0, 10.0];
        assert_eq!(compute_iou(&a, &c), 0.0);
    }

    #[test]
    fn test_nms() {
        let detections = vec![
            det([10.0, 10.0, 20.0, 20.0], 0.8),
            det([12.0, 12.0, 20.0, 20.0], 0.9),
            det([100.0, 100.0, 20.0, 20.0], 0.85),
        ];
        let kept = nms(&detections, 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.85);
    }

    #[test]
    fn letterbox_centers_landscape_input() {
        let fit = Letterbox::fit(1280, 640, 640);
        assert_eq!(fit.scale, 0.5);
        assert_eq!((fit.offset_x, fit.offset_y), (0, 160));
        // canvas center maps back to source center
        assert!((fit.source_x(0.5, 640) - 640.0).abs() < 1e-3);
        assert!((fit.source_y(0.5, 640) - 320.0).abs() < 1e-3);
    }

    #[test]
    fn letterbox_input_is_planar_bgr() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            64,
            image::Rgb([10, 20, 30]),
        ));
        let (tensor, fit) = letterbox_input(&img, 64).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(fit.scale, 1.0);
        assert_eq!(tensor[[0, 0, 5, 5]], 30.0);
        assert_eq!(tensor[[0, 1, 5, 5]], 20.0);
        assert_eq!(tensor[[0, 2, 5, 5]], 10.0);
    }
}
