//! YuNet output decoding.
//!
//! YuNet is anchor-free. For every stride (8, 16, 32) the network emits four
//! tensors over an `(S/stride)^2` grid:
//! - cls  `[1, N, 1]`  class score
//! - obj  `[1, N, 1]`  objectness
//! - bbox `[1, N, 4]`  `(dx, dy, dw, dh)` in stride units
//! - kps  `[1, N, 10]` five landmark offsets in stride units
//!
//! Tensors arrive grouped by kind: cls x3, obj x3, bbox x3, kps x3.
//! A cell at `(row, col)` decodes to center `((col + dx) * stride, (row + dy) * stride)`
//! and size `(dw * stride, dh * stride)`.

use anyhow::{bail, Result};
use ndarray::Array2;

pub const STRIDES: [usize; 3] = [8, 16, 32];

/// A decoded detection in coordinates normalized to the square network input.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// `[x, y, w, h]`, top-left corner form.
    pub bbox: [f32; 4],
    pub score: f32,
    pub landmarks: [f32; 10],
}

/// Per-stride score, box and landmark maps.
#[derive(Debug)]
pub struct YuNetOutputs {
    pub scores: Vec<Array2<f32>>,
    pub boxes: Vec<Array2<f32>>,
    pub landmarks: Vec<Array2<f32>>,
}

fn grid_cells(input_size: usize, stride: usize) -> usize {
    let side = input_size / stride;
    side * side
}

fn read_group(
    outputs: &[(&[i64], &[f32])],
    base: usize,
    width: usize,
    input_size: usize,
    kind: &str,
) -> Result<Vec<Array2<f32>>> {
    STRIDES
        .iter()
        .enumerate()
        .map(|(i, &stride)| {
            let index = base + i;
            let Some((shape, data)) = outputs.get(index) else {
                bail!("missing {} output at index {}", kind, index);
            };
            let cells = grid_cells(input_size, stride);
            if shape.len() != 3 || shape[0] != 1 || shape[2] != width as i64 {
                bail!(
                    "unexpected {} shape at index {}: {:?}, expected [1, {}, {}]",
                    kind,
                    index,
                    shape,
                    cells,
                    width
                );
            }
            if shape[1] as usize != cells {
                bail!(
                    "{} at index {} has {} cells, expected {} for stride {}",
                    kind,
                    index,
                    shape[1],
                    cells,
                    stride
                );
            }
            Ok(Array2::from_shape_vec((cells, width), data.to_vec())?)
        })
        .collect()
}

impl YuNetOutputs {
    /// Split the twelve raw output tensors into per-stride maps.
    ///
    /// The returned scores are `cls * obj`, before any activation.
    pub fn parse(outputs: &[(&[i64], &[f32])], input_size: usize) -> Result<Self> {
        let cls = read_group(outputs, 0, 1, input_size, "cls")?;
        let obj = read_group(outputs, 3, 1, input_size, "obj")?;
        let boxes = read_group(outputs, 6, 4, input_size, "bbox")?;
        let landmarks = read_group(outputs, 9, 10, input_size, "kps")?;

        let scores = cls.iter().zip(obj.iter()).map(|(c, o)| c * o).collect();
        Ok(Self {
            scores,
            boxes,
            landmarks,
        })
    }

    pub fn apply_sigmoid(&mut self) {
        for map in &mut self.scores {
            map.mapv_inplace(sigmoid);
        }
    }

    /// Decode every cell scoring at least `score_threshold`.
    pub fn decode(&self, score_threshold: f32, input_size: usize) -> Result<Vec<RawDetection>> {
        let size = input_size as f32;
        let mut detections = Vec::new();

        for (level, &stride) in STRIDES.iter().enumerate() {
            let (Some(scores), Some(boxes), Some(kps)) = (
                self.scores.get(level),
                self.boxes.get(level),
                self.landmarks.get(level),
            ) else {
                bail!("missing maps for stride {}", stride);
            };
            let side = input_size / stride;
            if scores.nrows() != side * side {
                bail!(
                    "stride {} expects a {}x{} grid, got {} cells",
                    stride,
                    side,
                    side,
                    scores.nrows()
                );
            }

            let step = stride as f32;
            for row in 0..side {
                for col in 0..side {
                    let idx = row * side + col;
                    let score = scores[[idx, 0]];
                    if score < score_threshold {
                        continue;
                    }

                    let cx = (col as f32 + boxes[[idx, 0]]) * step / size;
                    let cy = (row as f32 + boxes[[idx, 1]]) * step / size;
                    let w = boxes[[idx, 2]] * step / size;
                    let h = boxes[[idx, 3]] * step / size;

                    let mut landmarks = [0.0f32; 10];
                    for k in 0..5 {
                        landmarks[k * 2] = (col as f32 + kps[[idx, k * 2]]) * step / size;
                        landmarks[k * 2 + 1] = (row as f32 + kps[[idx, k * 2 + 1]]) * step / size;
                    }

                    detections.push(RawDetection {
                        bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                        score,
                        landmarks,
                    });
                }
            }
        }

        Ok(detections)
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
