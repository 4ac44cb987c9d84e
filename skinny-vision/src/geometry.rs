//! Crop geometry for the two-stage centering pipeline.
//!
//! Every function here is pure: it maps image dimensions and a reference box to
//! an integer square [`Rect`] that lies entirely inside the source image.
//! Clamping keeps rectangles in bounds; nothing here ever fails on geometry.

use image::{DynamicImage, GenericImageView};

use crate::error::{Result, VisionError};

/// The first-stage crop spans this many face sizes around the face center.
pub const FIRST_STAGE_FACE_SCALE: f64 = 3.0;

/// Axis-aligned rectangle in image-pixel coordinates, always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn square(left: u32, top: u32, side: u32) -> Self {
        Self::new(left, top, side, side)
    }

    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.left as f64 + self.width as f64 / 2.0,
            self.top as f64 + self.height as f64 / 2.0,
        )
    }

    /// True when the rect is non-empty and lies inside `[0, w) x [0, h)`.
    pub fn fits_within(&self, image_w: u32, image_h: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= image_w as u64
            && self.bottom() <= image_h as u64
    }
}

/// Face bounding box as reported by a detector.
///
/// `left`/`top` are signed because detectors happily report boxes that start
/// outside the frame; call [`BoundingBox::clip_to`] before using one for geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a box from floating point `[x, y, w, h]` detector output.
    pub fn from_xywh(bbox: [f32; 4]) -> Self {
        let [x, y, w, h] = bbox;
        Self {
            left: x.round() as i32,
            top: y.round() as i32,
            width: w.round().max(0.0) as u32,
            height: h.round().max(0.0) as u32,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Center on the pixel grid, `floor((left + right) / 2)` on each axis.
    pub fn center(&self) -> (f64, f64) {
        let mid = |start: i32, len: u32| (2 * start as i64 + len as i64).div_euclid(2) as f64;
        (mid(self.left, self.width), mid(self.top, self.height))
    }

    /// Intersect with `[0, image_w) x [0, image_h)`; `None` if nothing is left.
    pub fn clip_to(&self, image_w: u32, image_h: u32) -> Option<BoundingBox> {
        let left = (self.left as i64).max(0);
        let top = (self.top as i64).max(0);
        let right = (self.left as i64 + self.width as i64).min(image_w as i64);
        let bottom = (self.top as i64 + self.height as i64).min(image_h as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(BoundingBox {
            left: left as i32,
            top: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }
}

/// Wide square crop around a coarse face detection.
///
/// The side is three face sizes, capped by the shorter image edge; the square
/// is centered on the face and then pushed back inside the image.
pub fn compute_first_stage_crop(image_w: u32, image_h: u32, face: &BoundingBox) -> Rect {
    let max_face_size = face.width.max(face.height) as f64;
    let crop_size = (image_w.min(image_h) as f64).min(max_face_size * FIRST_STAGE_FACE_SCALE);

    let (face_cx, face_cy) = face.center();
    let left = (face_cx - crop_size / 2.0).clamp(0.0, image_w as f64 - crop_size);
    let top = (face_cy - crop_size / 2.0).clamp(0.0, image_h as f64 - crop_size);

    let side = (crop_size as u32).max(1);
    Rect::square(
        (left as u32).min(image_w - side),
        (top as u32).min(image_h - side),
        side,
    )
}

/// Tight square crop that puts the face center at the crop center.
///
/// `side` is the edge of the square first-stage image; the result keeps 80% of it
/// (floored) and is clamped to stay inside that square.
pub fn compute_precise_center_crop(side: u32, face: &BoundingBox) -> Rect {
    let final_size = ((side as u64 * 4 / 5) as u32).max(1);
    let max_offset = (side - final_size) as i64;

    let (face_cx, face_cy) = face.center();
    let half = final_size as f64 / 2.0;
    let left = ((face_cx - half) as i64).clamp(0, max_offset);
    let top = ((face_cy - half) as i64).clamp(0, max_offset);

    Rect::square(left as u32, top as u32, final_size)
}

/// Largest centered square; used whenever no face is available.
pub fn crop_center_fallback(image_w: u32, image_h: u32) -> Rect {
    let size = image_w.min(image_h);
    Rect::square((image_w - size) / 2, (image_h - size) / 2, size)
}

/// Copy `rect` out of `image` as a new image of exactly `rect.width x rect.height`.
pub fn apply_crop(image: &DynamicImage, rect: Rect) -> Result<DynamicImage> {
    let (image_w, image_h) = image.dimensions();
    if !rect.fits_within(image_w, image_h) {
        return Err(VisionError::CropOutOfBounds {
            rect,
            image_w,
            image_h,
        });
    }
    Ok(image.crop_imm(rect.left, rect.top, rect.width, rect.height))
}
