//! How well a face is centered inside a crop.

use std::fmt;

use crate::geometry::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterAccuracy {
    VeryAccurate,
    Accurate,
    SlightlyOff,
    FarOff,
}

impl CenterAccuracy {
    /// Grade an offset relative to the image width: under 5%, 10%, 15%, or worse.
    pub fn grade(offset_px: f64, image_w: u32) -> Self {
        let width = image_w as f64;
        if offset_px < width * 0.05 {
            CenterAccuracy::VeryAccurate
        } else if offset_px < width * 0.10 {
            CenterAccuracy::Accurate
        } else if offset_px < width * 0.15 {
            CenterAccuracy::SlightlyOff
        } else {
            CenterAccuracy::FarOff
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CenterAccuracy::VeryAccurate => "very accurate",
            CenterAccuracy::Accurate => "accurate",
            CenterAccuracy::SlightlyOff => "slightly off",
            CenterAccuracy::FarOff => "far off",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacePosition {
    pub offset_px: f64,
    pub accuracy: CenterAccuracy,
}

impl fmt::Display for FacePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "centering accuracy: {} (offset {}px)",
            self.accuracy.label(),
            self.offset_px as i64
        )
    }
}

/// Euclidean distance between two points.
pub fn center_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Where `face` sits relative to the center of an `image_w` x `image_h` image.
pub fn analyze_face_position(image_w: u32, image_h: u32, face: &BoundingBox) -> FacePosition {
    let image_center = (image_w as f64 / 2.0, image_h as f64 / 2.0);
    let offset_px = center_distance(face.center(), image_center);
    FacePosition {
        offset_px,
        accuracy: CenterAccuracy::grade(offset_px, image_w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_face_is_very_accurate() {
        let pos = analyze_face_position(480, 480, &BoundingBox::new(190, 190, 100, 100));
        assert_eq!(pos.offset_px, 0.0);
        assert_eq!(pos.accuracy, CenterAccuracy::VeryAccurate);
        assert_eq!(pos.to_string(), "centering accuracy: very accurate (offset 0px)");
    }

    #[test]
    fn grades_follow_width_fractions() {
        assert_eq!(CenterAccuracy::grade(4.9, 100), CenterAccuracy::VeryAccurate);
        assert_eq!(CenterAccuracy::grade(5.0, 100), CenterAccuracy::Accurate);
        assert_eq!(CenterAccuracy::grade(12.0, 100), CenterAccuracy::SlightlyOff);
        assert_eq!(CenterAccuracy::grade(15.0, 100), CenterAccuracy::FarOff);
    }

    #[test]
    fn offset_is_euclidean() {
        // face center (330, 280) vs image center (300, 240): 3-4-5 triangle
        let pos = analyze_face_position(600, 480, &BoundingBox::new(280, 230, 100, 100));
        assert!((pos.offset_px - 50.0).abs() < 1e-9);
        assert_eq!(pos.accuracy, CenterAccuracy::Accurate);
    }
}
