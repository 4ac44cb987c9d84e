//! Orientation correction ahead of face detection.
//!
//! Only the pure rotations are honoured (EXIF tags 1, 3, 6 and 8). Mirrored
//! orientations and anything unreadable fall back to no rotation.

use std::io::Cursor;

use image::{metadata::Orientation, DynamicImage, ImageDecoder, ImageReader};
use log::{debug, warn};

use crate::error::{Result, VisionError};

/// Clockwise rotation needed to bring stored pixels upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Accepts multiples of 90, including negative and > 360 values.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }

    /// EXIF orientation tag value to rotation: 1 -> 0, 3 -> 180, 6 -> 90, 8 -> 270.
    pub fn from_exif_tag(tag: u16) -> Self {
        match tag {
            3 => Rotation::Cw180,
            6 => Rotation::Cw90,
            8 => Rotation::Cw270,
            _ => Rotation::None,
        }
    }

    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

impl From<Orientation> for Rotation {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Rotate90 => Rotation::Cw90,
            Orientation::Rotate180 => Rotation::Cw180,
            Orientation::Rotate270 => Rotation::Cw270,
            _ => Rotation::None,
        }
    }
}

/// Where the caller's orientation information comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrientationHint {
    #[default]
    Unknown,
    ExifTag(u16),
    Degrees(i32),
}

impl OrientationHint {
    pub fn resolve(self) -> Rotation {
        match self {
            OrientationHint::Unknown => Rotation::None,
            OrientationHint::ExifTag(tag) => Rotation::from_exif_tag(tag),
            OrientationHint::Degrees(deg) => Rotation::from_degrees(deg).unwrap_or_else(|| {
                warn!("ignoring rotation of {} degrees, not a multiple of 90", deg);
                Rotation::None
            }),
        }
    }
}

/// Rotate `image` clockwise by `rotation`.
///
/// `Rotation::None` hands the input back untouched; otherwise the input is
/// consumed and a rotated copy is returned.
pub fn correct_orientation(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => image,
        Rotation::Cw90 => image.rotate90(),
        Rotation::Cw180 => image.rotate180(),
        Rotation::Cw270 => image.rotate270(),
    }
}

/// Read the rotation recorded in encoded image bytes. Unreadable metadata is 0°.
pub fn read_rotation(bytes: &[u8]) -> Rotation {
    let decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_decoder().ok());
    match decoder {
        Some(mut decoder) => match decoder.orientation() {
            Ok(orientation) => Rotation::from(orientation),
            Err(e) => {
                debug!("no readable orientation metadata: {}", e);
                Rotation::None
            }
        },
        None => Rotation::None,
    }
}

/// Decode `bytes` and rotate the result upright according to its EXIF tag.
pub fn decode_oriented(bytes: &[u8]) -> Result<(DynamicImage, Rotation)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VisionError::Decode(e.to_string()))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| VisionError::Decode(e.to_string()))?;

    let rotation = match decoder.orientation() {
        Ok(orientation) => Rotation::from(orientation),
        Err(e) => {
            debug!("orientation unreadable, assuming upright: {}", e);
            Rotation::None
        }
    };

    let image =
        DynamicImage::from_decoder(decoder).map_err(|e| VisionError::Decode(e.to_string()))?;
    if rotation != Rotation::None {
        debug!("applying {}° orientation correction", rotation.degrees());
    }
    Ok((correct_orientation(image, rotation), rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 40) as u8, (y * 40) as u8, ((x + y) * 10) as u8])
        }))
    }

    /// Splice a minimal big-endian EXIF APP1 segment carrying `tag` after the SOI marker.
    fn jpeg_with_orientation(img: &DynamicImage, tag: u16) -> Vec<u8> {
        let mut jpeg = Vec::new();
        img.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        app1.extend_from_slice(&[0x00, 0x01]);
        app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        app1.extend_from_slice(&tag.to_be_bytes());
        app1.extend_from_slice(&[0x00, 0x00]);
        app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn exif_tags_map_to_exact_quadrants() {
        assert_eq!(Rotation::from_exif_tag(1), Rotation::None);
        assert_eq!(Rotation::from_exif_tag(3), Rotation::Cw180);
        assert_eq!(Rotation::from_exif_tag(6), Rotation::Cw90);
        assert_eq!(Rotation::from_exif_tag(8), Rotation::Cw270);
        assert_eq!(Rotation::from_exif_tag(2), Rotation::None);
        assert_eq!(Rotation::from_exif_tag(0), Rotation::None);
    }

    #[test]
    fn degrees_accept_only_quadrants() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Cw270));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Cw90));
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(OrientationHint::Degrees(45).resolve(), Rotation::None);
        assert_eq!(OrientationHint::ExifTag(6).resolve(), Rotation::Cw90);
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = gradient(5, 3);
        let out = correct_orientation(img.clone(), Rotation::None);
        assert_eq!(out.as_bytes(), img.as_bytes());
        assert_eq!(out.dimensions(), (5, 3));
    }

    #[test]
    fn quarter_turn_swaps_dimensions_and_moves_pixels_clockwise() {
        let img = gradient(5, 3);
        let out = correct_orientation(img.clone(), Rotation::Cw90);
        assert_eq!(out.dimensions(), (3, 5));
        // top-left lands in the top-right corner
        assert_eq!(out.get_pixel(2, 0), img.get_pixel(0, 0));
    }

    #[test]
    fn half_turn_moves_top_left_to_bottom_right() {
        let img = gradient(5, 3);
        let out = correct_orientation(img.clone(), Rotation::Cw180);
        assert_eq!(out.dimensions(), (5, 3));
        assert_eq!(out.get_pixel(4, 2), img.get_pixel(0, 0));
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(4, 2));
    }

    #[test]
    fn three_quarter_turn_moves_top_left_to_bottom_left() {
        let img = gradient(5, 3);
        let out = correct_orientation(img.clone(), Rotation::Cw270);
        assert_eq!(out.dimensions(), (3, 5));
        assert_eq!(out.get_pixel(0, 4), img.get_pixel(0, 0));
        // top-right lands in the top-left corner
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(4, 0));
    }

    #[test]
    fn four_quarter_turns_round_trip() {
        let img = gradient(6, 4);
        let mut out = img.clone();
        for _ in 0..4 {
            out = correct_orientation(out, Rotation::Cw90);
        }
        assert_eq!(out.dimensions(), (6, 4));
        assert_eq!(out.as_bytes(), img.as_bytes());
    }

    #[test]
    fn png_without_metadata_is_upright() {
        let img = gradient(8, 4);
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        assert_eq!(read_rotation(&png), Rotation::None);
        let (decoded, rotation) = decode_oriented(&png).unwrap();
        assert_eq!(rotation, Rotation::None);
        assert_eq!(decoded.dimensions(), (8, 4));
    }

    #[test]
    fn garbage_bytes_read_as_upright() {
        assert_eq!(read_rotation(b"not an image"), Rotation::None);
        assert!(decode_oriented(b"not an image").is_err());
    }

    #[test]
    fn exif_rotation_is_applied_on_decode() {
        let img = gradient(16, 8);
        let jpeg = jpeg_with_orientation(&img, 6);
        assert_eq!(read_rotation(&jpeg), Rotation::Cw90);
        let (decoded, rotation) = decode_oriented(&jpeg).unwrap();
        assert_eq!(rotation, Rotation::Cw90);
        assert_eq!(decoded.dimensions(), (8, 16));
    }

    #[test]
    fn exif_tag_eight_rotates_counter_clockwise_on_decode() {
        let img = gradient(16, 8);
        let jpeg = jpeg_with_orientation(&img, 8);
        assert_eq!(read_rotation(&jpeg), Rotation::Cw270);
        let (decoded, rotation) = decode_oriented(&jpeg).unwrap();
        assert_eq!(rotation, Rotation::Cw270);
        assert_eq!(decoded.dimensions(), (8, 16));
    }
}
