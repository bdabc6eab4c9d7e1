//! Image normalization for formats browsers cannot display.
//!
//! The normalizer decodes the incoming image, applies its EXIF orientation,
//! and re-encodes it as baseline JPEG. Decoding and encoding are CPU-bound,
//! so the whole body runs on a blocking thread.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use exif::{In, Reader, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageReader};

use parlor_storage::{MediaTransform, TransformError};

const JPEG_QUALITY: u8 = 85;

/// Rewrites an upload into an oriented JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    quality: u8,
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        ImageNormalizer {
            quality: JPEG_QUALITY,
        }
    }
}

impl ImageNormalizer {
    pub fn new(quality: u8) -> Self {
        ImageNormalizer { quality }
    }
}

#[async_trait]
impl MediaTransform for ImageNormalizer {
    fn output_extension(&self) -> &'static str {
        "jpg"
    }

    async fn apply(&self, input: Bytes) -> Result<Bytes, TransformError> {
        let quality = self.quality;

        tokio::task::spawn_blocking(move || normalize_to_jpeg(&input, quality))
            .await
            .map_err(|e| TransformError::TaskFailed(e.to_string()))?
    }
}

fn normalize_to_jpeg(data: &[u8], quality: u8) -> Result<Bytes, TransformError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| TransformError::Decode(e.to_string()))?;

    let img = apply_exif_orientation(img, data);

    // JPEG carries no alpha channel
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| TransformError::Encode(e.to_string()))?;

    Ok(Bytes::from(out.into_inner()))
}

/// Apply EXIF orientation correction to an image
fn apply_exif_orientation(mut img: DynamicImage, data: &[u8]) -> DynamicImage {
    let orientation = read_exif_orientation(data);
    let (rotate, flip_h, flip_v) = orientation_transforms(orientation);

    if rotate.is_none() && !flip_h && !flip_v {
        return img;
    }

    tracing::debug!(
        orientation = orientation,
        rotate = ?rotate,
        flip_horizontal = flip_h,
        flip_vertical = flip_v,
        "Applying EXIF orientation"
    );

    // Apply rotation first
    if let Some(angle) = rotate {
        img = match angle {
            90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
            180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
            270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
            _ => img,
        };
    }

    // Then apply flips
    if flip_h {
        img = DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()));
    }
    if flip_v {
        img = DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()));
    }

    img
}

/// Read the EXIF orientation tag, defaulting to 1 (normal) when the image
/// carries no EXIF data at all.
fn read_exif_orientation(data: &[u8]) -> u8 {
    let mut cursor = Cursor::new(data);
    let exif = match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(|v| if (1..=8).contains(&v) { v as u8 } else { 1 })
        .unwrap_or(1)
}

fn orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),      // Normal
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(270), true, false),  // Mirror horizontal + Rotate 270 CW
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(90), true, false),   // Mirror horizontal + Rotate 90 CW
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),      // Invalid, treat as normal
    }
}
