//! Image input layer.
//!
//! - `LeafImage`: a decoded RGB upload plus the SHA-256 digest of its source
//!   bytes (logged per request, never the pixels).
//! - `decode_image`: the only way from untrusted bytes to a `LeafImage`.
//!   Anything the decoder rejects is a `MalformedImage` and never reaches the
//!   pipeline.
//! - `chw_tensor`: resize + normalise into the planar layout the ONNX models
//!   expect.

use image::imageops::{self, FilterType};
use image::RgbImage;
use sha2::{Digest, Sha256};

use crate::detect::BoundingBox;
use crate::error::PipelineError;

/// Hard cap on decoded image area (about 8K x 5K).
pub const MAX_IMAGE_PIXELS: u64 = 40_000_000;

/// A decoded image ready for inference.
#[derive(Clone, Debug)]
pub struct LeafImage {
    rgb: RgbImage,
    digest: [u8; 32],
}

impl LeafImage {
    /// Wrap an already decoded raster. The digest covers the raw pixels.
    pub fn from_rgb(rgb: RgbImage) -> Self {
        let digest: [u8; 32] = Sha256::digest(rgb.as_raw()).into();
        Self { rgb, digest }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Crop the region under `bbox`, rounded outwards to whole pixels.
    ///
    /// The box is clipped to the raster first; the crop is never smaller than
    /// 1x1 for a non-empty image.
    pub fn crop(&self, bbox: &BoundingBox) -> RgbImage {
        let (w, h) = self.rgb.dimensions();
        if w == 0 || h == 0 {
            return RgbImage::new(0, 0);
        }
        let clipped = bbox.clip_to(w, h);
        let x1 = (clipped.x1.floor() as u32).min(w - 1);
        let y1 = (clipped.y1.floor() as u32).min(h - 1);
        let x2 = (clipped.x2.ceil() as u32).clamp(x1 + 1, w);
        let y2 = (clipped.y2.ceil() as u32).clamp(y1 + 1, h);
        imageops::crop_imm(&self.rgb, x1, y1, x2 - x1, y2 - y1).to_image()
    }
}

/// Decode uploaded bytes (JPEG or PNG) into a `LeafImage`.
pub fn decode_image(bytes: &[u8]) -> Result<LeafImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::MalformedImage("empty upload".to_string()));
    }
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::MalformedImage(e.to_string()))?;
    let area = decoded.width() as u64 * decoded.height() as u64;
    if area == 0 {
        return Err(PipelineError::MalformedImage(
            "image has zero width or height".to_string(),
        ));
    }
    if area > MAX_IMAGE_PIXELS {
        return Err(PipelineError::MalformedImage(format!(
            "image {}x{} exceeds {} pixels",
            decoded.width(),
            decoded.height(),
            MAX_IMAGE_PIXELS
        )));
    }
    let digest: [u8; 32] = Sha256::digest(bytes).into();
    Ok(LeafImage {
        rgb: decoded.to_rgb8(),
        digest,
    })
}

/// Per-channel normalisation applied when building model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Normalization {
    /// `pixel / 255`.
    UnitRange,
    /// `(pixel / 255 - mean) / std` with ImageNet statistics.
    ImageNet,
}

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize `image` to `size` x `size` and lay it out as `[3, size, size]` f32.
pub fn chw_tensor(image: &RgbImage, size: u32, normalization: Normalization) -> Vec<f32> {
    let resized;
    let source = if image.dimensions() == (size, size) {
        image
    } else {
        resized = imageops::resize(image, size, size, FilterType::Triangle);
        &resized
    };

    let plane = (size as usize) * (size as usize);
    let mut tensor = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in source.enumerate_pixels() {
        let idx = y as usize * size as usize + x as usize;
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            tensor[channel * plane + idx] = match normalization {
                Normalization::UnitRange => value,
                Normalization::ImageNet => {
                    (value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
                }
            };
        }
    }
    tensor
}
