#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::LeafDetector;
use crate::detect::result::Detection;
use crate::detect::yolo::{decode_output, InputGeometry};
use crate::frame::{chw_tensor, Normalization};

/// Tract-based leaf detector for a YOLO-style ONNX export.
///
/// The model is loaded once from a local file. Inference stretches the image
/// to the square model input; boxes are mapped back per axis.
pub struct TractDetector {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractDetector {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| {
                format!("failed to load detector model from {}", model_path.display())
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set detector input fact")?
            .into_optimized()
            .context("failed to optimize detector model")?
            .into_runnable()
            .context("failed to build runnable detector model")?;

        Ok(Self {
            model,
            input_size,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        })
    }

    /// Override the default detector confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Override the default NMS IoU threshold.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    fn build_input(&self, image: &RgbImage) -> Result<Tensor> {
        let size = self.input_size as usize;
        let data = chw_tensor(image, self.input_size, Normalization::UnitRange);
        let input = tract_ndarray::Array4::from_shape_vec((1, 3, size, size), data)
            .context("detector input tensor shape mismatch")?;
        Ok(input.into_tensor())
    }
}

impl LeafDetector for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!("cannot run detector on an empty image"));
        }
        let input = self.build_input(image)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("detector inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("detector produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("detector output tensor was not f32")?;
        let shape = view.shape().to_vec();
        let flat: Vec<f32> = view.iter().copied().collect();

        decode_output(
            &flat,
            &shape,
            InputGeometry {
                model_size: self.input_size,
                image_width: image.width(),
                image_height: image.height(),
            },
            self.confidence_threshold,
            self.iou_threshold,
        )
    }

    fn warm_up(&self) -> Result<()> {
        let blank = RgbImage::new(self.input_size, self.input_size);
        self.detect(&blank).map(|_| ())
    }
}
