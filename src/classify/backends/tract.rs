#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::classify::backend::LeafClassifier;
use crate::classify::result::RawClassification;
use crate::frame::{chw_tensor, Normalization};

/// Tract-based binary leaf classifier (EfficientNet-style ONNX export).
///
/// Crops are resized to the square model input and normalised with ImageNet
/// statistics. The model emits two logits; `healthy_index` says which one is
/// the healthy class.
pub struct TractClassifier {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    healthy_index: usize,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| {
                format!(
                    "failed to load classifier model from {}",
                    model_path.display()
                )
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set classifier input fact")?
            .into_optimized()
            .context("failed to optimize classifier model")?
            .into_runnable()
            .context("failed to build runnable classifier model")?;

        Ok(Self {
            model,
            input_size,
            healthy_index: 1,
        })
    }

    /// Override which logit position is the healthy class.
    pub fn with_healthy_index(mut self, index: usize) -> Self {
        self.healthy_index = index;
        self
    }
}

impl LeafClassifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn classify(&self, crop: &RgbImage) -> Result<RawClassification> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(anyhow!("cannot classify an empty crop"));
        }
        let size = self.input_size as usize;
        let data = chw_tensor(crop, self.input_size, Normalization::ImageNet);
        let input = tract_ndarray::Array4::from_shape_vec((1, 3, size, size), data)
            .context("classifier input tensor shape mismatch")?
            .into_tensor();
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("classifier inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("classifier produced no outputs"))?;
        let logits: Vec<f32> = output
            .to_array_view::<f32>()
            .context("classifier output tensor was not f32")?
            .iter()
            .copied()
            .collect();
        RawClassification::from_logits(&logits, self.healthy_index)
    }

    fn warm_up(&self) -> Result<()> {
        let blank = RgbImage::new(self.input_size, self.input_size);
        self.classify(&blank).map(|_| ())
    }
}
