use anyhow::Result;
use image::RgbImage;

use crate::classify::result::RawClassification;

/// Binary leaf classifier backend.
///
/// Receives one cropped detection at a time and answers healthy or diseased
/// with a confidence. Shared read-only across requests, like `LeafDetector`.
pub trait LeafClassifier: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Classify one cropped leaf region.
    fn classify(&self, crop: &RgbImage) -> Result<RawClassification>;

    /// Optional warm-up hook.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
