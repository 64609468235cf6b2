use anyhow::Result;
use image::RgbImage;

use crate::detect::result::Detection;

/// Leaf detector backend.
///
/// A detector proposes candidate leaf regions for one decoded image. It is
/// loaded once at process start and shared across in-flight requests, so
/// `detect` takes `&self`; backends with mutable internals must serialize
/// access themselves.
///
/// Coordinates are in the image's native pixel space. An empty result is a
/// valid answer ("no leaf"), not an error. Errors are reserved for the model
/// failing to run.
pub trait LeafDetector: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Propose leaf regions in `image`.
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
