mod backend;
mod backends;
mod nms;
mod result;
pub mod yolo;

pub use backend::LeafDetector;
pub use backends::StubDetector;
pub use nms::nms;
pub use result::{BoundingBox, Detection};

#[cfg(feature = "backend-tract")]
pub use backends::TractDetector;
