mod backend;
mod backends;
mod result;

pub use backend::LeafClassifier;
pub use backends::StubClassifier;
pub use result::{softmax, LeafLabel, RawClassification};

#[cfg(feature = "backend-tract")]
pub use backends::TractClassifier;
