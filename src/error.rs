//! Error taxonomy of the leaf-health pipeline.
//!
//! Degenerate inputs (no leaf, unusable boxes, nothing confidently
//! classified) are outcomes, not errors. What remains here is either a
//! rejected upload or a model that failed to run.

/// Failure of a single `evaluate` call or of decoding its input.
#[derive(Debug)]
pub enum PipelineError {
    /// The upload could not be decoded into an image.
    MalformedImage(String),
    /// The detection backend failed.
    Detector {
        backend: &'static str,
        source: anyhow::Error,
    },
    /// The classification backend failed on one detection.
    Classifier {
        backend: &'static str,
        index: usize,
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::MalformedImage(_) => "MALFORMED_IMAGE",
            PipelineError::Detector { .. } => "DETECTOR_FAILED",
            PipelineError::Classifier { .. } => "CLASSIFIER_FAILED",
        }
    }

    /// HTTP status the transport layer answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            PipelineError::MalformedImage(_) => 400,
            PipelineError::Detector { .. } | PipelineError::Classifier { .. } => 500,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::MalformedImage(msg) => write!(f, "malformed image: {msg}"),
            PipelineError::Detector { backend, source } => {
                write!(f, "detector '{backend}' failed: {source:#}")
            }
            PipelineError::Classifier {
                backend,
                index,
                source,
            } => write!(
                f,
                "classifier '{backend}' failed on detection {index}: {source:#}"
            ),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::MalformedImage(_) => None,
            PipelineError::Detector { source, .. } | PipelineError::Classifier { source, .. } => {
                Some(&**source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn codes_and_statuses() {
        let malformed = PipelineError::MalformedImage("bad header".to_string());
        assert_eq!(malformed.code(), "MALFORMED_IMAGE");
        assert_eq!(malformed.http_status(), 400);
        assert_eq!(malformed.to_string(), "malformed image: bad header");

        let detector = PipelineError::Detector {
            backend: "tract",
            source: anyhow!("out of memory"),
        };
        assert_eq!(detector.code(), "DETECTOR_FAILED");
        assert_eq!(detector.http_status(), 500);
        assert!(detector.to_string().contains("out of memory"));

        let classifier = PipelineError::Classifier {
            backend: "stub",
            index: 3,
            source: anyhow!("bad crop"),
        };
        assert_eq!(classifier.code(), "CLASSIFIER_FAILED");
        assert!(classifier.to_string().contains("detection 3"));
    }
}
