use thiserror::Error;

/// Input rejected before any detection runs.
#[derive(Debug, Error)]
pub enum FocalPointError {
    #[error("unsupported file type {0:?}: upload a JPEG, PNG or WebP image")]
    UnsupportedMimeType(String),

    #[error("file is {size} bytes, the maximum is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("image is {width}x{height} px, both sides must be at least {min} px")]
    ResolutionTooLow { width: u32, height: u32, min: u32 },

    #[error("failed to decode image: {0}")]
    DecodeError(String),
}

/// Error reported by a [`crate::FaceDetector`] backend.
#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    #[error("face detector unavailable: {0}")]
    Unavailable(String),

    #[error("face detection failed: {0}")]
    Failed(String),
}

/// Why a detection stage handed over to the next one.
///
/// Never returned to callers; the pipeline logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    #[error("stage unavailable: {0}")]
    Unavailable(String),

    #[error("no face found")]
    NoFaceFound,

    #[error("detector failed: {0}")]
    DetectorFailed(String),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("no crop candidate fits the image")]
    NoCandidate,
}

impl From<DetectorError> for StageFailure {
    fn from(e: DetectorError) -> Self {
        match e {
            DetectorError::Unavailable(msg) => StageFailure::Unavailable(msg),
            DetectorError::Failed(msg) => StageFailure::DetectorFailed(msg),
        }
    }
}
