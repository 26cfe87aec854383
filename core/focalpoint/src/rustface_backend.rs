use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::DetectorError;
use crate::face_detector::{FaceBounds, FaceDetector};

/// Environment variable read by [`RustfaceDetector::from_env`].
pub const MODEL_PATH_ENV: &str = "RUSTFACE_MODEL_PATH";

/// SeetaFace score threshold; also the midpoint of the confidence curve.
const SCORE_THRESH: f64 = 2.0;

/// Steepness of the logistic curve mapping raw scores into 0.0–1.0.
const SCORE_SCALE: f64 = 0.5;

enum ModelSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Missing(String),
}

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is loaded lazily on the first call to [`FaceDetector::detect`] and
/// kept for the life of the detector. A load failure is remembered too: every
/// later call reports [`DetectorError::Unavailable`] without retrying.
pub struct RustfaceDetector {
    source: ModelSource,
    model: OnceLock<Result<rustface::Model, String>>,
}

impl RustfaceDetector {
    /// Load the SeetaFace model from `path` on first use.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::with_source(ModelSource::Path(path.into()))
    }

    /// Use model bytes already in memory (e.g. `include_bytes!`).
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::with_source(ModelSource::Bytes(data))
    }

    /// Read the model path from `RUSTFACE_MODEL_PATH`.
    ///
    /// If the variable is unset the detector is still constructed, but reports
    /// itself unavailable.
    pub fn from_env() -> Self {
        match std::env::var_os(MODEL_PATH_ENV) {
            Some(path) => Self::from_path(path),
            None => Self::with_source(ModelSource::Missing(format!("{MODEL_PATH_ENV} is not set"))),
        }
    }

    fn with_source(source: ModelSource) -> Self {
        Self {
            source,
            model: OnceLock::new(),
        }
    }

    fn model(&self) -> Result<&rustface::Model, DetectorError> {
        self.model
            .get_or_init(|| {
                let loaded = match &self.source {
                    ModelSource::Path(path) => std::fs::File::open(path)
                        .and_then(rustface::read_model)
                        .map_err(|e| format!("{}: {e}", path.display())),
                    ModelSource::Bytes(data) => {
                        rustface::read_model(std::io::Cursor::new(data.as_slice()))
                            .map_err(|e| e.to_string())
                    }
                    ModelSource::Missing(reason) => Err(reason.clone()),
                };
                match &loaded {
                    Ok(_) => tracing::debug!("loaded SeetaFace model"),
                    Err(reason) => tracing::warn!(%reason, "SeetaFace model failed to load"),
                }
                loaded
            })
            .as_ref()
            .map_err(|reason| DetectorError::Unavailable(reason.clone()))
    }
}

/// Squash an unbounded SeetaFace score into 0.0–1.0.
fn normalize_score(score: f64) -> f64 {
    1.0 / (1.0 + (-(score - SCORE_THRESH) * SCORE_SCALE).exp())
}

impl FaceDetector for RustfaceDetector {
    fn detect(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceBounds>, DetectorError> {
        let expected = width as usize * height as usize;
        if gray.len() != expected {
            return Err(DetectorError::Failed(format!(
                "grayscale buffer is {} bytes, expected {expected}",
                gray.len()
            )));
        }

        let mut detector = rustface::create_detector_with_model(self.model()?.clone());
        detector.set_min_face_size(20);
        detector.set_score_thresh(SCORE_THRESH);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray, width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    x: bbox.x() as f64,
                    y: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: normalize_score(face.score()),
                    landmarks: Vec::new(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_at_threshold_is_one_half() {
        assert!((normalize_score(SCORE_THRESH) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn scores_are_monotonic_and_bounded() {
        let low = normalize_score(-50.0);
        let mid = normalize_score(5.0);
        let high = normalize_score(50.0);
        assert!(low >= 0.0 && low < mid && mid < high && high <= 1.0);
    }

    #[test]
    fn missing_model_is_unavailable_not_panic() {
        let detector = RustfaceDetector::from_path("/nonexistent/seeta_fd_frontal_v1.0.bin");
        let gray = vec![0u8; 16];
        let err = detector.detect(&gray, 4, 4).unwrap_err();
        assert!(matches!(err, DetectorError::Unavailable(_)));
        // Second call hits the memoized failure.
        let err = detector.detect(&gray, 4, 4).unwrap_err();
        assert!(matches!(err, DetectorError::Unavailable(_)));
    }

    #[test]
    fn empty_model_bytes_are_unavailable() {
        let detector = RustfaceDetector::from_bytes(Vec::new());
        let gray = vec![0u8; 16];
        assert!(matches!(
            detector.detect(&gray, 4, 4),
            Err(DetectorError::Unavailable(_))
        ));
    }

    #[test]
    fn mismatched_buffer_is_a_detector_failure() {
        let detector = RustfaceDetector::from_bytes(Vec::new());
        assert!(matches!(
            detector.detect(&[0u8; 3], 4, 4),
            Err(DetectorError::Failed(_))
        ));
    }
}
