//! Focal-point detection for uploaded headshots.
//!
//! Finds the point of an image that a responsive crop should keep in view,
//! as a percentage anchor suitable for CSS `object-position`. Detection runs a
//! face detector first, then a saliency smart-crop, and finally falls back to a
//! fixed upper-centre point, so it always produces an answer.
//!
//! # Example
//!
//! ```no_run
//! use focalpoint::{FocalPointDetector, ImageInput};
//!
//! let detector = FocalPointDetector::new();
//! let input = ImageInput::from_path("headshot.jpg").unwrap();
//! let processed = detector.process_image_file(input).unwrap();
//! println!("object-position: {}", processed.detection.focal_point.css_position());
//! ```
#![warn(missing_docs)]

mod crop;
mod error;
/// Face detection traits and data types.
pub mod face_detector;
/// Ordered detection strategies.
pub mod pipeline;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;
/// Saliency-based crop ranking.
pub mod smart_crop;
mod validate;
mod variants;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

/// Focal-anchored crop helper and its region type.
pub use crop::{focal_crop, CropRegion};
/// Error types.
pub use error::{DetectorError, FocalPointError, StageFailure};
/// Face detection trait and face bounding-box type.
pub use face_detector::{FaceBounds, FaceDetector};
use pipeline::{FaceStrategy, FocalStrategy, SmartCropStrategy};
#[cfg(feature = "rustface")]
/// Built-in detector that loads a SeetaFace model on first use.
pub use rustface_backend::RustfaceDetector;
/// Upload limits and their defaults.
pub use validate::{Limits, ACCEPTED_MIME_TYPES, MAX_FILE_SIZE, MIN_DIMENSION};
/// Size-variant URL naming.
pub use variants::{size_variants, SizeVariants};

/// An uploaded file: raw bytes plus the MIME type the client declared.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Declared MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
}

impl ImageInput {
    /// Wrap uploaded bytes with their declared MIME type.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read a file, declaring its MIME type from the extension the way a
    /// browser upload control would. The content is not sniffed.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes, mime_from_extension(path)))
    }

    /// Size of the upload in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// A point in percent of the image size (0–100 on each axis).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocalPoint {
    /// Horizontal position, percent from the left edge.
    pub x: f64,
    /// Vertical position, percent from the top edge.
    pub y: f64,
}

impl FocalPoint {
    /// CSS `object-position` value, e.g. `"50% 32%"`.
    pub fn css_position(&self) -> String {
        format!("{}% {}%", trim_percent(self.x), trim_percent(self.y))
    }

    /// This point with both coordinates forced into 0–100.
    pub fn clamped(self) -> Self {
        let clamp = |v: f64| if v.is_nan() { 50.0 } else { v.clamp(0.0, 100.0) };
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }
}

fn trim_percent(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Rectangle in normalized image coordinates (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width as a fraction of the image width.
    pub width: f64,
    /// Height as a fraction of the image height.
    pub height: f64,
}

/// Facial landmark in normalized image coordinates (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Landmark {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

/// Which stage produced a [`DetectionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// A face detector found a face.
    FaceDetector,
    /// The saliency heuristic picked a region.
    SmartCrop,
    /// Nothing worked; fixed upper-centre point.
    Default,
}

impl Method {
    /// Wire name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::FaceDetector => "face-detector",
            Method::SmartCrop => "smart-crop",
            Method::Default => "default",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of focal-point detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// `false` only for the default fallback.
    pub success: bool,
    /// Detector score or fixed heuristic confidence, 0.0–1.0.
    pub confidence: f64,
    /// Suggested crop anchor.
    pub focal_point: FocalPoint,
    /// Stage that produced this result.
    pub method: Method,
    /// Detected face or salient region, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Facial landmarks, when the face detector reports them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<Landmark>>,
    /// Advice for the uploader; set only on the default fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of [`FocalPointDetector::process_image_file`].
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Focal-point detection outcome.
    pub detection: DetectionResult,
    /// Decoded container format.
    pub format: ImageFormat,
    /// Width of the decoded image in pixels.
    pub width: u32,
    /// Height of the decoded image in pixels.
    pub height: u32,
    /// Size of the original input in bytes.
    pub original_size: usize,
}

/// Optional overrides, typically deserialized from a JSON/JS options object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorOptions {
    /// Maximum upload size in bytes.
    pub max_file_size: Option<usize>,
    /// Minimum width and height in pixels.
    pub min_dimension: Option<u32>,
    /// Enable or disable the smart-crop stage.
    pub smart_crop: Option<bool>,
}

/// Focal-point detection service.
///
/// Build one at startup and share it; detection takes `&self` and keeps no
/// per-call state. The only thing that changes after construction is a face
/// backend's lazily loaded model.
pub struct FocalPointDetector {
    face_detector: Option<Arc<dyn FaceDetector>>,
    smart_crop: bool,
    limits: Limits,
    /// Replaces the face → smart-crop chain when set.
    strategies: Option<Vec<Box<dyn FocalStrategy>>>,
}

impl FocalPointDetector {
    /// Create a detector with default limits.
    ///
    /// With the `rustface` feature the built-in backend is used, reading its
    /// model path from `RUSTFACE_MODEL_PATH` on first detection. Without it
    /// the face stage is skipped until [`Self::face_detector`] is called.
    pub fn new() -> Self {
        Self {
            face_detector: Self::default_face_detector(),
            smart_crop: true,
            limits: Limits::default(),
            strategies: None,
        }
    }

    #[cfg(feature = "rustface")]
    fn default_face_detector() -> Option<Arc<dyn FaceDetector>> {
        Some(Arc::new(RustfaceDetector::from_env()))
    }

    #[cfg(not(feature = "rustface"))]
    fn default_face_detector() -> Option<Arc<dyn FaceDetector>> {
        None
    }

    /// Provide a custom face detector implementation.
    ///
    /// ```no_run
    /// use focalpoint::{DetectorError, FaceBounds, FaceDetector, FocalPointDetector};
    ///
    /// struct MyDetector;
    /// impl FaceDetector for MyDetector {
    ///     fn detect(&self, gray: &[u8], width: u32, height: u32)
    ///         -> Result<Vec<FaceBounds>, DetectorError> {
    ///         // Your detection logic here
    ///         Ok(vec![])
    ///     }
    /// }
    ///
    /// let detector = FocalPointDetector::new().face_detector(Box::new(MyDetector));
    /// ```
    pub fn face_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.face_detector = Some(Arc::from(detector));
        self
    }

    /// Remove any face detector, so detection starts at smart-crop.
    pub fn without_face_detector(mut self) -> Self {
        self.face_detector = None;
        self
    }

    /// Enable or disable the smart-crop stage (default: enabled).
    pub fn smart_crop(mut self, enable: bool) -> Self {
        self.smart_crop = enable;
        self
    }

    /// Set the upload size ceiling in bytes (default: 5 MiB).
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.limits.max_file_size = bytes;
        self
    }

    /// Set the minimum accepted width and height (default: 400 px).
    pub fn min_dimension(mut self, pixels: u32) -> Self {
        self.limits.min_dimension = pixels;
        self
    }

    /// Apply every override present in `options`.
    pub fn options(mut self, options: &DetectorOptions) -> Self {
        if let Some(bytes) = options.max_file_size {
            self = self.max_file_size(bytes);
        }
        if let Some(pixels) = options.min_dimension {
            self = self.min_dimension(pixels);
        }
        if let Some(enable) = options.smart_crop {
            self = self.smart_crop(enable);
        }
        self
    }

    /// Replace the built-in face → smart-crop chain with `strategies`.
    /// The default fallback still runs last.
    pub fn strategies(mut self, strategies: Vec<Box<dyn FocalStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Current upload limits.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    fn builtin_chain(&self) -> Vec<Box<dyn FocalStrategy>> {
        let mut chain: Vec<Box<dyn FocalStrategy>> =
            vec![Box::new(FaceStrategy::new(self.face_detector.clone()))];
        if self.smart_crop {
            chain.push(Box::new(SmartCropStrategy));
        }
        chain
    }

    /// Find the focal point of a decoded image. Never fails.
    pub fn detect_focal_point(&self, image: &DynamicImage) -> DetectionResult {
        match &self.strategies {
            Some(custom) => pipeline::run_strategies(custom, image),
            None => pipeline::run_strategies(&self.builtin_chain(), image),
        }
    }

    /// Decode `bytes` and find the focal point. Undecodable input yields the
    /// default result rather than an error.
    pub fn detect_focal_point_bytes(&self, bytes: &[u8]) -> DetectionResult {
        match image::load_from_memory(bytes) {
            Ok(image) => self.detect_focal_point(&image),
            Err(e) => {
                tracing::warn!(error = %e, "could not decode image, using default focal point");
                pipeline::default_result()
            }
        }
    }

    /// Validate an upload, then find its focal point.
    ///
    /// Only validation failures are returned as errors: unsupported type,
    /// file too large, undecodable data, or resolution below the minimum.
    pub fn process_image_file(&self, input: ImageInput) -> Result<ProcessedImage, FocalPointError> {
        let image = validate::validate_input(&input, &self.limits).inspect_err(|e| {
            tracing::info!(
                mime_type = %input.mime_type,
                size = input.size(),
                error = %e,
                "rejected upload"
            )
        })?;
        let format = image::guess_format(&input.bytes)
            .map_err(|e| FocalPointError::DecodeError(e.to_string()))?;

        let detection = self.detect_focal_point(&image);

        Ok(ProcessedImage {
            detection,
            format,
            width: image.width(),
            height: image.height(),
            original_size: input.size(),
        })
    }
}

impl Default for FocalPointDetector {
    fn default() -> Self {
        Self::new()
    }
}
