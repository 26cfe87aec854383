use crate::error::DetectorError;

/// Bounding box of a detected face within an image.
#[derive(Debug, Clone)]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score. Values outside 0.0–1.0 are clamped by the pipeline.
    pub confidence: f64,
    /// Facial landmark points (eyes, nose, mouth corners) in pixels, if the
    /// backend reports them.
    pub landmarks: Vec<(f64, f64)>,
}

/// Pluggable face detection backend.
///
/// Implement this trait to provide a custom face detector (ONNX, dlib, etc.)
/// and pass it to [`crate::FocalPointDetector::face_detector`].
///
/// Returning `Err` is not fatal: the detector falls through to smart-crop.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(&self, gray: &[u8], width: u32, height: u32)
        -> Result<Vec<FaceBounds>, DetectorError>;
}
