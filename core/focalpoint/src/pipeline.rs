//! Ordered detection strategies and the orchestrator that runs them.
//!
//! ```text
//! FaceStrategy --Err--> SmartCropStrategy --Err--> default_result()
//!      |Ok                    |Ok                       |
//!      v                      v                         v
//!  face-detector           smart-crop               default (success = false)
//! ```

use std::sync::Arc;

use image::DynamicImage;

use crate::error::StageFailure;
use crate::face_detector::{FaceBounds, FaceDetector};
use crate::smart_crop::smart_crop;
use crate::{BoundingBox, DetectionResult, FocalPoint, Landmark, Method};

/// Fraction of the region height, from its top edge, used as the vertical anchor.
/// Lands near eye level on a face box.
const VERTICAL_BIAS: f64 = 0.3;

/// Minimum vertical focal coordinate (percent) for a detected face.
pub const FACE_MIN_Y: f64 = 15.0;

/// Minimum vertical focal coordinate (percent) for a smart-crop region.
/// Larger than the face minimum: a salient region is a weaker framing signal.
pub const SMART_CROP_MIN_Y: f64 = 25.0;

/// Fixed confidence reported by the smart-crop heuristic.
pub const SMART_CROP_CONFIDENCE: f64 = 0.7;

/// Largest crop requested from smart-crop, per side.
pub const SMART_CROP_MAX_SIDE: u32 = 400;

/// Focal point used when every strategy fails.
pub const DEFAULT_FOCAL_POINT: FocalPoint = FocalPoint { x: 50.0, y: 30.0 };

/// Confidence reported with [`DEFAULT_FOCAL_POINT`].
pub const DEFAULT_CONFIDENCE: f64 = 0.3;

/// Warning attached to the default result.
pub const DEFAULT_WARNING: &str = "Could not find a face in this photo. \
     Please upload a clear, front-facing headshot for best results.";

/// One stage of the fallback chain.
pub trait FocalStrategy: Send + Sync {
    /// Method tag reported when this strategy succeeds.
    fn method(&self) -> Method;

    /// Locate a focal point, or explain why this stage cannot.
    fn locate(&self, image: &DynamicImage) -> Result<DetectionResult, StageFailure>;
}

/// Face detection stage: anchors on the most confident face.
pub struct FaceStrategy {
    detector: Option<Arc<dyn FaceDetector>>,
}

impl FaceStrategy {
    /// With `None` the stage always reports itself unavailable.
    pub fn new(detector: Option<Arc<dyn FaceDetector>>) -> Self {
        Self { detector }
    }
}

impl FocalStrategy for FaceStrategy {
    fn method(&self) -> Method {
        Method::FaceDetector
    }

    fn locate(&self, image: &DynamicImage) -> Result<DetectionResult, StageFailure> {
        let detector = self
            .detector
            .as_ref()
            .ok_or_else(|| StageFailure::Unavailable("no face detector configured".into()))?;

        let (img_w, img_h) = (image.width(), image.height());
        if img_w == 0 || img_h == 0 {
            return Err(StageFailure::EmptyImage);
        }

        let gray = image.to_luma8();
        let faces = detector.detect(gray.as_raw(), img_w, img_h)?;

        // Use the highest-scoring face
        let face = faces
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or(StageFailure::NoFaceFound)?;

        Ok(face_result(face, img_w as f64, img_h as f64))
    }
}

fn face_result(face: &FaceBounds, img_w: f64, img_h: f64) -> DetectionResult {
    let bbox = BoundingBox {
        x: face.x / img_w,
        y: face.y / img_h,
        width: face.width / img_w,
        height: face.height / img_h,
    };

    let focal_point = FocalPoint {
        x: (bbox.x + bbox.width / 2.0) * 100.0,
        y: ((bbox.y + bbox.height * VERTICAL_BIAS) * 100.0).max(FACE_MIN_Y),
    };

    let landmarks = (!face.landmarks.is_empty()).then(|| {
        face.landmarks
            .iter()
            .map(|&(x, y)| Landmark {
                x: x / img_w,
                y: y / img_h,
            })
            .collect()
    });

    DetectionResult {
        success: true,
        confidence: face.confidence,
        focal_point,
        method: Method::FaceDetector,
        bounding_box: Some(bbox),
        landmarks,
        warning: None,
    }
}

/// Saliency stage: anchors on the top-ranked smart-crop window.
pub struct SmartCropStrategy;

impl FocalStrategy for SmartCropStrategy {
    fn method(&self) -> Method {
        Method::SmartCrop
    }

    fn locate(&self, image: &DynamicImage) -> Result<DetectionResult, StageFailure> {
        let (img_w, img_h) = (image.width(), image.height());
        if img_w == 0 || img_h == 0 {
            return Err(StageFailure::EmptyImage);
        }

        // Never ask for a crop larger than the image itself.
        let crop_w = SMART_CROP_MAX_SIDE.min(img_w);
        let crop_h = SMART_CROP_MAX_SIDE.min(img_h);

        let rgb = image.to_rgb8();
        let best = smart_crop(&rgb, crop_w, crop_h)?
            .into_iter()
            .next()
            .ok_or(StageFailure::NoCandidate)?;

        let (w, h) = (img_w as f64, img_h as f64);
        let region = best.region;
        let bbox = BoundingBox {
            x: region.x as f64 / w,
            y: region.y as f64 / h,
            width: region.width as f64 / w,
            height: region.height as f64 / h,
        };

        Ok(DetectionResult {
            success: true,
            confidence: SMART_CROP_CONFIDENCE,
            focal_point: FocalPoint {
                x: (bbox.x + bbox.width / 2.0) * 100.0,
                y: ((bbox.y + bbox.height * VERTICAL_BIAS) * 100.0).max(SMART_CROP_MIN_Y),
            },
            method: Method::SmartCrop,
            bounding_box: Some(bbox),
            landmarks: None,
            warning: None,
        })
    }
}

/// Terminal fallback. Always available.
pub fn default_result() -> DetectionResult {
    DetectionResult {
        success: false,
        confidence: DEFAULT_CONFIDENCE,
        focal_point: DEFAULT_FOCAL_POINT,
        method: Method::Default,
        bounding_box: None,
        landmarks: None,
        warning: Some(DEFAULT_WARNING.to_string()),
    }
}

/// Run `strategies` in order and return the first success, else the default.
pub(crate) fn run_strategies(
    strategies: &[Box<dyn FocalStrategy>],
    image: &DynamicImage,
) -> DetectionResult {
    for strategy in strategies {
        let method = strategy.method();
        match strategy.locate(image) {
            Ok(result) => {
                tracing::debug!(
                    %method,
                    confidence = result.confidence,
                    x = result.focal_point.x,
                    y = result.focal_point.y,
                    "focal point located"
                );
                return clamp_result(result);
            }
            Err(failure) => match method {
                Method::FaceDetector => {
                    tracing::debug!(%method, %failure, "stage failed, falling back")
                }
                _ => tracing::warn!(%method, %failure, "stage failed, falling back"),
            },
        }
    }
    tracing::debug!("using default focal point");
    default_result()
}

fn clamp_result(mut result: DetectionResult) -> DetectionResult {
    result.confidence = if result.confidence.is_nan() {
        0.0
    } else {
        result.confidence.clamp(0.0, 1.0)
    };
    result.focal_point = result.focal_point.clamped();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectorError;

    struct FixedFaces(Vec<FaceBounds>);

    impl FaceDetector for FixedFaces {
        fn detect(&self, _: &[u8], _: u32, _: u32) -> Result<Vec<FaceBounds>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl FocalStrategy for Failing {
        fn method(&self) -> Method {
            Method::SmartCrop
        }

        fn locate(&self, _: &DynamicImage) -> Result<DetectionResult, StageFailure> {
            Err(StageFailure::NoCandidate)
        }
    }

    fn face(x: f64, y: f64, size: f64, confidence: f64) -> FaceBounds {
        FaceBounds {
            x,
            y,
            width: size,
            height: size,
            confidence,
            landmarks: Vec::new(),
        }
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::new_rgb8(width, height)
    }

    #[test]
    fn face_focal_point_is_eye_level() {
        let strategy = FaceStrategy::new(Some(Arc::new(FixedFaces(vec![face(
            300.0, 200.0, 400.0, 0.92,
        )]))));
        let result = strategy.locate(&blank(1000, 1000)).unwrap();
        assert!((result.focal_point.x - 50.0).abs() < 1e-9);
        assert!((result.focal_point.y - 32.0).abs() < 1e-9);
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.method, Method::FaceDetector);
        let bbox = result.bounding_box.unwrap();
        assert!((bbox.x - 0.3).abs() < 1e-9 && (bbox.width - 0.4).abs() < 1e-9);
    }

    #[test]
    fn highest_confidence_face_wins() {
        let strategy = FaceStrategy::new(Some(Arc::new(FixedFaces(vec![
            face(0.0, 0.0, 100.0, 0.4),
            face(800.0, 500.0, 100.0, 0.9),
            face(400.0, 0.0, 100.0, 0.6),
        ]))));
        let result = strategy.locate(&blank(1000, 1000)).unwrap();
        assert!((result.focal_point.x - 85.0).abs() < 1e-9);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn face_near_top_is_clamped_to_minimum() {
        let strategy =
            FaceStrategy::new(Some(Arc::new(FixedFaces(vec![face(450.0, 0.0, 100.0, 0.8)]))));
        let result = strategy.locate(&blank(1000, 1000)).unwrap();
        assert_eq!(result.focal_point.y, FACE_MIN_Y);
    }

    #[test]
    fn landmarks_are_normalized() {
        let mut f = face(100.0, 100.0, 200.0, 0.9);
        f.landmarks = vec![(150.0, 160.0), (250.0, 160.0)];
        let strategy = FaceStrategy::new(Some(Arc::new(FixedFaces(vec![f]))));
        let result = strategy.locate(&blank(500, 400)).unwrap();
        let landmarks = result.landmarks.unwrap();
        assert_eq!(landmarks.len(), 2);
        assert!((landmarks[0].x - 0.3).abs() < 1e-9);
        assert!((landmarks[0].y - 0.4).abs() < 1e-9);
    }

    #[test]
    fn no_landmarks_reported_as_none() {
        let strategy =
            FaceStrategy::new(Some(Arc::new(FixedFaces(vec![face(10.0, 10.0, 50.0, 0.5)]))));
        assert!(strategy.locate(&blank(500, 500)).unwrap().landmarks.is_none());
    }

    #[test]
    fn missing_detector_is_unavailable() {
        let strategy = FaceStrategy::new(None);
        assert!(matches!(
            strategy.locate(&blank(500, 500)),
            Err(StageFailure::Unavailable(_))
        ));
    }

    #[test]
    fn no_faces_is_a_stage_failure() {
        let strategy = FaceStrategy::new(Some(Arc::new(FixedFaces(Vec::new()))));
        assert_eq!(
            strategy.locate(&blank(500, 500)).unwrap_err(),
            StageFailure::NoFaceFound
        );
    }

    #[test]
    fn smart_crop_result_shape() {
        let result = SmartCropStrategy.locate(&blank(800, 600)).unwrap();
        assert!(result.success);
        assert_eq!(result.method, Method::SmartCrop);
        assert_eq!(result.confidence, SMART_CROP_CONFIDENCE);
        assert!(result.focal_point.y >= SMART_CROP_MIN_Y);
        assert!(result.bounding_box.is_some());
        assert!(result.landmarks.is_none());
    }

    #[test]
    fn smart_crop_clamps_vertical_minimum() {
        // Saturated block at the very top of a tall frame pulls the window up
        // until its eye-level anchor sits above the minimum.
        let mut img = image::RgbImage::from_pixel(400, 1600, image::Rgb([120, 120, 120]));
        for y in 40..240 {
            for x in 100..300 {
                img.put_pixel(x, y, image::Rgb([230, 20, 20]));
            }
        }
        let result = SmartCropStrategy
            .locate(&DynamicImage::ImageRgb8(img))
            .unwrap();

        let bbox = result.bounding_box.unwrap();
        let unclamped = (bbox.y + bbox.height * VERTICAL_BIAS) * 100.0;
        assert!(unclamped < SMART_CROP_MIN_Y, "{bbox:?}");
        assert_eq!(result.focal_point.y, SMART_CROP_MIN_Y);
    }

    #[test]
    fn empty_image_fails_both_stages() {
        let face = FaceStrategy::new(Some(Arc::new(FixedFaces(vec![face(0.0, 0.0, 1.0, 1.0)]))));
        assert_eq!(face.locate(&blank(0, 0)).unwrap_err(), StageFailure::EmptyImage);
        assert_eq!(
            SmartCropStrategy.locate(&blank(0, 0)).unwrap_err(),
            StageFailure::EmptyImage
        );
    }

    #[test]
    fn orchestrator_falls_through_to_default() {
        let strategies: Vec<Box<dyn FocalStrategy>> =
            vec![Box::new(FaceStrategy::new(None)), Box::new(Failing)];
        let result = run_strategies(&strategies, &blank(500, 500));
        assert_eq!(result, default_result());
        assert!(!result.success);
        assert_eq!(result.focal_point, DEFAULT_FOCAL_POINT);
        assert!(result.warning.as_deref().is_some_and(|w| !w.is_empty()));
    }

    #[test]
    fn orchestrator_uses_first_success() {
        let strategies: Vec<Box<dyn FocalStrategy>> = vec![
            Box::new(FaceStrategy::new(None)),
            Box::new(SmartCropStrategy),
            Box::new(Failing),
        ];
        let result = run_strategies(&strategies, &blank(500, 500));
        assert_eq!(result.method, Method::SmartCrop);
    }

    #[test]
    fn orchestrator_clamps_out_of_range_detector_scores() {
        let strategies: Vec<Box<dyn FocalStrategy>> = vec![Box::new(FaceStrategy::new(Some(
            Arc::new(FixedFaces(vec![face(900.0, 900.0, 300.0, 7.5)])),
        )))];
        let result = run_strategies(&strategies, &blank(1000, 1000));
        assert_eq!(result.confidence, 1.0);
        assert!(result.focal_point.x <= 100.0 && result.focal_point.y <= 100.0);
    }
}
