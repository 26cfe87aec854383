use focalpoint::{
    DetectionResult, DetectorOptions, FocalPoint, FocalPointDetector, FocalPointError,
    RustfaceDetector,
};
use wasm_bindgen::prelude::*;

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Convert a `FocalPointError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: FocalPointError) -> JsValue {
    let code = match &e {
        FocalPointError::UnsupportedMimeType(_) => "UNSUPPORTED_MIME_TYPE",
        FocalPointError::FileTooLarge { .. } => "FILE_TOO_LARGE",
        FocalPointError::ResolutionTooLow { .. } => "RESOLUTION_TOO_LOW",
        FocalPointError::DecodeError(_) => "DECODE_ERROR",
    };
    make_error(code, &e.to_string())
}

fn parse_options(options: JsValue) -> Result<DetectorOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(DetectorOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid options: {e}")))
    }
}

fn build_point_object(x: f64, y: f64) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"x".into(), &JsValue::from(x))?;
    js_sys::Reflect::set(&obj, &"y".into(), &JsValue::from(y))?;
    Ok(JsValue::from(obj))
}

/// Build a plain JS object from a `DetectionResult`.
fn build_result_object(result: &DetectionResult) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"success".into(), &JsValue::from(result.success))?;
    js_sys::Reflect::set(&obj, &"confidence".into(), &JsValue::from(result.confidence))?;
    js_sys::Reflect::set(
        &obj,
        &"focalPoint".into(),
        &build_point_object(result.focal_point.x, result.focal_point.y)?,
    )?;
    js_sys::Reflect::set(
        &obj,
        &"objectPosition".into(),
        &JsValue::from_str(&result.focal_point.css_position()),
    )?;
    js_sys::Reflect::set(&obj, &"method".into(), &JsValue::from_str(result.method.as_str()))?;

    let bbox = match result.bounding_box.as_ref() {
        Some(b) => {
            let bb_obj = js_sys::Object::new();
            js_sys::Reflect::set(&bb_obj, &"x".into(), &JsValue::from(b.x))?;
            js_sys::Reflect::set(&bb_obj, &"y".into(), &JsValue::from(b.y))?;
            js_sys::Reflect::set(&bb_obj, &"width".into(), &JsValue::from(b.width))?;
            js_sys::Reflect::set(&bb_obj, &"height".into(), &JsValue::from(b.height))?;
            JsValue::from(bb_obj)
        }
        None => JsValue::NULL,
    };
    js_sys::Reflect::set(&obj, &"boundingBox".into(), &bbox)?;

    let landmarks = match result.landmarks.as_ref() {
        Some(points) => {
            let arr = js_sys::Array::new();
            for p in points {
                arr.push(&build_point_object(p.x, p.y)?);
            }
            JsValue::from(arr)
        }
        None => JsValue::NULL,
    };
    js_sys::Reflect::set(&obj, &"landmarks".into(), &landmarks)?;

    let warning = match result.warning.as_deref() {
        Some(w) => JsValue::from_str(w),
        None => JsValue::NULL,
    };
    js_sys::Reflect::set(&obj, &"warning".into(), &warning)?;

    Ok(JsValue::from(obj))
}

/// Focal-point detector for uploaded photos.
///
/// Construct once per page and reuse it for every upload.
#[wasm_bindgen]
pub struct FocalPointService {
    inner: FocalPointDetector,
}

#[wasm_bindgen]
impl FocalPointService {
    /// @param options - Optional object with fields: maxFileSize, minDimension, smartCrop
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<FocalPointService, JsValue> {
        let opts = parse_options(options)?;
        Ok(Self {
            inner: FocalPointDetector::new().options(&opts),
        })
    }

    /// Like the constructor, but with a SeetaFace model for the face stage.
    ///
    /// The model is parsed on the first detection, not here. Bytes that do not
    /// hold a usable model leave the service on smart-crop for its lifetime.
    ///
    /// @param options - Same as the constructor
    /// @param model - Contents of `seeta_fd_frontal_v1.0.bin`
    #[wasm_bindgen(js_name = "withModel")]
    pub fn with_model(options: JsValue, model: Vec<u8>) -> Result<FocalPointService, JsValue> {
        let opts = parse_options(options)?;
        Ok(Self {
            inner: FocalPointDetector::new()
                .face_detector(Box::new(RustfaceDetector::from_bytes(model)))
                .options(&opts),
        })
    }

    /// Find the focal point of raw image bytes. Never throws: unreadable
    /// input yields the default result with a warning.
    #[wasm_bindgen(js_name = "detectFocalPoint")]
    pub fn detect_focal_point(&self, input: &[u8]) -> Result<JsValue, JsValue> {
        build_result_object(&self.inner.detect_focal_point_bytes(input))
    }

    /// Validate an upload, then find its focal point.
    ///
    /// Throws an `Error` whose `code` is one of `UNSUPPORTED_MIME_TYPE`,
    /// `FILE_TOO_LARGE`, `RESOLUTION_TOO_LOW` or `DECODE_ERROR`.
    ///
    /// @param input - Raw file bytes
    /// @param mimeType - The `type` of the selected `File`
    #[wasm_bindgen(js_name = "processImageFile")]
    pub fn process_image_file(&self, input: Vec<u8>, mime_type: String) -> Result<JsValue, JsValue> {
        let processed = self
            .inner
            .process_image_file(focalpoint::ImageInput::new(input, mime_type))
            .map_err(to_js_error)?;

        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &"detection".into(), &build_result_object(&processed.detection)?)?;
        js_sys::Reflect::set(&obj, &"width".into(), &JsValue::from(processed.width))?;
        js_sys::Reflect::set(&obj, &"height".into(), &JsValue::from(processed.height))?;
        js_sys::Reflect::set(
            &obj,
            &"originalSize".into(),
            &JsValue::from(processed.original_size as u32),
        )?;
        Ok(JsValue::from(obj))
    }
}

/// Size-variant URLs (large/medium/small plus WebP) for an image URL.
///
/// @param url - Original image URL
/// @param x - Focal point x, percent
/// @param y - Focal point y, percent
#[wasm_bindgen(js_name = "sizeVariants")]
pub fn size_variants(url: &str, x: f64, y: f64) -> Result<JsValue, JsValue> {
    let variants = focalpoint::size_variants(url, FocalPoint { x, y });
    let obj = js_sys::Object::new();
    for (key, value) in [
        ("original", &variants.original),
        ("large", &variants.large),
        ("medium", &variants.medium),
        ("small", &variants.small),
        ("largeWebp", &variants.large_webp),
        ("mediumWebp", &variants.medium_webp),
        ("smallWebp", &variants.small_webp),
    ] {
        js_sys::Reflect::set(&obj, &key.into(), &JsValue::from_str(value))?;
    }
    js_sys::Reflect::set(
        &obj,
        &"focalPoint".into(),
        &build_point_object(variants.focal_point.x, variants.focal_point.y)?,
    )?;
    Ok(JsValue::from(obj))
}
