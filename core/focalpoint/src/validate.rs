use image::DynamicImage;

use crate::error::FocalPointError;
use crate::ImageInput;

/// MIME types accepted by [`validate_input`].
pub const ACCEPTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Largest accepted upload: 5 MiB.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Smallest accepted width and height, in pixels.
pub const MIN_DIMENSION: u32 = 400;

/// Upload limits checked before detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum input size in bytes.
    pub max_file_size: usize,
    /// Minimum width and height in pixels.
    pub min_dimension: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            min_dimension: MIN_DIMENSION,
        }
    }
}

fn is_accepted_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    ACCEPTED_MIME_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(essence))
}

/// Check type, size, decodability and resolution, in that order.
///
/// Returns the decoded image so detection does not decode twice.
pub(crate) fn validate_input(
    input: &ImageInput,
    limits: &Limits,
) -> Result<DynamicImage, FocalPointError> {
    if !is_accepted_mime(&input.mime_type) {
        return Err(FocalPointError::UnsupportedMimeType(input.mime_type.clone()));
    }

    let size = input.size();
    if size > limits.max_file_size {
        return Err(FocalPointError::FileTooLarge {
            size,
            limit: limits.max_file_size,
        });
    }

    let image = image::load_from_memory(&input.bytes)
        .map_err(|e| FocalPointError::DecodeError(e.to_string()))?;

    let (width, height) = (image.width(), image.height());
    if width < limits.min_dimension || height < limits.min_dimension {
        return Err(FocalPointError::ResolutionTooLow {
            width,
            height,
            min: limits.min_dimension,
        });
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageEncoder;

    fn make_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 120, 150]));
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    #[test]
    fn mime_check_ignores_case_and_parameters() {
        assert!(is_accepted_mime("image/JPEG"));
        assert!(is_accepted_mime("image/png; charset=binary"));
        assert!(is_accepted_mime("image/jpg"));
        assert!(!is_accepted_mime("image/gif"));
        assert!(!is_accepted_mime("text/plain"));
        assert!(!is_accepted_mime(""));
    }

    #[test]
    fn accepts_valid_png() {
        let input = ImageInput::new(make_test_png(400, 500), "image/png");
        let image = validate_input(&input, &Limits::default()).unwrap();
        assert_eq!((image.width(), image.height()), (400, 500));
    }

    #[test]
    fn mime_is_checked_before_size() {
        let input = ImageInput::new(vec![0; MAX_FILE_SIZE + 1], "image/gif");
        assert!(matches!(
            validate_input(&input, &Limits::default()),
            Err(FocalPointError::UnsupportedMimeType(_))
        ));
    }

    #[test]
    fn size_is_checked_before_decode() {
        let input = ImageInput::new(vec![0; MAX_FILE_SIZE + 1], "image/jpeg");
        assert!(matches!(
            validate_input(&input, &Limits::default()),
            Err(FocalPointError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn exactly_at_size_limit_is_allowed_through() {
        let limits = Limits {
            max_file_size: 10,
            min_dimension: 1,
        };
        let input = ImageInput::new(vec![0; 10], "image/jpeg");
        // Passes the size gate, then fails decoding.
        assert!(matches!(
            validate_input(&input, &limits),
            Err(FocalPointError::DecodeError(_))
        ));
    }

    #[test]
    fn one_short_side_is_rejected() {
        let input = ImageInput::new(make_test_png(800, 399), "image/png");
        match validate_input(&input, &Limits::default()) {
            Err(FocalPointError::ResolutionTooLow { width, height, min }) => {
                assert_eq!((width, height, min), (800, 399, 400));
            }
            other => panic!("expected ResolutionTooLow, got {other:?}"),
        }
    }

    #[test]
    fn custom_limits_apply() {
        let limits = Limits {
            max_file_size: MAX_FILE_SIZE,
            min_dimension: 100,
        };
        let input = ImageInput::new(make_test_png(120, 120), "image/png");
        assert!(validate_input(&input, &limits).is_ok());
    }
}
