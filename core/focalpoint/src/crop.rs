use crate::FocalPoint;

/// Crop region within the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left edge (pixels).
    pub x: u32,
    /// Top edge (pixels).
    pub y: u32,
    /// Width (pixels).
    pub width: u32,
    /// Height (pixels).
    pub height: u32,
}

/// Largest `aspect` (width / height) crop anchored on `focal`.
///
/// The crop is centred on the focal point and shifted back inside the image
/// where it would overflow. A non-positive or non-finite aspect returns the
/// whole image.
pub fn focal_crop(
    source_width: u32,
    source_height: u32,
    focal: FocalPoint,
    aspect: f64,
) -> CropRegion {
    if !aspect.is_finite() || aspect <= 0.0 || source_width == 0 || source_height == 0 {
        return CropRegion {
            x: 0,
            y: 0,
            width: source_width,
            height: source_height,
        };
    }

    let (crop_width, crop_height) = if (source_width as f64 / source_height as f64) > aspect {
        // Source is wider than the target: constrain by height
        let h = source_height;
        let w = ((h as f64 * aspect).round() as u32).clamp(1, source_width);
        (w, h)
    } else {
        // Source is taller than (or equal to) the target: constrain by width
        let w = source_width;
        let h = ((w as f64 / aspect).round() as u32).clamp(1, source_height);
        (w, h)
    };

    let focal_x = focal.x.clamp(0.0, 100.0) / 100.0 * source_width as f64;
    let focal_y = focal.y.clamp(0.0, 100.0) / 100.0 * source_height as f64;

    let x = (focal_x - crop_width as f64 / 2.0)
        .round()
        .max(0.0)
        .min(source_width.saturating_sub(crop_width) as f64) as u32;
    let y = (focal_y - crop_height as f64 / 2.0)
        .round()
        .max(0.0)
        .min(source_height.saturating_sub(crop_height) as f64) as u32;

    CropRegion {
        x,
        y,
        width: crop_width,
        height: crop_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> FocalPoint {
        FocalPoint { x, y }
    }

    #[test]
    fn square_crop_of_landscape_follows_focal_x() {
        // 1000x500 → 500x500, centred on x = 80% (800px) → x = 550, clamped to 500
        let crop = focal_crop(1000, 500, at(80.0, 30.0), 1.0);
        assert_eq!(crop.width, 500);
        assert_eq!(crop.height, 500);
        assert_eq!(crop.x, 500);
        assert_eq!(crop.y, 0);
    }

    #[test]
    fn portrait_crop_of_tall_source_follows_focal_y() {
        // 300x800 at 3:4 → 300x400; focal y = 30% (240px) → y = 40
        let crop = focal_crop(300, 800, at(50.0, 30.0), 3.0 / 4.0);
        assert_eq!(crop.width, 300);
        assert_eq!(crop.height, 400);
        assert_eq!(crop.x, 0);
        assert_eq!(crop.y, 40);
    }

    #[test]
    fn crop_is_clamped_at_top_left() {
        let crop = focal_crop(1000, 500, at(0.0, 0.0), 1.0);
        assert_eq!((crop.x, crop.y), (0, 0));
    }

    #[test]
    fn exact_aspect_needs_no_crop() {
        let crop = focal_crop(300, 400, at(10.0, 90.0), 3.0 / 4.0);
        assert_eq!(
            crop,
            CropRegion {
                x: 0,
                y: 0,
                width: 300,
                height: 400
            }
        );
    }

    #[test]
    fn invalid_aspect_returns_full_frame() {
        for aspect in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let crop = focal_crop(640, 480, at(50.0, 50.0), aspect);
            assert_eq!((crop.width, crop.height), (640, 480));
        }
    }

    #[test]
    fn out_of_range_focal_is_clamped() {
        let crop = focal_crop(1000, 500, at(250.0, -40.0), 1.0);
        assert_eq!((crop.x, crop.y), (500, 0));
    }
}
