//! Saliency-based automatic cropping.
//!
//! Builds a per-pixel saliency map from three cues (edge detail, skin tone and
//! colour saturation), then slides candidate windows of the requested aspect
//! ratio over it and ranks them. Nothing here knows what a face is; skin tone
//! is only a hint.

use image::imageops::FilterType;
use image::RgbImage;

use crate::crop::CropRegion;
use crate::error::StageFailure;

/// Saliency is computed on a copy whose longest side is at most this.
const ANALYSIS_MAX_SIDE: u32 = 256;

/// Candidate window sizes, relative to the largest window that fits.
const SCALES: [f64; 4] = [1.0, 0.9, 0.8, 0.7];

/// Windows move by 1/8 of their shorter side.
const STEP_DIVISOR: u32 = 8;

/// Only every Nth pixel (per axis) contributes to a window's score.
const SCORE_SAMPLE: u32 = 2;

const SKIN_COLOR: [f64; 3] = [0.78, 0.57, 0.44];
const SKIN_THRESHOLD: f64 = 0.8;
const SKIN_LIGHTNESS: (f64, f64) = (0.2, 1.0);
const SKIN_BIAS: f64 = 0.01;
const SKIN_WEIGHT: f64 = 1.8;

const SATURATION_THRESHOLD: f64 = 0.4;
const SATURATION_LIGHTNESS: (f64, f64) = (0.05, 0.9);
const SATURATION_BIAS: f64 = 0.2;
const SATURATION_WEIGHT: f64 = 0.1;

const DETAIL_WEIGHT: f64 = 0.2;

const EDGE_RADIUS: f64 = 0.4;
const EDGE_WEIGHT: f64 = -20.0;
const OUTSIDE_IMPORTANCE: f64 = -0.5;

/// Extra weight for pixels near a window's rule-of-thirds lines.
const THIRDS_WEIGHT: f64 = 1.2;

/// A candidate crop in source-image pixels with its saliency score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCrop {
    /// Window in source pixels.
    pub region: CropRegion,
    /// Area-normalized saliency; only meaningful relative to other candidates.
    pub score: f64,
}

struct SaliencyMap {
    width: u32,
    height: u32,
    detail: Vec<f64>,
    skin: Vec<f64>,
    saturation: Vec<f64>,
}

#[derive(Clone, Copy)]
struct Window {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Rank crops of aspect `crop_width / crop_height` over `image`, best first.
pub fn smart_crop(
    image: &RgbImage,
    crop_width: u32,
    crop_height: u32,
) -> Result<Vec<ScoredCrop>, StageFailure> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 || crop_width == 0 || crop_height == 0 {
        return Err(StageFailure::EmptyImage);
    }

    let analysis = downsample(image);
    let map = saliency_map(&analysis);
    let aspect = crop_width as f64 / crop_height as f64;

    let mut scored: Vec<(Window, f64)> = candidate_windows(map.width, map.height, aspect)
        .into_iter()
        .map(|w| (w, score_window(&map, w)))
        .collect();

    if scored.is_empty() {
        return Err(StageFailure::NoCandidate);
    }

    // Highest score first; ties go to the window closest to the image centre.
    let (cx, cy) = (map.width as f64 / 2.0, map.height as f64 / 2.0);
    let centre_distance = |w: &Window| {
        let dx = w.x as f64 + w.width as f64 / 2.0 - cx;
        let dy = w.y as f64 + w.height as f64 / 2.0 - cy;
        dx * dx + dy * dy
    };
    scored.sort_by(|(wa, sa), (wb, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                centre_distance(wa)
                    .partial_cmp(&centre_distance(wb))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    let fx = src_w as f64 / map.width as f64;
    let fy = src_h as f64 / map.height as f64;

    Ok(scored
        .into_iter()
        .map(|(w, score)| ScoredCrop {
            region: to_source(w, fx, fy, src_w, src_h),
            score,
        })
        .collect())
}

fn downsample(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= ANALYSIS_MAX_SIDE {
        return image.clone();
    }
    let ratio = ANALYSIS_MAX_SIDE as f64 / longest as f64;
    let new_w = ((w as f64 * ratio).round() as u32).max(1);
    let new_h = ((h as f64 * ratio).round() as u32).max(1);
    image::imageops::resize(image, new_w, new_h, FilterType::Triangle)
}

fn luminance(rgb: &[u8; 3]) -> f64 {
    0.2126 * rgb[0] as f64 + 0.7152 * rgb[1] as f64 + 0.0722 * rgb[2] as f64
}

fn skin_score(rgb: &[u8; 3], lightness: f64) -> f64 {
    if !(SKIN_LIGHTNESS.0..=SKIN_LIGHTNESS.1).contains(&lightness) {
        return 0.0;
    }
    let [r, g, b] = rgb.map(|c| c as f64);
    let mag = (r * r + g * g + b * b).sqrt();
    if mag == 0.0 {
        return 0.0;
    }
    let rd = r / mag - SKIN_COLOR[0];
    let gd = g / mag - SKIN_COLOR[1];
    let bd = b / mag - SKIN_COLOR[2];
    let skinness = 1.0 - (rd * rd + gd * gd + bd * bd).sqrt();
    if skinness > SKIN_THRESHOLD {
        (skinness - SKIN_THRESHOLD) / (1.0 - SKIN_THRESHOLD)
    } else {
        0.0
    }
}

fn saturation_score(rgb: &[u8; 3], lightness: f64) -> f64 {
    if !(SATURATION_LIGHTNESS.0..=SATURATION_LIGHTNESS.1).contains(&lightness) {
        return 0.0;
    }
    let [r, g, b] = rgb.map(|c| c as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return 0.0;
    }
    let l = (max + min) / 2.0;
    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    if s > SATURATION_THRESHOLD {
        (s - SATURATION_THRESHOLD) / (1.0 - SATURATION_THRESHOLD)
    } else {
        0.0
    }
}

fn saliency_map(image: &RgbImage) -> SaliencyMap {
    let (w, h) = image.dimensions();
    let len = w as usize * h as usize;

    let lum: Vec<f64> = image.pixels().map(|p| luminance(&p.0)).collect();
    let at = |x: u32, y: u32| lum[y as usize * w as usize + x as usize];

    let mut detail = Vec::with_capacity(len);
    let mut skin = Vec::with_capacity(len);
    let mut saturation = Vec::with_capacity(len);

    for (x, y, pixel) in image.enumerate_pixels() {
        let centre = at(x, y);
        let left = at(x.saturating_sub(1), y);
        let right = at((x + 1).min(w - 1), y);
        let up = at(x, y.saturating_sub(1));
        let down = at(x, (y + 1).min(h - 1));
        // Only the bright side of an edge counts as detail.
        let laplacian = (4.0 * centre - left - right - up - down) / 255.0;
        detail.push(laplacian.clamp(0.0, 1.0));

        let lightness = centre / 255.0;
        skin.push(skin_score(&pixel.0, lightness));
        saturation.push(saturation_score(&pixel.0, lightness));
    }

    SaliencyMap {
        width: w,
        height: h,
        detail,
        skin,
        saturation,
    }
}

fn candidate_windows(width: u32, height: u32, aspect: f64) -> Vec<Window> {
    let (max_w, max_h) = if width as f64 / height as f64 > aspect {
        (height as f64 * aspect, height as f64)
    } else {
        (width as f64, width as f64 / aspect)
    };

    let mut windows = Vec::new();
    for scale in SCALES {
        let ww = ((max_w * scale).round() as u32).clamp(1, width);
        let wh = ((max_h * scale).round() as u32).clamp(1, height);
        let step = (ww.min(wh) / STEP_DIVISOR).max(1);

        let mut y = 0;
        while y + wh <= height {
            let mut x = 0;
            while x + ww <= width {
                windows.push(Window {
                    x,
                    y,
                    width: ww,
                    height: wh,
                });
                x += step;
            }
            y += step;
        }
    }
    windows
}

/// Peaks at 1.0 where `x` (a centre distance in 0.0–1.0) sits on a third line.
fn thirds(x: f64) -> f64 {
    let x = (((x - 1.0 / 3.0 + 1.0) % 2.0) * 0.5 - 0.5) * 16.0;
    (1.0 - x * x).max(0.0)
}

/// Weight of a pixel for a window: high in the middle and along the thirds,
/// strongly negative near the window's edge, mildly negative outside it.
fn importance(w: Window, x: u32, y: u32) -> f64 {
    let px = (x as f64 - w.x as f64) / w.width as f64;
    let py = (y as f64 - w.y as f64) / w.height as f64;
    if !(0.0..=1.0).contains(&px) || !(0.0..=1.0).contains(&py) {
        return OUTSIDE_IMPORTANCE;
    }
    let px = (0.5 - px).abs() * 2.0;
    let py = (0.5 - py).abs() * 2.0;
    let dx = (px - 1.0 + EDGE_RADIUS).max(0.0);
    let dy = (py - 1.0 + EDGE_RADIUS).max(0.0);
    let edge = (dx * dx + dy * dy) * EDGE_WEIGHT;
    let mut s = 1.41 - (px * px + py * py).sqrt();
    s += (s + edge + 0.5).max(0.0) * THIRDS_WEIGHT * (thirds(px) + thirds(py));
    s + edge
}

fn score_window(map: &SaliencyMap, w: Window) -> f64 {
    let (mut detail, mut skin, mut saturation) = (0.0, 0.0, 0.0);

    for y in (0..map.height).step_by(SCORE_SAMPLE as usize) {
        for x in (0..map.width).step_by(SCORE_SAMPLE as usize) {
            let i = y as usize * map.width as usize + x as usize;
            let weight = importance(w, x, y);
            let d = map.detail[i];
            detail += d * weight;
            skin += map.skin[i] * (d + SKIN_BIAS) * weight;
            saturation += map.saturation[i] * (d + SATURATION_BIAS) * weight;
        }
    }

    let area = w.width as f64 * w.height as f64;
    (detail * DETAIL_WEIGHT + skin * SKIN_WEIGHT + saturation * SATURATION_WEIGHT) / area
}

fn to_source(w: Window, fx: f64, fy: f64, src_w: u32, src_h: u32) -> CropRegion {
    let x = ((w.x as f64 * fx).round() as u32).min(src_w - 1);
    let y = ((w.y as f64 * fy).round() as u32).min(src_h - 1);
    let width = ((w.width as f64 * fx).round() as u32).clamp(1, src_w - x);
    let height = ((w.height as f64 * fy).round() as u32).clamp(1, src_h - y);
    CropRegion {
        x,
        y,
        width,
        height,
    }
}
