use serde::Serialize;

use crate::FocalPoint;

/// Size-variant URLs for one uploaded image.
///
/// These are names only. Nothing here resizes anything; a resizing backend is
/// expected to serve (or generate) the files behind these URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeVariants {
    pub original: String,
    pub large: String,
    pub medium: String,
    pub small: String,
    pub large_webp: String,
    pub medium_webp: String,
    pub small_webp: String,
    pub focal_point: FocalPoint,
}

/// Split `url` into (path, extension without dot, query-or-fragment suffix).
fn split_url(url: &str) -> (&str, Option<&str>, &str) {
    let tail_at = url.find(['?', '#']).unwrap_or(url.len());
    let (path, tail) = url.split_at(tail_at);

    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = name_start + dot;
            (&path[..dot], Some(&path[dot + 1..]), tail)
        }
        _ => (path, None, tail),
    }
}

fn variant(stem: &str, size: &str, ext: Option<&str>, tail: &str) -> String {
    match ext {
        Some(ext) => format!("{stem}-{size}.{ext}{tail}"),
        None => format!("{stem}-{size}{tail}"),
    }
}

/// Derive large/medium/small URLs, plus WebP twins, for `url`.
///
/// `photos/jane.jpg?v=2` becomes `photos/jane-large.jpg?v=2`,
/// `photos/jane-large.webp?v=2` and so on. The focal point is carried along
/// for whoever does the actual cropping.
pub fn size_variants(url: &str, focal_point: FocalPoint) -> SizeVariants {
    let (stem, ext, tail) = split_url(url);
    let webp = Some("webp");

    SizeVariants {
        original: url.to_string(),
        large: variant(stem, "large", ext, tail),
        medium: variant(stem, "medium", ext, tail),
        small: variant(stem, "small", ext, tail),
        large_webp: variant(stem, "large", webp, tail),
        medium_webp: variant(stem, "medium", webp, tail),
        small_webp: variant(stem, "small", webp, tail),
        focal_point: focal_point.clamped(),
    }
}
