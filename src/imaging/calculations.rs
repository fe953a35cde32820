//! Pure calculation functions for version dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Output geometry of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSize {
    pub width: u32,
    pub height: u32,
    /// Fill the box and center-crop rather than resize.
    pub crop: bool,
}

/// Calculate the output geometry for a preset applied to a source.
///
/// - Only `width` or only `height`: scale proportionally to that edge.
/// - Both, no crop: fit inside the box, preserving aspect ratio.
/// - Both, crop: fill the box exactly, center-cropping the overflow.
///
/// Without `upscale`, a source is never enlarged: non-crop presets keep the
/// original size, crop presets shrink the box to fit inside the source.
///
/// # Examples
/// ```
/// # use media_versions::imaging::calculate_version_dimensions;
/// // 1200x800 at width 300 → 300x200
/// let size = calculate_version_dimensions((1200, 800), (Some(300), None), false, false);
/// assert_eq!((size.width, size.height), (300, 200));
///
/// // 1200x800 cropped to 60x60
/// let size = calculate_version_dimensions((1200, 800), (Some(60), Some(60)), true, false);
/// assert_eq!((size.width, size.height, size.crop), (60, 60, true));
/// ```
pub fn calculate_version_dimensions(
    original: (u32, u32),
    target: (Option<u32>, Option<u32>),
    crop: bool,
    upscale: bool,
) -> VersionSize {
    let (src_w, src_h) = original;
    let keep = VersionSize {
        width: src_w,
        height: src_h,
        crop: false,
    };
    if src_w == 0 || src_h == 0 {
        return keep;
    }

    if crop && let (Some(w), Some(h)) = target {
        let (w, h) = if upscale {
            (w, h)
        } else {
            (w.min(src_w), h.min(src_h))
        };
        return VersionSize {
            width: w,
            height: h,
            crop: true,
        };
    }

    let ratio_w = target.0.map(|w| w as f64 / src_w as f64);
    let ratio_h = target.1.map(|h| h as f64 / src_h as f64);
    let ratio = match (ratio_w, ratio_h) {
        (Some(rw), Some(rh)) => rw.min(rh),
        (Some(r), None) | (None, Some(r)) => r,
        (None, None) => return keep,
    };

    if ratio >= 1.0 && !upscale {
        return keep;
    }

    VersionSize {
        width: ((src_w as f64 * ratio).round() as u32).max(1),
        height: ((src_h as f64 * ratio).round() as u32).max(1),
        crop: false,
    }
}
