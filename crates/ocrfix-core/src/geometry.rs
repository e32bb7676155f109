//! Display (stage) space ↔ source-image space.
//!
//! The page image is drawn scaled to fit its container, never enlarged.
//! Pointer positions arrive in stage pixels; everything persisted is in
//! image pixels.

use kurbo::{Point, Rect, Size};

/// Stage dimensions and the image→stage scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSize {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl StageSize {
    pub fn identity(container: Size) -> Self {
        Self {
            width: container.width,
            height: container.height,
            scale: 1.0,
        }
    }
}

impl Default for StageSize {
    fn default() -> Self {
        Self::identity(Size::new(800.0, 600.0))
    }
}

/// Fit `image` into `container` without upscaling.
///
/// `scale = min(cw / iw, ch / ih, 1)`. With no usable image the stage is
/// the container itself at scale 1.
pub fn compute_stage_size(image: Option<Size>, container: Size) -> StageSize {
    let Some(image) = image.filter(|s| usable(s.width) && usable(s.height)) else {
        return StageSize::identity(container);
    };
    let fit = (container.width / image.width).min(container.height / image.height);
    let scale = if fit.is_finite() && fit > 0.0 { fit.min(1.0) } else { 1.0 };
    StageSize {
        width: image.width * scale,
        height: image.height * scale,
        scale,
    }
}

fn usable(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Guard against zero/negative/non-finite scales coming from the view.
fn safe_scale(scale: f64) -> f64 {
    if usable(scale) { scale } else { 1.0 }
}

/// Stage pointer position → image coordinates.
pub fn to_image_space(pointer: Point, scale: f64) -> Point {
    let s = safe_scale(scale);
    Point::new(pointer.x / s, pointer.y / s)
}

/// Image point → stage coordinates.
pub fn point_to_display_space(p: Point, scale: f64) -> Point {
    let s = safe_scale(scale);
    Point::new(p.x * s, p.y * s)
}

/// Image rect → stage rect.
pub fn to_display_space(rect: Rect, scale: f64) -> Rect {
    let s = safe_scale(scale);
    Rect::new(rect.x0 * s, rect.y0 * s, rect.x1 * s, rect.y1 * s)
}

/// Stage rect → image rect.
pub fn rect_to_image_space(rect: Rect, scale: f64) -> Rect {
    let s = safe_scale(scale);
    Rect::new(rect.x0 / s, rect.y0 / s, rect.x1 / s, rect.y1 / s)
}

/// Normalized rect spanning two corners dragged in any direction.
pub fn rect_from_corners(anchor: Point, current: Point) -> Rect {
    Rect::from_points(anchor, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_wide_image_to_container() {
        let stage = compute_stage_size(Some(Size::new(2000.0, 1000.0)), Size::new(1000.0, 800.0));
        assert_eq!(stage.scale, 0.5);
        assert_eq!((stage.width, stage.height), (1000.0, 500.0));
    }

    #[test]
    fn never_upscales() {
        let stage = compute_stage_size(Some(Size::new(400.0, 300.0)), Size::new(1600.0, 1200.0));
        assert_eq!(stage.scale, 1.0);
        assert_eq!((stage.width, stage.height), (400.0, 300.0));
    }

    #[test]
    fn missing_image_uses_container() {
        let container = Size::new(640.0, 480.0);
        assert_eq!(compute_stage_size(None, container), StageSize::identity(container));
        assert_eq!(
            compute_stage_size(Some(Size::new(0.0, 100.0)), container),
            StageSize::identity(container)
        );
    }

    #[test]
    fn pointer_roundtrip() {
        let p = to_image_space(Point::new(50.0, 25.0), 0.5);
        assert_eq!(p, Point::new(100.0, 50.0));
        assert_eq!(point_to_display_space(p, 0.5), Point::new(50.0, 25.0));
    }

    #[test]
    fn display_rect_scales_all_edges() {
        let r = to_display_space(Rect::new(10.0, 20.0, 110.0, 70.0), 0.5);
        assert_eq!(r, Rect::new(5.0, 10.0, 55.0, 35.0));
        assert_eq!(rect_to_image_space(r, 0.5), Rect::new(10.0, 20.0, 110.0, 70.0));
    }

    #[test]
    fn degenerate_scale_is_identity() {
        assert_eq!(to_image_space(Point::new(3.0, 4.0), 0.0), Point::new(3.0, 4.0));
        assert_eq!(to_image_space(Point::new(3.0, 4.0), f64::NAN), Point::new(3.0, 4.0));
    }

    #[test]
    fn corners_in_any_direction() {
        let r = rect_from_corners(Point::new(50.0, 50.0), Point::new(10.0, 80.0));
        assert_eq!(r, Rect::new(10.0, 50.0, 50.0, 80.0));
    }
}
