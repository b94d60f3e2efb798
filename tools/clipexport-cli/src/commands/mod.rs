pub mod config;
pub mod export;
pub mod geometry;

use clipexport_media_model::AffineTransform;

/// Preferred transform for a source of `width` x `height` stored rotated by
/// `degrees` clockwise. The result maps the frame back into the positive
/// quadrant.
pub fn orientation_transform(
    degrees: u32,
    width: u32,
    height: u32,
) -> anyhow::Result<AffineTransform> {
    let (w, h) = (f64::from(width), f64::from(height));
    match degrees {
        0 => Ok(AffineTransform::IDENTITY),
        90 => Ok(AffineTransform::new(0.0, 1.0, -1.0, 0.0, h, 0.0)),
        180 => Ok(AffineTransform::new(-1.0, 0.0, 0.0, -1.0, w, h)),
        270 => Ok(AffineTransform::new(0.0, -1.0, 1.0, 0.0, 0.0, w)),
        other => anyhow::bail!("Unsupported rotation: {other}. Use: 0, 90, 180, 270"),
    }
}
