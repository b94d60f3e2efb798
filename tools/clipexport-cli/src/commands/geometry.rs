//! Show the aspect-fit geometry for a source.

use clipexport_export_engine::compute_render_geometry;
use clipexport_media_model::{AffineTransform, Size};
use serde::Serialize;

#[derive(Serialize)]
struct GeometryReport {
    source: Size,
    target: Size,
    rotation_degrees: f64,
    render_size: Size,
    transform: AffineTransform,
}

pub fn run(
    source_width: u32,
    source_height: u32,
    rotate: u32,
    width: u32,
    height: u32,
) -> anyhow::Result<()> {
    let natural = Size::new(f64::from(source_width), f64::from(source_height));
    let target = Size::new(f64::from(width), f64::from(height));
    let intrinsic = super::orientation_transform(rotate, source_width, source_height)?;

    let geometry = compute_render_geometry(natural, intrinsic, target);
    let report = GeometryReport {
        source: natural,
        target,
        rotation_degrees: intrinsic.rotation_angle_degrees(),
        render_size: geometry.render_size,
        transform: geometry.transform,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
