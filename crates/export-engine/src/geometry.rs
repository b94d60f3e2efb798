//! Default render geometry: aspect-fit a (possibly rotated) source into the
//! output frame.

use clipexport_media_model::{
    AffineTransform, CompositionInstruction, LayerInstruction, MediaTime, Size, TimeRange,
    TrackInfo, VideoComposition, VideoSettings,
};
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a transform is a quarter turn.
const QUARTER_TURN_EPSILON: f64 = 1e-6;

/// Render size plus the transform placing the source inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderGeometry {
    pub render_size: Size,
    pub transform: AffineTransform,
}

/// Compute the aspect-fit geometry for a source of `natural_size` displayed
/// with `intrinsic_transform`, targeting an output of `target_size`.
///
/// The render size is the natural size, swapped for quarter-turn sources.
/// The transform scales then centers the content so that, once the encoder
/// maps the render size onto the target size, the source sits inside the
/// target with letterbox or pillarbox bars.
pub fn compute_render_geometry(
    natural_size: Size,
    intrinsic_transform: AffineTransform,
    target_size: Size,
) -> RenderGeometry {
    let mut intrinsic = intrinsic_transform;
    intrinsic.ty = 0.0;

    let angle = intrinsic.rotation_angle_degrees();
    let render_size = if is_quarter_turn(angle) {
        natural_size.swapped()
    } else {
        natural_size
    };

    if !render_size.is_drawable() || !target_size.is_drawable() {
        return RenderGeometry {
            render_size,
            transform: intrinsic,
        };
    }

    let x_ratio = target_size.width / render_size.width;
    let y_ratio = target_size.height / render_size.height;
    let ratio = x_ratio.min(y_ratio);

    let post = render_size.scaled(ratio);
    let trans_x = (target_size.width - post.width) / 2.0;
    let trans_y = (target_size.height - post.height) / 2.0;

    let fit = AffineTransform::translation(trans_x / x_ratio, trans_y / y_ratio)
        .scaled(ratio / x_ratio, ratio / y_ratio);

    RenderGeometry {
        render_size,
        transform: intrinsic.concat(&fit),
    }
}

fn is_quarter_turn(angle_degrees: f64) -> bool {
    (angle_degrees.abs() - 90.0).abs() <= QUARTER_TURN_EPSILON
}

/// Build the pass-through composition used when the caller supplies none:
/// one instruction covering the whole asset with the aspect-fit transform.
pub fn build_default_composition(
    track: &TrackInfo,
    settings: &VideoSettings,
    asset_duration: MediaTime,
) -> VideoComposition {
    // The oriented size doubles as the target when no output size is set.
    let oriented = compute_render_geometry(
        track.natural_size,
        track.preferred_transform,
        track.natural_size,
    )
    .render_size;
    let target = match (settings.width, settings.height) {
        (Some(width), Some(height)) => Size::new(f64::from(width), f64::from(height)),
        _ => oriented,
    };
    let geometry = compute_render_geometry(track.natural_size, track.preferred_transform, target);

    let frame_rate = settings.effective_frame_rate(track.nominal_frame_rate);
    let frame_duration = MediaTime::new(1000, (frame_rate * 1000.0).round() as i32);

    VideoComposition {
        frame_duration,
        render_size: geometry.render_size,
        instructions: vec![CompositionInstruction {
            time_range: TimeRange::new(MediaTime::ZERO, asset_duration.max_zero()),
            layers: vec![LayerInstruction {
                track_id: track.id,
                transform: geometry.transform,
            }],
        }],
    }
}

#[cfg(test)]
mod tests {
    use clipexport_media_model::{Point, TRANSFORM_EPSILON};
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_same_size_is_identity() {
        let size = Size::new(1920.0, 1080.0);
        let geometry = compute_render_geometry(size, AffineTransform::IDENTITY, size);
        assert_eq!(geometry.render_size, size);
        assert!(geometry.transform.is_identity());
    }

    #[test]
    fn test_portrait_rotation_swaps_render_size() {
        let rotated = AffineTransform::new(0.0, 1.0, -1.0, 0.0, 1080.0, 0.0);
        let geometry = compute_render_geometry(
            Size::new(1080.0, 1920.0),
            rotated,
            Size::new(1280.0, 720.0),
        );
        assert_eq!(geometry.render_size, Size::new(1920.0, 1080.0));
        // Same aspect ratio after the swap: no letterboxing needed.
        assert!(geometry.transform.approx_eq(&rotated, 1e-9));
    }

    #[test]
    fn test_negative_quarter_turn_also_swaps() {
        let rotated = AffineTransform::new(0.0, -1.0, 1.0, 0.0, 0.0, 1920.0);
        let geometry = compute_render_geometry(
            Size::new(1080.0, 1920.0),
            rotated,
            Size::new(1920.0, 1080.0),
        );
        assert_eq!(geometry.render_size, Size::new(1920.0, 1080.0));
        // Vertical translation is dropped.
        assert_eq!(geometry.transform.ty, 0.0);
    }

    #[test]
    fn test_letterbox_into_square() {
        let geometry = compute_render_geometry(
            Size::new(1600.0, 900.0),
            AffineTransform::IDENTITY,
            Size::new(800.0, 800.0),
        );
        // x_ratio = 0.5 wins; content height 450 centered in 800.
        let x_ratio = 0.5;
        let y_ratio = 800.0 / 900.0;
        let top = geometry.transform.apply(Point::new(0.0, 0.0));
        assert!((top.x * x_ratio).abs() < 1e-9);
        assert!((top.y * y_ratio - 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_sizes_keep_intrinsic() {
        let geometry = compute_render_geometry(
            Size::ZERO,
            AffineTransform::rotation_degrees(180.0),
            Size::new(100.0, 100.0),
        );
        assert_eq!(geometry.render_size, Size::ZERO);
        assert!(geometry
            .transform
            .approx_eq(&AffineTransform::rotation_degrees(180.0), TRANSFORM_EPSILON));
    }

    #[test]
    fn test_default_composition_uses_track_and_settings() {
        let track = TrackInfo::video(7, Size::new(640.0, 480.0), 25.0);
        let settings = VideoSettings::default().with_size(640, 480);
        let composition = build_default_composition(&track, &settings, MediaTime::new(10, 1));

        assert_eq!(composition.render_size, Size::new(640.0, 480.0));
        assert!((composition.frame_rate() - 25.0).abs() < 1e-9);
        assert_eq!(composition.instructions.len(), 1);
        let instruction = &composition.instructions[0];
        assert_eq!(instruction.time_range.start, MediaTime::ZERO);
        assert_eq!(instruction.time_range.duration, Some(MediaTime::new(10, 1)));
        assert_eq!(instruction.layers[0].track_id, 7);
        assert!(instruction.layers[0].transform.is_identity());
        assert!(composition.validate().is_ok());
    }

    #[test]
    fn test_default_composition_without_target_uses_render_size() {
        let track = TrackInfo::video(1, Size::new(720.0, 1280.0), 0.0)
            .with_transform(AffineTransform::new(0.0, 1.0, -1.0, 0.0, 720.0, 0.0));
        let composition =
            build_default_composition(&track, &VideoSettings::default(), MediaTime::new(3, 1));
        assert_eq!(composition.render_size, Size::new(1280.0, 720.0));
        assert!((composition.frame_rate() - 30.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_fit_stays_inside_target(
            src_w in 16.0f64..4096.0,
            src_h in 16.0f64..4096.0,
            dst_w in 16.0f64..4096.0,
            dst_h in 16.0f64..4096.0,
        ) {
            let target = Size::new(dst_w, dst_h);
            let geometry = compute_render_geometry(
                Size::new(src_w, src_h),
                AffineTransform::IDENTITY,
                target,
            );
            let x_ratio = dst_w / geometry.render_size.width;
            let y_ratio = dst_h / geometry.render_size.height;
            let to_target = |p: Point| Point::new(p.x * x_ratio, p.y * y_ratio);

            let origin = to_target(geometry.transform.apply(Point::new(0.0, 0.0)));
            let corner = to_target(geometry.transform.apply(Point::new(src_w, src_h)));
            let tolerance = 1e-6 * dst_w.max(dst_h);

            prop_assert!(origin.x >= -tolerance && origin.y >= -tolerance);
            prop_assert!(corner.x <= dst_w + tolerance && corner.y <= dst_h + tolerance);
            // Centered: equal margins on both axes.
            prop_assert!((origin.x - (dst_w - corner.x)).abs() <= tolerance);
            prop_assert!((origin.y - (dst_h - corner.y)).abs() <= tolerance);
        }

        #[test]
        fn prop_geometry_is_deterministic(
            w in 1.0f64..4000.0,
            h in 1.0f64..4000.0,
            degrees in prop_oneof![Just(0.0), Just(90.0), Just(180.0), Just(-90.0)],
        ) {
            let intrinsic = AffineTransform::rotation_degrees(degrees);
            let a = compute_render_geometry(Size::new(w, h), intrinsic, Size::new(1280.0, 720.0));
            let b = compute_render_geometry(Size::new(w, h), intrinsic, Size::new(1280.0, 720.0));
            prop_assert_eq!(a, b);
        }
    }
}
