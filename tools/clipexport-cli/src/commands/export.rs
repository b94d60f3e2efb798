//! Export a generated test asset through the synthetic backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clipexport_common::AppConfig;
use clipexport_export_engine::hook::copy_frame;
use clipexport_export_engine::synthetic::{SyntheticAsset, SyntheticBackend};
use clipexport_export_engine::{ExportConfig, ExportSession, ExportState, HookError};
use clipexport_media_model::{
    FrameBuffer, MediaTime, Size, TimeRange, VideoSettings, BYTES_PER_PIXEL, DEFAULT_TIMESCALE,
};

pub struct ExportArgs {
    pub output: Option<PathBuf>,
    pub duration: f64,
    pub start: f64,
    pub length: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub source_width: u32,
    pub source_height: u32,
    pub fps: f64,
    pub rotate: u32,
    pub audio: bool,
    pub video: bool,
    pub invert: bool,
}

pub async fn run(config: &AppConfig, args: ExportArgs) -> anyhow::Result<()> {
    let mut asset = SyntheticAsset::new(MediaTime::from_seconds(args.duration, DEFAULT_TIMESCALE));
    if args.video {
        let transform =
            super::orientation_transform(args.rotate, args.source_width, args.source_height)?;
        asset = asset
            .with_video(
                Size::new(f64::from(args.source_width), f64::from(args.source_height)),
                args.fps,
            )
            .with_video_transform(transform);
    }
    if args.audio {
        asset = asset.with_audio();
    }

    let mut export = ExportConfig::new(Arc::new(asset))
        .with_defaults(&config.export)
        .map_err(|e| anyhow::anyhow!("Invalid export defaults: {e}"))?;

    let output_path = args.output.unwrap_or_else(|| {
        config
            .output_dir
            .join(format!("export.{}", export.container.extension()))
    });
    export = export.with_output_target(&output_path);

    let start = MediaTime::from_seconds(args.start, DEFAULT_TIMESCALE);
    export = export.with_time_range(match args.length {
        Some(length) => TimeRange::new(start, MediaTime::from_seconds(length, DEFAULT_TIMESCALE)),
        None => TimeRange::from_start(start),
    });

    let width = args.width.unwrap_or(config.export.width);
    let height = args.height.unwrap_or(config.export.height);
    let video_settings = export
        .video_settings
        .clone()
        .unwrap_or_default()
        .with_size(width, height);
    export = export.with_video_settings(video_settings.clone());

    if args.invert {
        export = export.with_frame_hook(invert_frame);
    }

    println!("Exporting synthetic asset ({:.1}s)", args.duration);
    println!("  Output: {}", output_path.display());
    println!("  Container: {}", export.container.extension());
    print_video_line(&video_settings, args.video);
    println!("  Audio: {}", if args.audio { "yes" } else { "no" });

    let session = ExportSession::new(Arc::new(SyntheticBackend::default()));
    session.configure(export);

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let run = session.run();
    tokio::pin!(run);
    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            _ = ticker.tick() => {
                print!("\r  Progress: {:.1}%  ", session.progress() * 100.0);
            }
        }
    };

    match outcome.state {
        ExportState::Completed => {
            println!("\r  Progress: 100.0%  ");
            println!("Export complete: {}", output_path.display());
            Ok(())
        }
        state => {
            let reason = outcome
                .error
                .map(|e| format!("{e} (code {})", e.code()))
                .unwrap_or_else(|| "no error recorded".to_string());
            println!();
            tracing::error!(%state, %reason, "Export did not complete");
            Err(anyhow::anyhow!("Export {state}: {reason}"))
        }
    }
}

fn print_video_line(settings: &VideoSettings, enabled: bool) {
    match (enabled, settings.width, settings.height) {
        (true, Some(width), Some(height)) => {
            println!("  Video: {width}x{height} ({:?})", settings.codec)
        }
        (true, _, _) => println!("  Video: source size ({:?})", settings.codec),
        (false, _, _) => println!("  Video: no"),
    }
}

fn invert_frame(
    _session: &ExportSession,
    input: &FrameBuffer,
    _presentation_time: MediaTime,
    output: &mut FrameBuffer,
) -> Result<(), HookError> {
    copy_frame(input, output)?;
    for px in output.data.chunks_exact_mut(BYTES_PER_PIXEL) {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    }
    Ok(())
}
