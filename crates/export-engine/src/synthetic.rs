//! In-process reference backend.
//!
//! The reader generates a test pattern (one solid colour per frame) and
//! silent audio; the writer stores a JSON-lines "container": a header line,
//! one line per appended sample and a trailer line on commit. Fault knobs
//! in [`SyntheticBehavior`] drive the failure paths in tests and the CLI.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clipexport_common::error::MediaError;
use clipexport_media_model::{
    AffineTransform, AudioChunk, AudioSettings, MediaAsset, MediaTime, Sample, SamplePayload,
    Size, TimeRange, TrackInfo, TrackKind, VideoComposition, VideoSettings,
};
use parking_lot::Mutex;
use serde::Serialize;

use crate::backend::{
    FinishCallback, FrameBufferPool, MediaBackend, ReaderStatus, ReadinessNotifier, SinkWriter,
    SourceReader, TrackInput, TrackOutput, WriterConfig, WriterStatus,
};
use crate::pool::{BoundedFramePool, DEFAULT_POOL_CAPACITY};

/// Error domain of failures injected by the synthetic backend.
pub const SYNTHETIC_ERROR_DOMAIN: &str = "clipexport.synthetic";

const VIDEO_TRACK_ID: u32 = 1;
const AUDIO_TRACK_ID: u32 = 2;

/// A generated asset with at most one video and one audio track.
#[derive(Debug, Clone)]
pub struct SyntheticAsset {
    duration: MediaTime,
    video: Option<TrackInfo>,
    audio: Option<TrackInfo>,
}

impl SyntheticAsset {
    /// An asset with no tracks.
    pub fn new(duration: MediaTime) -> Self {
        Self {
            duration,
            video: None,
            audio: None,
        }
    }

    pub fn with_video(mut self, natural_size: Size, frame_rate: f64) -> Self {
        self.video = Some(TrackInfo::video(VIDEO_TRACK_ID, natural_size, frame_rate));
        self
    }

    /// Orientation of the video track. No effect without one.
    pub fn with_video_transform(mut self, transform: AffineTransform) -> Self {
        self.video = self.video.map(|track| track.with_transform(transform));
        self
    }

    pub fn with_audio(mut self) -> Self {
        self.audio = Some(TrackInfo::audio(AUDIO_TRACK_ID));
        self
    }
}

impl MediaAsset for SyntheticAsset {
    fn duration(&self) -> MediaTime {
        self.duration
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.video.iter().chain(self.audio.iter()).cloned().collect()
    }
}

/// Fault injection and pacing for the synthetic backend.
#[derive(Debug, Clone)]
pub struct SyntheticBehavior {
    pub fail_reader_open: bool,
    pub fail_writer_open: bool,
    /// The reader refuses to add track outputs.
    pub fail_add_output: bool,
    /// The reader fails once it has produced this many samples.
    pub reader_fails_after: Option<usize>,
    /// The writer fails on the append after this many samples.
    pub writer_fails_after: Option<usize>,
    /// Inputs accept this many samples, then become ready again shortly
    /// after on a separate thread.
    pub backpressure_burst: Option<usize>,
    /// Inputs stop accepting data for good after this many samples.
    pub stall_after: Option<usize>,
    /// Sample frames per generated audio chunk.
    pub audio_chunk_frames: usize,
}

impl Default for SyntheticBehavior {
    fn default() -> Self {
        Self {
            fail_reader_open: false,
            fail_writer_open: false,
            fail_add_output: false,
            reader_fails_after: None,
            writer_fails_after: None,
            backpressure_burst: None,
            stall_after: None,
            audio_chunk_frames: 1024,
        }
    }
}

/// What the writer received, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenSample {
    pub kind: TrackKind,
    pub presentation_time: MediaTime,
    /// Encoded frame size (video only): the configured output size, or
    /// the render size when none is set.
    pub dimensions: Option<(u32, u32)>,
    /// Top-left pixel (video only).
    pub first_pixel: Option<[u8; 4]>,
    /// Sample frames (audio only).
    pub audio_frames: usize,
}

/// Reference [`MediaBackend`].
#[derive(Debug, Default)]
pub struct SyntheticBackend {
    behavior: SyntheticBehavior,
    written: Arc<Mutex<Vec<WrittenSample>>>,
}

impl SyntheticBackend {
    pub fn new(behavior: SyntheticBehavior) -> Self {
        Self {
            behavior,
            written: Arc::default(),
        }
    }

    pub fn behavior(&self) -> &SyntheticBehavior {
        &self.behavior
    }

    /// Samples appended to the most recently opened writer.
    pub fn written_samples(&self) -> Vec<WrittenSample> {
        self.written.lock().clone()
    }

    pub fn written_count(&self, kind: TrackKind) -> usize {
        self.written
            .lock()
            .iter()
            .filter(|sample| sample.kind == kind)
            .count()
    }
}

impl MediaBackend for SyntheticBackend {
    fn open_reader(
        &self,
        asset: Arc<dyn MediaAsset>,
        time_range: TimeRange,
    ) -> Result<Arc<dyn SourceReader>, MediaError> {
        if self.behavior.fail_reader_open {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                1,
                "Cannot open source",
            ));
        }
        let start = time_range.start;
        let end = start + time_range.resolved_duration(asset.duration());
        Ok(Arc::new(SyntheticReader {
            shared: Arc::new(ReaderShared {
                behavior: self.behavior.clone(),
                start,
                end,
                state: Mutex::new(ReaderState {
                    status: ReaderStatus::Idle,
                    error: None,
                    pulled: 0,
                    outputs: 0,
                    exhausted: 0,
                }),
            }),
        }))
    }

    fn open_writer(&self, config: &WriterConfig) -> Result<Arc<dyn SinkWriter>, MediaError> {
        if self.behavior.fail_writer_open {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                2,
                format!("Cannot open {}", config.target.display()),
            ));
        }
        self.written.lock().clear();
        Ok(Arc::new(SyntheticWriter {
            shared: Arc::new(WriterShared {
                config: config.clone(),
                behavior: self.behavior.clone(),
                written: Arc::clone(&self.written),
                state: Mutex::new(WriterState {
                    status: WriterStatus::Idle,
                    error: None,
                    file: None,
                    appended: 0,
                    tracks: Vec::new(),
                }),
            }),
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

// ── Reader ──────────────────────────────────────────────────────────────────

struct ReaderShared {
    behavior: SyntheticBehavior,
    start: MediaTime,
    end: MediaTime,
    state: Mutex<ReaderState>,
}

struct ReaderState {
    status: ReaderStatus,
    error: Option<MediaError>,
    pulled: usize,
    outputs: usize,
    exhausted: usize,
}

struct SyntheticReader {
    shared: Arc<ReaderShared>,
}

impl SyntheticReader {
    fn register_output(&self) -> Result<(), MediaError> {
        if self.shared.behavior.fail_add_output {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                8,
                "Track output not supported",
            ));
        }
        let mut state = self.shared.state.lock();
        if state.status != ReaderStatus::Idle {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                4,
                "Outputs must be added before reading starts",
            ));
        }
        state.outputs += 1;
        Ok(())
    }
}

impl SourceReader for SyntheticReader {
    fn status(&self) -> ReaderStatus {
        self.shared.state.lock().status
    }

    fn error(&self) -> Option<MediaError> {
        self.shared.state.lock().error.clone()
    }

    fn add_video_output(
        &self,
        _track: &TrackInfo,
        composition: &VideoComposition,
    ) -> Result<Box<dyn TrackOutput>, MediaError> {
        self.register_output()?;
        let (width, height) = composition.render_size.to_pixels();
        Ok(Box::new(GeneratedOutput {
            shared: Arc::clone(&self.shared),
            generator: Generator::Video {
                width,
                height,
                frame_duration: composition.frame_duration,
            },
            index: 0,
            done: false,
        }))
    }

    fn add_audio_output(
        &self,
        _track: &TrackInfo,
        settings: &AudioSettings,
    ) -> Result<Box<dyn TrackOutput>, MediaError> {
        self.register_output()?;
        Ok(Box::new(GeneratedOutput {
            shared: Arc::clone(&self.shared),
            generator: Generator::Audio {
                sample_rate: settings.sample_rate,
                channels: settings.channels,
                chunk_frames: self.shared.behavior.audio_chunk_frames.max(1),
            },
            index: 0,
            done: false,
        }))
    }

    fn begin_reading(&self) -> Result<(), MediaError> {
        let mut state = self.shared.state.lock();
        if state.status != ReaderStatus::Idle {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                4,
                "Reader already started",
            ));
        }
        state.status = if state.outputs == 0 {
            ReaderStatus::Completed
        } else {
            ReaderStatus::Active
        };
        Ok(())
    }

    fn cancel_reading(&self) {
        let mut state = self.shared.state.lock();
        if matches!(state.status, ReaderStatus::Idle | ReaderStatus::Active) {
            state.status = ReaderStatus::Cancelled;
        }
    }
}

enum Generator {
    Video {
        width: u32,
        height: u32,
        frame_duration: MediaTime,
    },
    Audio {
        sample_rate: u32,
        channels: u16,
        chunk_frames: usize,
    },
}

struct GeneratedOutput {
    shared: Arc<ReaderShared>,
    generator: Generator,
    index: i64,
    done: bool,
}

impl GeneratedOutput {
    fn presentation_time(&self) -> MediaTime {
        let offset = match &self.generator {
            Generator::Video { frame_duration, .. } => {
                MediaTime::new(frame_duration.value * self.index, frame_duration.timescale)
            }
            Generator::Audio {
                sample_rate,
                chunk_frames,
                ..
            } => MediaTime::new(
                *chunk_frames as i64 * self.index,
                i32::try_from(*sample_rate).unwrap_or(i32::MAX),
            ),
        };
        self.shared.start + offset
    }

    fn sample_at(&self, pts: MediaTime) -> Sample {
        match &self.generator {
            Generator::Video { width, height, .. } => Sample::video(
                pts,
                clipexport_media_model::FrameBuffer::filled(
                    *width,
                    *height,
                    test_pattern(self.index),
                ),
            ),
            Generator::Audio {
                sample_rate,
                channels,
                chunk_frames,
            } => Sample::audio(
                pts,
                AudioChunk::silence(*sample_rate, *channels, *chunk_frames),
            ),
        }
    }
}

/// BGRA colour of generated frame `index`.
pub fn test_pattern(index: i64) -> [u8; 4] {
    [(index.rem_euclid(32) * 8) as u8, 0x40, 0x80, 0xff]
}

impl TrackOutput for GeneratedOutput {
    fn pull_next_sample(&mut self) -> Option<Sample> {
        let mut state = self.shared.state.lock();
        if state.status != ReaderStatus::Active || self.done {
            return None;
        }

        if let Some(limit) = self.shared.behavior.reader_fails_after {
            if state.pulled >= limit {
                state.status = ReaderStatus::Failed;
                state.error = Some(MediaError::new(
                    SYNTHETIC_ERROR_DOMAIN,
                    3,
                    format!("Decode failed after {limit} samples"),
                ));
                return None;
            }
        }

        let pts = self.presentation_time();
        if pts >= self.shared.end {
            self.done = true;
            state.exhausted += 1;
            if state.exhausted >= state.outputs {
                state.status = ReaderStatus::Completed;
            }
            return None;
        }

        state.pulled += 1;
        drop(state);

        let sample = self.sample_at(pts);
        self.index += 1;
        Some(sample)
    }
}

// ── Writer ──────────────────────────────────────────────────────────────────

struct WriterShared {
    config: WriterConfig,
    behavior: SyntheticBehavior,
    written: Arc<Mutex<Vec<WrittenSample>>>,
    state: Mutex<WriterState>,
}

struct WriterState {
    status: WriterStatus,
    error: Option<MediaError>,
    file: Option<BufWriter<File>>,
    appended: usize,
    tracks: Vec<TrackKind>,
}

impl WriterState {
    fn fail(&mut self, error: MediaError) {
        tracing::debug!(error = %error, "Synthetic writer failed");
        self.status = WriterStatus::Failed;
        self.error = Some(error);
        self.file = None;
    }

    fn write_line<T: Serialize>(&mut self, line: &T) -> Result<(), MediaError> {
        let Some(file) = self.file.as_mut() else {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                5,
                "Output file is not open",
            ));
        };
        serde_json::to_writer(&mut *file, line)
            .map_err(|e| MediaError::new(SYNTHETIC_ERROR_DOMAIN, 6, e.to_string()))?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct HeaderLine<'a> {
    format: &'static str,
    container: &'static str,
    created_at: String,
    optimize_for_streaming: bool,
    tracks: &'a [TrackKind],
    metadata: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SampleLine {
    track: TrackKind,
    pts: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel: Option<[u8; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<usize>,
}

#[derive(Serialize)]
struct TrailerLine {
    trailer: bool,
    samples: usize,
}

struct SyntheticWriter {
    shared: Arc<WriterShared>,
}

impl SyntheticWriter {
    fn add_input(
        &self,
        kind: TrackKind,
        pool: Option<Arc<BoundedFramePool>>,
        encoded_size: Option<(u32, u32)>,
    ) -> Result<Arc<dyn TrackInput>, MediaError> {
        let mut state = self.shared.state.lock();
        if state.status != WriterStatus::Idle {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                4,
                "Inputs must be added before writing starts",
            ));
        }
        state.tracks.push(kind);
        let credit = self.shared.behavior.backpressure_burst.unwrap_or(usize::MAX);
        Ok(Arc::new(SyntheticInput {
            kind,
            shared: Arc::clone(&self.shared),
            pacing: Arc::new(Pacing {
                credit: Mutex::new(credit),
                notifier: Mutex::new(None),
            }),
            pool,
            encoded_size,
            finished: AtomicBool::new(false),
        }))
    }
}

impl SinkWriter for SyntheticWriter {
    fn status(&self) -> WriterStatus {
        self.shared.state.lock().status
    }

    fn error(&self) -> Option<MediaError> {
        self.shared.state.lock().error.clone()
    }

    fn add_video_input(
        &self,
        settings: &VideoSettings,
        render_size: Size,
    ) -> Result<Arc<dyn TrackInput>, MediaError> {
        // Frames arrive at the render size; the encoder scales to the output size.
        let (width, height) = render_size.to_pixels();
        let encoded = match (settings.width, settings.height) {
            (Some(out_w), Some(out_h)) => (out_w, out_h),
            _ => (width, height),
        };
        let pool = Arc::new(BoundedFramePool::new(width, height, DEFAULT_POOL_CAPACITY));
        self.add_input(TrackKind::Video, Some(pool), Some(encoded))
    }

    fn add_audio_input(
        &self,
        _settings: &AudioSettings,
    ) -> Result<Arc<dyn TrackInput>, MediaError> {
        self.add_input(TrackKind::Audio, None, None)
    }

    fn begin_writing(&self) -> Result<(), MediaError> {
        let config = &self.shared.config;
        let mut state = self.shared.state.lock();
        if state.status != WriterStatus::Idle {
            return Err(MediaError::new(
                SYNTHETIC_ERROR_DOMAIN,
                4,
                "Writer already started",
            ));
        }
        if let Some(parent) = config.target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        state.file = Some(BufWriter::new(File::create(&config.target)?));

        let tracks = state.tracks.clone();
        let header = HeaderLine {
            format: "clipexport-synthetic",
            container: config.container.extension(),
            created_at: chrono::Utc::now().to_rfc3339(),
            optimize_for_streaming: config.optimize_for_streaming,
            tracks: &tracks,
            metadata: &config.metadata,
        };
        state.write_line(&header)?;
        state.status = WriterStatus::Active;
        tracing::debug!(target = %config.target.display(), "Synthetic writer started");
        Ok(())
    }

    fn start_session(&self, at: MediaTime) {
        tracing::trace!(at = at.seconds(), "Synthetic writer session started");
    }

    fn finish_writing(&self, on_done: FinishCallback) {
        {
            let mut state = self.shared.state.lock();
            if state.status == WriterStatus::Active {
                let trailer = TrailerLine {
                    trailer: true,
                    samples: state.appended,
                };
                let committed = state
                    .write_line(&trailer)
                    .and_then(|()| match state.file.take() {
                        Some(mut file) => file.flush().map_err(MediaError::from),
                        None => Ok(()),
                    });
                match committed {
                    Ok(()) => state.status = WriterStatus::Completed,
                    Err(e) => state.fail(e),
                }
            }
        }
        on_done();
    }

    fn cancel_writing(&self) {
        let mut state = self.shared.state.lock();
        if matches!(state.status, WriterStatus::Idle | WriterStatus::Active) {
            state.status = WriterStatus::Cancelled;
            state.file = None;
        }
    }
}

struct Pacing {
    credit: Mutex<usize>,
    notifier: Mutex<Option<ReadinessNotifier>>,
}

struct SyntheticInput {
    kind: TrackKind,
    shared: Arc<WriterShared>,
    pacing: Arc<Pacing>,
    pool: Option<Arc<BoundedFramePool>>,
    encoded_size: Option<(u32, u32)>,
    finished: AtomicBool,
}

impl SyntheticInput {
    fn stalled(&self, appended: usize) -> bool {
        self.shared
            .behavior
            .stall_after
            .is_some_and(|limit| appended >= limit)
    }

    /// Schedule a refill of the burst credit and a readiness notification.
    fn schedule_refill(&self, burst: usize) {
        let pacing = Arc::clone(&self.pacing);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(1));
            *pacing.credit.lock() = burst;
            let notifier = pacing.notifier.lock().clone();
            if let Some(notify) = notifier {
                notify();
            }
        });
    }
}

impl TrackInput for SyntheticInput {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_ready_for_more_data(&self) -> bool {
        if self.finished.load(Ordering::Acquire) {
            return false;
        }
        let appended = {
            let state = self.shared.state.lock();
            if state.status != WriterStatus::Active {
                return false;
            }
            state.appended
        };
        !self.stalled(appended) && *self.pacing.credit.lock() > 0
    }

    fn append(&self, sample: Sample) -> bool {
        let record = WrittenSample {
            kind: sample.kind(),
            presentation_time: sample.presentation_time,
            dimensions: sample.frame().and(self.encoded_size),
            first_pixel: sample.frame().and_then(|frame| frame.pixel(0, 0)),
            audio_frames: match &sample.payload {
                SamplePayload::Audio(chunk) => chunk.frames(),
                SamplePayload::Video(_) => 0,
            },
        };

        {
            let mut state = self.shared.state.lock();
            if state.status != WriterStatus::Active {
                return false;
            }
            if let Some(limit) = self.shared.behavior.writer_fails_after {
                if state.appended >= limit {
                    state.fail(MediaError::new(
                        SYNTHETIC_ERROR_DOMAIN,
                        7,
                        format!("Encoder failed after {limit} samples"),
                    ));
                    return false;
                }
            }
            let line = SampleLine {
                track: record.kind,
                pts: record.presentation_time.seconds(),
                size: record.dimensions,
                pixel: record.first_pixel,
                frames: (record.kind == TrackKind::Audio).then_some(record.audio_frames),
            };
            if let Err(e) = state.write_line(&line) {
                state.fail(e);
                return false;
            }
            state.appended += 1;
        }
        self.shared.written.lock().push(record);

        if let (Some(pool), Some(frame)) = (&self.pool, sample.into_frame()) {
            pool.recycle(frame);
        }

        if let Some(burst) = self.shared.behavior.backpressure_burst {
            let exhausted = {
                let mut credit = self.pacing.credit.lock();
                *credit = credit.saturating_sub(1);
                *credit == 0
            };
            if exhausted {
                self.schedule_refill(burst);
            }
        }
        true
    }

    fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    fn request_media_data_when_ready(&self, notifier: ReadinessNotifier) {
        *self.pacing.notifier.lock() = Some(Arc::clone(&notifier));
        if self.is_ready_for_more_data() {
            notifier();
        }
    }

    fn frame_buffer_pool(&self) -> Option<Arc<dyn FrameBufferPool>> {
        self.pool
            .as_ref()
            .map(|pool| Arc::clone(pool) as Arc<dyn FrameBufferPool>)
    }
}

#[cfg(test)]
mod tests {
    use clipexport_media_model::ContainerKind;

    use super::*;

    fn writer_config(dir: &std::path::Path) -> WriterConfig {
        WriterConfig {
            target: dir.join("nested").join("out.mp4"),
            container: ContainerKind::Mp4,
            optimize_for_streaming: true,
            metadata: [("title".to_string(), "demo".to_string())].into(),
        }
    }

    #[test]
    fn test_asset_tracks() {
        let asset = SyntheticAsset::new(MediaTime::new(2, 1))
            .with_video(Size::new(64.0, 36.0), 24.0)
            .with_video_transform(AffineTransform::rotation_degrees(90.0))
            .with_audio();
        let tracks = asset.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].kind, TrackKind::Video);
        assert!(!tracks[0].preferred_transform.is_identity());
        assert!(asset.first_track(TrackKind::Audio).is_some());

        let empty =
            SyntheticAsset::new(MediaTime::ZERO).with_video_transform(AffineTransform::IDENTITY);
        assert!(empty.tracks().is_empty());
    }

    #[test]
    fn test_reader_generates_range_then_completes() {
        let asset: Arc<dyn MediaAsset> = Arc::new(
            SyntheticAsset::new(MediaTime::new(1, 1)).with_video(Size::new(4.0, 4.0), 10.0),
        );
        let backend = SyntheticBackend::default();
        let reader = backend
            .open_reader(
                Arc::clone(&asset),
                TimeRange::new(MediaTime::new(1, 2), MediaTime::new(3, 10)),
            )
            .unwrap();
        let track = asset.first_track(TrackKind::Video).unwrap();
        let composition = crate::geometry::build_default_composition(
            &track,
            &VideoSettings::default(),
            asset.duration(),
        );
        let mut output = reader.add_video_output(&track, &composition).unwrap();
        reader.begin_reading().unwrap();

        let mut times = Vec::new();
        while let Some(sample) = output.pull_next_sample() {
            times.push(sample.presentation_time.seconds());
        }
        assert_eq!(times.len(), 3);
        assert!((times[0] - 0.5).abs() < 1e-9);
        assert!((times[2] - 0.7).abs() < 1e-9);
        assert_eq!(reader.status(), ReaderStatus::Completed);
    }

    #[test]
    fn test_writer_produces_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SyntheticBackend::default();
        let config = writer_config(dir.path());
        let writer = backend.open_writer(&config).unwrap();
        let input = writer.add_audio_input(&AudioSettings::default()).unwrap();
        writer.begin_writing().unwrap();
        writer.start_session(MediaTime::ZERO);

        assert!(input.is_ready_for_more_data());
        assert!(input.append(Sample::audio(
            MediaTime::ZERO,
            AudioChunk::silence(44_100, 2, 1024)
        )));
        input.mark_finished();
        assert!(!input.is_ready_for_more_data());

        let (tx, rx) = crossbeam_channel::bounded(1);
        writer.finish_writing(Box::new(move || tx.send(()).unwrap()));
        rx.recv().unwrap();
        assert_eq!(writer.status(), WriterStatus::Completed);

        let text = std::fs::read_to_string(&config.target).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["container"], "mp4");
        assert_eq!(lines[0]["metadata"]["title"], "demo");
        assert_eq!(lines[1]["track"], "audio");
        assert_eq!(lines[1]["frames"], 1024);
        assert_eq!(lines[2]["samples"], 1);
        assert_eq!(backend.written_count(TrackKind::Audio), 1);
    }

    #[test]
    fn test_writer_fails_after_limit() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SyntheticBackend::new(SyntheticBehavior {
            writer_fails_after: Some(1),
            ..SyntheticBehavior::default()
        });
        let writer = backend.open_writer(&writer_config(dir.path())).unwrap();
        let input = writer.add_audio_input(&AudioSettings::default()).unwrap();
        writer.begin_writing().unwrap();

        let chunk = || Sample::audio(MediaTime::ZERO, AudioChunk::silence(44_100, 2, 8));
        assert!(input.append(chunk()));
        assert!(!input.append(chunk()));
        assert_eq!(writer.status(), WriterStatus::Failed);
        assert_eq!(writer.error().map(|e| e.code), Some(7));
    }

    #[test]
    fn test_backpressure_refills_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SyntheticBackend::new(SyntheticBehavior {
            backpressure_burst: Some(1),
            ..SyntheticBehavior::default()
        });
        let writer = backend.open_writer(&writer_config(dir.path())).unwrap();
        let input = writer.add_audio_input(&AudioSettings::default()).unwrap();
        writer.begin_writing().unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        input.request_media_data_when_ready(Arc::new(move || {
            let _ = tx.send(());
        }));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(input.append(Sample::audio(
            MediaTime::ZERO,
            AudioChunk::silence(44_100, 2, 8)
        )));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(input.is_ready_for_more_data());
    }

    #[test]
    fn test_open_failures() {
        let backend = SyntheticBackend::new(SyntheticBehavior {
            fail_reader_open: true,
            fail_writer_open: true,
            ..SyntheticBehavior::default()
        });
        let asset: Arc<dyn MediaAsset> = Arc::new(SyntheticAsset::new(MediaTime::new(1, 1)));
        assert!(backend.open_reader(asset, TimeRange::FULL).is_err());
        let dir = tempfile::tempdir().unwrap();
        assert!(backend.open_writer(&writer_config(dir.path())).is_err());
    }
}
