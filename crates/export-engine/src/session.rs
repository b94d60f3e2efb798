//! Export session: configuration, lifecycle and the finalize path.
//!
//! An [`ExportSession`] owns at most one *attempt* at a time. Each call to
//! [`ExportSession::start`] opens a fresh reader/writer pair, wires one
//! [`TrackPump`] per present track, and spawns a dedicated worker queue on
//! which every pump iteration, finalize and cancellation of that attempt
//! runs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use clipexport_common::config::ExportDefaults;
use clipexport_common::error::{ExportError, ExportResult};
use clipexport_media_model::{
    AudioSettings, ContainerKind, MediaAsset, TimeRange, TrackKind, VideoComposition,
    VideoSettings,
};
use parking_lot::Mutex;
use serde::Serialize;

use crate::backend::{
    FsOutputStore, MediaBackend, OutputStore, ReaderStatus, SinkWriter, SourceReader, TrackInput,
    WriterConfig, WriterStatus,
};
use crate::coordinator::CompletionCoordinator;
use crate::geometry::build_default_composition;
use crate::hook::FrameTransformHook;
use crate::progress::ProgressMeter;
use crate::pump::{PumpEnv, PumpOutcome, TrackPump, VideoStage};
use crate::queue::WorkerQueue;

/// Invoked exactly once per [`ExportSession::start`].
pub type CompletionHandler = Box<dyn FnOnce() + Send + 'static>;

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportState {
    Idle,
    Exporting,
    Completed,
    Failed,
    Cancelled,
}

impl ExportState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExportState::Completed | ExportState::Failed | ExportState::Cancelled
        )
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Idle => "idle",
            ExportState::Exporting => "exporting",
            ExportState::Completed => "completed",
            ExportState::Failed => "failed",
            ExportState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Snapshot of a finished (or running) export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub state: ExportState,
    pub error: Option<ExportError>,
    pub progress: f64,
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        self.state == ExportState::Completed
    }
}

/// Everything an export needs. Stored by [`ExportSession::configure`];
/// validated only when the export starts.
#[derive(Clone)]
pub struct ExportConfig {
    pub asset: Arc<dyn MediaAsset>,
    pub time_range: TimeRange,
    pub output_target: Option<PathBuf>,
    pub container: ContainerKind,
    pub optimize_for_streaming: bool,
    pub metadata: BTreeMap<String, String>,
    /// Video encode settings; defaults apply when unset.
    pub video_settings: Option<VideoSettings>,
    /// Audio encode settings; defaults apply when unset.
    pub audio_settings: Option<AudioSettings>,
    /// Replaces the default aspect-fit composition.
    pub composition: Option<VideoComposition>,
    pub frame_hook: Option<Arc<dyn FrameTransformHook>>,
}

impl ExportConfig {
    pub fn new(asset: Arc<dyn MediaAsset>) -> Self {
        Self {
            asset,
            time_range: TimeRange::FULL,
            output_target: None,
            container: ContainerKind::default(),
            optimize_for_streaming: false,
            metadata: BTreeMap::new(),
            video_settings: None,
            audio_settings: None,
            composition: None,
            frame_hook: None,
        }
    }

    /// Apply the application's export defaults (container, codecs, output
    /// size, streaming flag).
    pub fn with_defaults(mut self, defaults: &ExportDefaults) -> ExportResult<Self> {
        self.container = defaults.container.parse()?;
        self.optimize_for_streaming = defaults.optimize_for_streaming;
        self.video_settings = Some(VideoSettings::from_defaults(defaults)?);
        self.audio_settings = Some(AudioSettings::from_defaults(defaults)?);
        Ok(self)
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    pub fn with_output_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.output_target = Some(target.into());
        self
    }

    pub fn with_container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }

    pub fn with_optimize_for_streaming(mut self, enabled: bool) -> Self {
        self.optimize_for_streaming = enabled;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_video_settings(mut self, settings: VideoSettings) -> Self {
        self.video_settings = Some(settings);
        self
    }

    pub fn with_audio_settings(mut self, settings: AudioSettings) -> Self {
        self.audio_settings = Some(settings);
        self
    }

    pub fn with_composition(mut self, composition: VideoComposition) -> Self {
        self.composition = Some(composition);
        self
    }

    pub fn with_frame_hook(mut self, hook: impl FrameTransformHook + 'static) -> Self {
        self.frame_hook = Some(Arc::new(hook));
        self
    }

    /// Check everything that can be checked without touching the backend.
    pub fn validate(&self) -> ExportResult<()> {
        if self.output_target.is_none() {
            return Err(ExportError::configuration("No output target configured"));
        }
        if let Some(settings) = &self.video_settings {
            settings.validate()?;
        }
        if let Some(settings) = &self.audio_settings {
            settings.validate()?;
        }
        if let Some(composition) = &self.composition {
            composition.validate()?;
        }
        if self.time_range.start.is_negative() {
            return Err(ExportError::configuration("Time range starts before zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("asset_duration", &self.asset.duration())
            .field("time_range", &self.time_range)
            .field("output_target", &self.output_target)
            .field("container", &self.container)
            .field("optimize_for_streaming", &self.optimize_for_streaming)
            .field("metadata", &self.metadata)
            .field("video_settings", &self.video_settings)
            .field("audio_settings", &self.audio_settings)
            .field("custom_composition", &self.composition.is_some())
            .field("frame_hook", &self.frame_hook.is_some())
            .finish()
    }
}

/// Handle to an export session. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ExportSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn MediaBackend>,
    store: Arc<dyn OutputStore>,
    config: Mutex<Option<ExportConfig>>,
    active: Mutex<Option<Arc<ActiveExport>>>,
    setup_error: Mutex<Option<ExportError>>,
    attempts: AtomicU64,
}

/// One export attempt and everything it allocated.
struct ActiveExport {
    attempt: u64,
    reader: Arc<dyn SourceReader>,
    writer: Arc<dyn SinkWriter>,
    inputs: Vec<(TrackKind, Arc<dyn TrackInput>)>,
    target: PathBuf,
    store: Arc<dyn OutputStore>,
    queue: WorkerQueue,
    coordinator: CompletionCoordinator,
    pumps: Mutex<Pumps>,
    error: Mutex<Option<ExportError>>,
    progress: Arc<ProgressMeter>,
    on_complete: Mutex<Option<CompletionHandler>>,
}

#[derive(Default)]
struct Pumps {
    video: Option<TrackPump>,
    audio: Option<TrackPump>,
}

impl Pumps {
    fn get_mut(&mut self, kind: TrackKind) -> Option<&mut TrackPump> {
        match kind {
            TrackKind::Video => self.video.as_mut(),
            TrackKind::Audio => self.audio.as_mut(),
        }
    }
}

impl ExportSession {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_output_store(backend, Arc::new(FsOutputStore))
    }

    pub fn with_output_store(backend: Arc<dyn MediaBackend>, store: Arc<dyn OutputStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                store,
                config: Mutex::new(None),
                active: Mutex::new(None),
                setup_error: Mutex::new(None),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Store the configuration used by the next [`start`](Self::start).
    pub fn configure(&self, config: ExportConfig) {
        tracing::debug!(?config, "Export configured");
        *self.inner.config.lock() = Some(config);
    }

    /// Start exporting.
    ///
    /// An export already in flight is cancelled first, and this call waits
    /// until that cancellation has run. `on_complete` fires exactly once:
    /// synchronously if setup fails, otherwise on the worker queue after the
    /// output has been committed or discarded.
    pub fn start<F>(&self, on_complete: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel_in_flight();

        let attempt = self.inner.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self.inner.active.lock().take();
        drop(previous);
        *self.inner.setup_error.lock() = None;

        let config = self.inner.config.lock().clone();
        let active = match self.prepare(attempt, config) {
            Ok(active) => active,
            Err(err) => {
                tracing::warn!(attempt, error = %err, code = err.code(), "Export setup failed");
                *self.inner.setup_error.lock() = Some(err);
                on_complete();
                return;
            }
        };

        *active.on_complete.lock() = Some(Box::new(on_complete));
        *self.inner.active.lock() = Some(Arc::clone(&active));

        tracing::info!(
            attempt,
            target = %active.target.display(),
            tracks = active.inputs.len(),
            "Export started"
        );

        self.register_notifiers(&active);

        if active.coordinator.claim_if_settled() {
            let job_active = Arc::clone(&active);
            if !active.queue.post(move || finalize(&job_active)) {
                finalize(&active);
            }
        }
    }

    /// Start and wait for the completion callback.
    pub async fn run(&self) -> ExportOutcome {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let weak = Arc::downgrade(&self.inner);
        self.start(move || {
            if let Some(inner) = weak.upgrade() {
                let _ = tx.send(ExportSession { inner }.outcome());
            }
        });
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => self.outcome(),
        }
    }

    /// Cancel the export in flight. No-op unless exporting.
    ///
    /// The cancellation is queued behind pump work already posted; once it
    /// runs, the partial output is removed, the completion callback fires
    /// and the session returns to idle.
    pub fn cancel(&self) {
        let Some(active) = self.exporting_attempt() else {
            tracing::debug!("Cancel ignored, nothing is exporting");
            return;
        };
        tracing::info!(attempt = active.attempt, "Cancellation requested");
        self.post_cancel(&active, None);
    }

    /// Drop the previous attempt and return to idle. Rejected while
    /// exporting.
    pub fn reset(&self) -> ExportResult<()> {
        if self.status() == ExportState::Exporting {
            return Err(ExportError::invalid_state(
                "Cannot reset while an export is running",
            ));
        }
        let previous = self.inner.active.lock().take();
        *self.inner.setup_error.lock() = None;
        drop(previous);
        Ok(())
    }

    pub fn status(&self) -> ExportState {
        if self.inner.setup_error.lock().is_some() {
            return ExportState::Failed;
        }
        match self.current() {
            Some(active) => active.state(),
            None => ExportState::Idle,
        }
    }

    /// The error that ended the current attempt, if any.
    pub fn error(&self) -> Option<ExportError> {
        if let Some(err) = self.inner.setup_error.lock().clone() {
            return Some(err);
        }
        let active = self.current()?;
        if let Some(err) = active.error.lock().clone() {
            return Some(err);
        }
        if let Some(err) = active.writer.error() {
            return Some(ExportError::WriteFailure(err));
        }
        active.reader.error().map(ExportError::ReadFailure)
    }

    /// Fraction of the current attempt completed, in `[0.0, 1.0]`.
    pub fn progress(&self) -> f64 {
        self.current()
            .map(|active| active.progress.get())
            .unwrap_or(0.0)
    }

    pub fn outcome(&self) -> ExportOutcome {
        ExportOutcome {
            state: self.status(),
            error: self.error(),
            progress: self.progress(),
        }
    }

    /// Number of times [`start`](Self::start) has been called.
    pub fn attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::Relaxed)
    }

    fn current(&self) -> Option<Arc<ActiveExport>> {
        self.inner.active.lock().clone()
    }

    fn exporting_attempt(&self) -> Option<Arc<ActiveExport>> {
        self.current()
            .filter(|active| active.state() == ExportState::Exporting)
    }

    fn is_current(&self, active: &Arc<ActiveExport>) -> bool {
        self.inner
            .active
            .lock()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, active))
    }

    /// Cancel a running attempt and wait for the cancellation to drain.
    fn cancel_in_flight(&self) {
        let Some(active) = self.exporting_attempt() else {
            return;
        };
        tracing::info!(attempt = active.attempt, "Cancelling export in flight before restart");

        if active.queue.is_worker_thread() {
            // Called from a hook or callback; waiting would deadlock.
            self.cancel_now(&active);
            return;
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        if self.post_cancel(&active, Some(tx)) {
            let _ = rx.recv();
        } else {
            self.cancel_now(&active);
        }
    }

    fn post_cancel(
        &self,
        active: &Arc<ActiveExport>,
        done: Option<crossbeam_channel::Sender<()>>,
    ) -> bool {
        let weak = Arc::downgrade(&self.inner);
        let job_active = Arc::clone(active);
        active.queue.post(move || {
            if let Some(inner) = weak.upgrade() {
                ExportSession { inner }.cancel_now(&job_active);
            }
            if let Some(done) = done {
                let _ = done.send(());
            }
        })
    }

    fn cancel_now(&self, active: &Arc<ActiveExport>) {
        if !self.is_current(active) || active.state() != ExportState::Exporting {
            return;
        }
        active.coordinator.claim();
        active.writer.cancel_writing();
        active.reader.cancel_reading();
        active.complete();
        self.reset_attempt(active);
        tracing::info!(attempt = active.attempt, "Export cancelled");
    }

    fn reset_attempt(&self, active: &Arc<ActiveExport>) {
        let previous = {
            let mut slot = self.inner.active.lock();
            if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, active)) {
                slot.take()
            } else {
                None
            }
        };
        // A newer attempt may already own the session; leave its state alone.
        if previous.is_some() {
            *self.inner.setup_error.lock() = None;
        }
        drop(previous);
    }

    fn prepare(
        &self,
        attempt: u64,
        config: Option<ExportConfig>,
    ) -> ExportResult<Arc<ActiveExport>> {
        let config = config
            .ok_or_else(|| ExportError::configuration("Export session has not been configured"))?;
        config.validate()?;
        let target = config
            .output_target
            .clone()
            .ok_or_else(|| ExportError::configuration("No output target configured"))?;

        let asset = Arc::clone(&config.asset);
        let video_track = asset.first_track(TrackKind::Video);
        let audio_track = asset.first_track(TrackKind::Audio);
        if video_track.is_some() && !config.container.supports_video() {
            return Err(ExportError::configuration(format!(
                "Container {} cannot carry a video track",
                config.container.extension()
            )));
        }

        let asset_duration = asset.duration();
        let start_at = config.time_range.start;
        let duration = config.time_range.resolved_duration(asset_duration);
        let video_settings = config.video_settings.clone().unwrap_or_default();
        let audio_settings = config.audio_settings.clone().unwrap_or_default();

        let reader = self
            .inner
            .backend
            .open_reader(Arc::clone(&asset), config.time_range)
            .map_err(|e| ExportError::initialization("source reader", e))?;

        let writer_config = WriterConfig {
            target: target.clone(),
            container: config.container,
            optimize_for_streaming: config.optimize_for_streaming,
            metadata: config.metadata.clone(),
        };
        let writer = match self.inner.backend.open_writer(&writer_config) {
            Ok(writer) => writer,
            Err(e) => {
                reader.cancel_reading();
                return Err(ExportError::initialization("sink writer", e));
            }
        };

        let progress = Arc::new(ProgressMeter::new());
        let mut pumps = Pumps::default();
        let mut inputs: Vec<(TrackKind, Arc<dyn TrackInput>)> = Vec::new();
        let mut output_created = false;

        let wired = (|| -> ExportResult<WorkerQueue> {
            if let Some(track) = &video_track {
                let composition = match &config.composition {
                    Some(custom) => custom.clone(),
                    None => build_default_composition(track, &video_settings, asset_duration),
                };
                composition.validate()?;

                let output = reader
                    .add_video_output(track, &composition)
                    .map_err(|e| ExportError::initialization("video output", e))?;
                let input = writer
                    .add_video_input(&video_settings, composition.render_size)
                    .map_err(|e| ExportError::initialization("video input", e))?;

                let mut pump = TrackPump::new(
                    TrackKind::Video,
                    output,
                    Arc::clone(&input),
                    start_at,
                    duration,
                    Arc::clone(&progress),
                );
                if let Some(hook) = &config.frame_hook {
                    pump = pump.with_video_stage(VideoStage {
                        hook: Arc::clone(hook),
                        pool: input.frame_buffer_pool(),
                    });
                }
                pumps.video = Some(pump);
                inputs.push((TrackKind::Video, input));
            }

            if let Some(track) = &audio_track {
                let output = reader
                    .add_audio_output(track, &audio_settings)
                    .map_err(|e| ExportError::initialization("audio output", e))?;
                let input = writer
                    .add_audio_input(&audio_settings)
                    .map_err(|e| ExportError::initialization("audio input", e))?;
                pumps.audio = Some(TrackPump::new(
                    TrackKind::Audio,
                    output,
                    Arc::clone(&input),
                    start_at,
                    duration,
                    Arc::clone(&progress),
                ));
                inputs.push((TrackKind::Audio, input));
            }

            writer
                .begin_writing()
                .map_err(|e| ExportError::initialization("sink writer", e))?;
            output_created = true;
            reader
                .begin_reading()
                .map_err(|e| ExportError::initialization("source reader", e))?;
            writer.start_session(start_at);

            WorkerQueue::spawn(format!("clipexport-export-{attempt}"))
        })();

        let queue = match wired {
            Ok(queue) => queue,
            Err(err) => {
                reader.cancel_reading();
                writer.cancel_writing();
                // Anything at the target before begin_writing is not ours.
                if output_created {
                    if let Err(e) = self.inner.store.remove_if_exists(&target) {
                        tracing::warn!(error = %e, path = %target.display(), "Failed to remove output");
                    }
                }
                return Err(err);
            }
        };

        tracing::debug!(
            attempt,
            backend = self.inner.backend.name(),
            video = video_track.is_some(),
            audio = audio_track.is_some(),
            duration_secs = duration.seconds(),
            "Export pipeline wired"
        );

        Ok(Arc::new(ActiveExport {
            attempt,
            reader,
            writer,
            inputs,
            target,
            store: Arc::clone(&self.inner.store),
            queue,
            coordinator: CompletionCoordinator::new(video_track.is_some(), audio_track.is_some()),
            pumps: Mutex::new(pumps),
            error: Mutex::new(None),
            progress,
            on_complete: Mutex::new(None),
        }))
    }

    fn register_notifiers(&self, active: &Arc<ActiveExport>) {
        for (kind, input) in &active.inputs {
            let kind = *kind;
            let weak_inner = Arc::downgrade(&self.inner);
            let weak_active = Arc::downgrade(active);
            input.request_media_data_when_ready(Arc::new(move || {
                post_pump(&weak_inner, &weak_active, kind);
            }));
        }
    }

    /// One pump iteration for `kind`, run on the worker queue.
    fn drive_track(&self, active: &Arc<ActiveExport>, kind: TrackKind) {
        if !self.is_current(active) || active.coordinator.is_done(kind) {
            return;
        }

        let outcome = {
            let mut pumps = active.pumps.lock();
            let Some(pump) = pumps.get_mut(kind) else {
                return;
            };
            let env = PumpEnv {
                session: self,
                reader: active.reader.as_ref(),
                writer: active.writer.as_ref(),
            };
            pump.pump(&env)
        };

        let should_finalize = match outcome {
            PumpOutcome::Suspended => false,
            PumpOutcome::Exhausted => active.coordinator.mark_done(kind),
            PumpOutcome::Aborted => active.coordinator.mark_failed(kind),
            PumpOutcome::Failed(err) => {
                tracing::warn!(
                    attempt = active.attempt,
                    track = %kind,
                    error = %err,
                    "Track pump failed"
                );
                active.record_error(err);
                active.coordinator.mark_failed(kind)
            }
        };

        if should_finalize {
            finalize(active);
        }
    }
}

impl fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportSession")
            .field("backend", &self.inner.backend.name())
            .field("status", &self.status())
            .field("attempts", &self.attempts())
            .finish()
    }
}

fn post_pump(weak_inner: &Weak<SessionInner>, weak_active: &Weak<ActiveExport>, kind: TrackKind) {
    let Some(active) = weak_active.upgrade() else {
        return;
    };
    let weak_inner = weak_inner.clone();
    let job_active = Arc::clone(&active);
    active.queue.post(move || {
        if let Some(inner) = weak_inner.upgrade() {
            ExportSession { inner }.drive_track(&job_active, kind);
        }
    });
}

/// Commit or discard the output once both tracks are settled.
fn finalize(active: &Arc<ActiveExport>) {
    let writer = active.writer.status();
    let reader = active.reader.status();
    tracing::debug!(attempt = active.attempt, ?writer, ?reader, "Finalizing export");

    if writer == WriterStatus::Cancelled || reader == ReaderStatus::Cancelled {
        // Cancelled from outside the session; finish tearing down.
        active.writer.cancel_writing();
        active.reader.cancel_reading();
        active.complete();
        return;
    }

    if writer == WriterStatus::Failed {
        active.reader.cancel_reading();
        active.complete();
        return;
    }

    if reader == ReaderStatus::Failed {
        let err = match active.reader.error() {
            Some(err) => ExportError::ReadFailure(err),
            None => ExportError::read_unspecified("Reader failed"),
        };
        active.record_error(err);
        active.writer.cancel_writing();
        active.complete();
        return;
    }

    if active.error.lock().is_some() {
        active.writer.cancel_writing();
        active.reader.cancel_reading();
        active.complete();
        return;
    }

    let committed = Arc::clone(active);
    active
        .writer
        .finish_writing(Box::new(move || committed.complete()));
}

impl ActiveExport {
    fn state(&self) -> ExportState {
        if self.error.lock().is_some() {
            return ExportState::Failed;
        }
        match self.writer.status() {
            WriterStatus::Idle => ExportState::Idle,
            WriterStatus::Active => ExportState::Exporting,
            WriterStatus::Completed => ExportState::Completed,
            WriterStatus::Failed => ExportState::Failed,
            WriterStatus::Cancelled => ExportState::Cancelled,
        }
    }

    /// Keep the first error; later ones are consequences.
    fn record_error(&self, err: ExportError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    /// Cleanup: discard or pin progress, then fire the completion handler.
    fn complete(&self) {
        let status = self.writer.status();
        let discard = matches!(status, WriterStatus::Failed | WriterStatus::Cancelled)
            || self.error.lock().is_some();

        if discard {
            match self.store.remove_if_exists(&self.target) {
                Ok(removed) => tracing::debug!(
                    attempt = self.attempt,
                    removed,
                    path = %self.target.display(),
                    "Discarded partial output"
                ),
                Err(e) => tracing::warn!(
                    attempt = self.attempt,
                    error = %e,
                    path = %self.target.display(),
                    "Failed to remove partial output"
                ),
            }
        } else if status == WriterStatus::Completed {
            self.progress.complete();
        }

        let handler = self.on_complete.lock().take();
        if let Some(handler) = handler {
            tracing::info!(
                attempt = self.attempt,
                writer = ?status,
                discarded = discard,
                "Export finished"
            );
            handler();
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let Some(active) = self.active.get_mut().take() else {
            return;
        };
        if active.state() == ExportState::Exporting {
            tracing::warn!(attempt = active.attempt, "Session dropped mid-export, aborting");
            active.coordinator.claim();
            active.writer.cancel_writing();
            active.reader.cancel_reading();
            active.complete();
        }
    }
}
