//! Backpressure-driven pull loop moving samples from one reader output to
//! one writer input.

use std::sync::Arc;

use clipexport_common::error::ExportError;
use clipexport_media_model::{MediaTime, Sample, TrackKind};

use crate::backend::{
    FrameBufferPool, ReaderStatus, SinkWriter, SourceReader, TrackInput, TrackOutput,
    WriterStatus,
};
use crate::hook::{invoke_hook, FrameTransformHook};
use crate::progress::ProgressMeter;
use crate::session::ExportSession;

/// How one pump iteration ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PumpOutcome {
    /// The input stopped accepting data; wait for the next readiness signal.
    Suspended,
    /// The output ran dry and the input has been marked finished.
    Exhausted,
    /// A side stopped without failing (it was cancelled).
    Aborted,
    Failed(ExportError),
}

/// Collaborators a pump iteration needs besides its own ports.
pub struct PumpEnv<'a> {
    pub session: &'a ExportSession,
    pub reader: &'a dyn SourceReader,
    pub writer: &'a dyn SinkWriter,
}

/// Frame interception for the video pump.
pub struct VideoStage {
    pub hook: Arc<dyn FrameTransformHook>,
    pub pool: Option<Arc<dyn FrameBufferPool>>,
}

/// Moves samples for one track.
pub struct TrackPump {
    kind: TrackKind,
    output: Box<dyn TrackOutput>,
    input: Arc<dyn TrackInput>,
    start_offset: MediaTime,
    duration_secs: f64,
    progress: Arc<ProgressMeter>,
    video_stage: Option<VideoStage>,
    appended: u64,
}

impl TrackPump {
    pub fn new(
        kind: TrackKind,
        output: Box<dyn TrackOutput>,
        input: Arc<dyn TrackInput>,
        start_offset: MediaTime,
        duration: MediaTime,
        progress: Arc<ProgressMeter>,
    ) -> Self {
        Self {
            kind,
            output,
            input,
            start_offset,
            duration_secs: duration.seconds(),
            progress,
            video_stage: None,
            appended: 0,
        }
    }

    /// Route video frames through `stage` before appending.
    pub fn with_video_stage(mut self, stage: VideoStage) -> Self {
        self.video_stage = Some(stage);
        self
    }

    /// Run until the input stops accepting data, the output runs dry, or
    /// something fails. Never blocks.
    pub fn pump(&mut self, env: &PumpEnv<'_>) -> PumpOutcome {
        while self.input.is_ready_for_more_data() {
            let Some(sample) = self.output.pull_next_sample() else {
                if let Some(outcome) = self.check_sides(env) {
                    return outcome;
                }
                self.input.mark_finished();
                tracing::debug!(
                    track = %self.kind,
                    appended = self.appended,
                    "Track exhausted"
                );
                return PumpOutcome::Exhausted;
            };

            if let Some(outcome) = self.check_sides(env) {
                return outcome;
            }

            let result = match self.kind {
                TrackKind::Video => self.push_video(env, sample),
                TrackKind::Audio => self.push_direct(env, sample),
            };
            if let Err(err) = result {
                return PumpOutcome::Failed(err);
            }
            self.appended += 1;
        }

        tracing::trace!(track = %self.kind, appended = self.appended, "Input busy, suspending");
        PumpOutcome::Suspended
    }

    /// `Some` when either side has left the active state.
    fn check_sides(&self, env: &PumpEnv<'_>) -> Option<PumpOutcome> {
        let writer = env.writer.status();
        let reader = env.reader.status();

        if writer == WriterStatus::Failed {
            return Some(PumpOutcome::Failed(Self::append_error(env, "Writer failed")));
        }
        if reader == ReaderStatus::Failed {
            return Some(PumpOutcome::Failed(match env.reader.error() {
                Some(err) => ExportError::ReadFailure(err),
                None => ExportError::read_unspecified("Reader failed"),
            }));
        }
        if writer != WriterStatus::Active {
            return Some(PumpOutcome::Aborted);
        }
        // A reader that completed has handed out its last sample; only the
        // in-flight states count as stopped.
        if matches!(reader, ReaderStatus::Idle | ReaderStatus::Cancelled) {
            return Some(PumpOutcome::Aborted);
        }
        None
    }

    fn push_video(&self, env: &PumpEnv<'_>, sample: Sample) -> Result<(), ExportError> {
        let relative = sample.presentation_time - self.start_offset;
        self.progress.observe(relative.seconds(), self.duration_secs);

        let Some(stage) = &self.video_stage else {
            return self.push_direct(env, sample);
        };
        let Some(input_frame) = sample.frame() else {
            return Err(ExportError::read_unspecified(
                "Video output produced a non-video sample",
            ));
        };

        let mut output = match &stage.pool {
            Some(pool) => pool.acquire_buffer().map_err(ExportError::WriteFailure)?,
            None => {
                return Err(ExportError::write_unspecified(
                    "Video input has no frame buffer pool",
                ))
            }
        };

        invoke_hook(
            stage.hook.as_ref(),
            env.session,
            input_frame,
            relative,
            &mut output,
        )?;

        if self.input.append(Sample::video(relative, output)) {
            Ok(())
        } else {
            Err(Self::append_error(env, "Failed to append transformed frame"))
        }
    }

    fn push_direct(&self, env: &PumpEnv<'_>, sample: Sample) -> Result<(), ExportError> {
        if self.input.append(sample) {
            Ok(())
        } else {
            Err(Self::append_error(env, "Failed to append sample"))
        }
    }

    fn append_error(env: &PumpEnv<'_>, context: &str) -> ExportError {
        match env.writer.error() {
            Some(err) => ExportError::WriteFailure(err),
            None => ExportError::write_unspecified(context),
        }
    }
}

impl std::fmt::Debug for TrackPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackPump")
            .field("kind", &self.kind)
            .field("start_offset", &self.start_offset)
            .field("duration_secs", &self.duration_secs)
            .field("hooked", &self.video_stage.is_some())
            .field("appended", &self.appended)
            .finish()
    }
}
