//! Collaborator contracts: the decoding source, the encoding sink, and the
//! output store.
//!
//! The export engine never decodes or encodes anything itself. It drives
//! implementations of these traits, which wrap whatever media framework
//! the host platform provides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipexport_common::error::MediaError;
use clipexport_media_model::{
    AudioSettings, ContainerKind, FrameBuffer, MediaAsset, MediaTime, Sample, Size, TimeRange,
    TrackInfo, TrackKind, VideoComposition, VideoSettings,
};

/// Push notification from a sink input meaning "ready for more data".
pub type ReadinessNotifier = Arc<dyn Fn() + Send + Sync>;

/// Invoked once a sink has finished committing its output.
pub type FinishCallback = Box<dyn FnOnce() + Send>;

/// Lifecycle of a source reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStatus {
    Idle,
    Active,
    Completed,
    Failed,
    Cancelled,
}

/// Lifecycle of a sink writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterStatus {
    Idle,
    Active,
    Completed,
    Failed,
    Cancelled,
}

/// Everything a sink needs to create its output.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    pub target: PathBuf,
    pub container: ContainerKind,
    /// Lay the file out for progressive download.
    pub optimize_for_streaming: bool,
    /// Key-value metadata attached to the container.
    pub metadata: BTreeMap<String, String>,
}

/// Factory for readers and writers.
pub trait MediaBackend: Send + Sync {
    /// Open a reader over `time_range` of `asset`.
    fn open_reader(
        &self,
        asset: Arc<dyn MediaAsset>,
        time_range: TimeRange,
    ) -> Result<Arc<dyn SourceReader>, MediaError>;

    /// Open a writer for the configured target.
    fn open_writer(&self, config: &WriterConfig) -> Result<Arc<dyn SinkWriter>, MediaError>;

    /// Backend name, for logs.
    fn name(&self) -> &str;
}

/// Demuxing + decoding side of the pipeline.
pub trait SourceReader: Send + Sync {
    fn status(&self) -> ReaderStatus;

    /// The error that moved the reader to `Failed`, if any.
    fn error(&self) -> Option<MediaError>;

    /// Add an output producing video frames rendered through `composition`.
    fn add_video_output(
        &self,
        track: &TrackInfo,
        composition: &VideoComposition,
    ) -> Result<Box<dyn TrackOutput>, MediaError>;

    /// Add an output producing decoded audio in the layout of `settings`.
    fn add_audio_output(
        &self,
        track: &TrackInfo,
        settings: &AudioSettings,
    ) -> Result<Box<dyn TrackOutput>, MediaError>;

    fn begin_reading(&self) -> Result<(), MediaError>;

    /// Abort reading. Best effort; never fails.
    fn cancel_reading(&self);
}

/// Per-track output port of a reader.
pub trait TrackOutput: Send {
    /// Next decoded sample, or `None` when the track is exhausted or the
    /// reader has stopped. Never blocks.
    fn pull_next_sample(&mut self) -> Option<Sample>;
}

/// Encoding + muxing side of the pipeline.
pub trait SinkWriter: Send + Sync {
    fn status(&self) -> WriterStatus;

    /// The error that moved the writer to `Failed`, if any.
    fn error(&self) -> Option<MediaError>;

    /// Add a video input whose buffer pool produces `render_size` frames.
    fn add_video_input(
        &self,
        settings: &VideoSettings,
        render_size: Size,
    ) -> Result<Arc<dyn TrackInput>, MediaError>;

    fn add_audio_input(&self, settings: &AudioSettings) -> Result<Arc<dyn TrackInput>, MediaError>;

    fn begin_writing(&self) -> Result<(), MediaError>;

    /// Anchor the output timeline at `at`.
    fn start_session(&self, at: MediaTime);

    /// Commit the output; `on_done` runs once the writer reaches a terminal
    /// status, successful or not.
    fn finish_writing(&self, on_done: FinishCallback);

    /// Abort writing. Best effort; never fails.
    fn cancel_writing(&self);
}

/// Per-track input port of a writer.
pub trait TrackInput: Send + Sync {
    fn kind(&self) -> TrackKind;

    /// Non-blocking backpressure poll.
    fn is_ready_for_more_data(&self) -> bool;

    /// Hand one sample to the encoder. `false` means the append failed.
    fn append(&self, sample: Sample) -> bool;

    /// No more samples will be appended to this input.
    fn mark_finished(&self);

    /// Register the notifier invoked every time the input becomes ready.
    fn request_media_data_when_ready(&self, notifier: ReadinessNotifier);

    /// Pool of output buffers sized to the render size (video inputs).
    fn frame_buffer_pool(&self) -> Option<Arc<dyn FrameBufferPool>> {
        None
    }
}

/// Source of reusable output pixel buffers.
pub trait FrameBufferPool: Send + Sync {
    fn acquire_buffer(&self) -> Result<FrameBuffer, MediaError>;
}

/// Removes discarded output.
pub trait OutputStore: Send + Sync {
    /// Delete `path` if it exists. Returns whether something was removed.
    fn remove_if_exists(&self, path: &Path) -> std::io::Result<bool>;
}

/// [`OutputStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOutputStore;

impl OutputStore for FsOutputStore {
    fn remove_if_exists(&self, path: &Path) -> std::io::Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_store_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-written.mp4");
        assert!(!FsOutputStore.remove_if_exists(&path).unwrap());
    }

    #[test]
    fn test_fs_store_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.mp4");
        std::fs::write(&path, b"moov").unwrap();
        assert!(FsOutputStore.remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
