#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clipexport_export_engine::synthetic::{SyntheticAsset, SyntheticBackend, SyntheticBehavior};
use clipexport_export_engine::{ExportConfig, ExportSession};
use clipexport_media_model::{MediaAsset, MediaTime, Size};
use crossbeam_channel::Receiver;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// One second of 32x18 video at 10 fps plus stereo audio.
pub fn av_asset() -> Arc<dyn MediaAsset> {
    Arc::new(
        SyntheticAsset::new(MediaTime::new(1, 1))
            .with_video(Size::new(32.0, 18.0), 10.0)
            .with_audio(),
    )
}

pub fn video_asset() -> Arc<dyn MediaAsset> {
    Arc::new(SyntheticAsset::new(MediaTime::new(1, 1)).with_video(Size::new(32.0, 18.0), 10.0))
}

pub fn audio_asset() -> Arc<dyn MediaAsset> {
    Arc::new(SyntheticAsset::new(MediaTime::new(1, 1)).with_audio())
}

pub fn output_path(dir: &Path) -> PathBuf {
    dir.join("exports").join("clip.mp4")
}

pub fn session_with(behavior: SyntheticBehavior) -> (ExportSession, Arc<SyntheticBackend>) {
    clipexport_common::logging::init_test_logging();
    let backend = Arc::new(SyntheticBackend::new(behavior));
    let session = ExportSession::new(backend.clone());
    (session, backend)
}

pub fn configured(
    behavior: SyntheticBehavior,
    asset: Arc<dyn MediaAsset>,
    target: &Path,
) -> (ExportSession, Arc<SyntheticBackend>) {
    let (session, backend) = session_with(behavior);
    session.configure(ExportConfig::new(asset).with_output_target(target));
    (session, backend)
}

/// Completion callback that counts invocations and signals a channel.
pub struct CallbackProbe {
    pub count: Arc<AtomicUsize>,
    pub fired: Receiver<()>,
}

impl CallbackProbe {
    pub fn start(session: &ExportSession) -> Self {
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, fired) = crossbeam_channel::unbounded();
        let counter = Arc::clone(&count);
        session.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        });
        Self { count, fired }
    }

    pub fn wait(&self) {
        self.fired
            .recv_timeout(TIMEOUT)
            .expect("completion callback should fire");
    }

    pub fn calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Poll `condition` until it holds or the timeout elapses.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
