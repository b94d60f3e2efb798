//! Joins the completion of the video and audio tracks.

use clipexport_media_model::TrackKind;
use parking_lot::Mutex;

/// Completion state of one export attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionFlags {
    pub video_done: bool,
    pub audio_done: bool,
    /// Set once some caller has been told to finalize.
    pub finalize_claimed: bool,
}

impl CompletionFlags {
    fn settled(&self) -> bool {
        self.video_done && self.audio_done
    }

    fn set(&mut self, kind: TrackKind) {
        match kind {
            TrackKind::Video => self.video_done = true,
            TrackKind::Audio => self.audio_done = true,
        }
    }
}

/// Decides when the export finalizes. Every `true` returned by this type
/// is returned exactly once per attempt.
#[derive(Debug, Default)]
pub struct CompletionCoordinator {
    flags: Mutex<CompletionFlags>,
}

impl CompletionCoordinator {
    /// Track kinds that are not expected start out done.
    pub fn new(expect_video: bool, expect_audio: bool) -> Self {
        Self {
            flags: Mutex::new(CompletionFlags {
                video_done: !expect_video,
                audio_done: !expect_audio,
                finalize_claimed: false,
            }),
        }
    }

    /// A track drained normally. Returns `true` if the caller must finalize.
    pub fn mark_done(&self, kind: TrackKind) -> bool {
        let mut flags = self.flags.lock();
        flags.set(kind);
        Self::try_claim(&mut flags)
    }

    /// A track failed; the other one is abandoned. Returns `true` if the
    /// caller must finalize.
    pub fn mark_failed(&self, _kind: TrackKind) -> bool {
        let mut flags = self.flags.lock();
        flags.video_done = true;
        flags.audio_done = true;
        Self::try_claim(&mut flags)
    }

    /// Claim finalize if nothing is outstanding (an export with no tracks).
    pub fn claim_if_settled(&self) -> bool {
        let mut flags = self.flags.lock();
        Self::try_claim(&mut flags)
    }

    /// Unconditionally take the finalize claim. Returns `false` if someone
    /// already had it.
    pub fn claim(&self) -> bool {
        let mut flags = self.flags.lock();
        flags.video_done = true;
        flags.audio_done = true;
        !std::mem::replace(&mut flags.finalize_claimed, true)
    }

    pub fn is_done(&self, kind: TrackKind) -> bool {
        let flags = self.flags.lock();
        match kind {
            TrackKind::Video => flags.video_done,
            TrackKind::Audio => flags.audio_done,
        }
    }

    pub fn flags(&self) -> CompletionFlags {
        *self.flags.lock()
    }

    fn try_claim(flags: &mut CompletionFlags) -> bool {
        if flags.settled() && !flags.finalize_claimed {
            flags.finalize_claimed = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_both_tracks_finalize_once() {
        let coordinator = CompletionCoordinator::new(true, true);
        assert!(!coordinator.mark_done(TrackKind::Video));
        assert!(coordinator.mark_done(TrackKind::Audio));
        assert!(!coordinator.mark_done(TrackKind::Audio));
        assert!(!coordinator.claim_if_settled());
    }

    #[test]
    fn test_absent_track_is_presatisfied() {
        let coordinator = CompletionCoordinator::new(true, false);
        assert!(coordinator.is_done(TrackKind::Audio));
        assert!(coordinator.mark_done(TrackKind::Video));
    }

    #[test]
    fn test_no_tracks_settles_immediately() {
        let coordinator = CompletionCoordinator::new(false, false);
        assert!(coordinator.claim_if_settled());
        assert!(!coordinator.claim_if_settled());
    }

    #[test]
    fn test_failure_settles_both_tracks() {
        let coordinator = CompletionCoordinator::new(true, true);
        assert!(coordinator.mark_failed(TrackKind::Video));
        assert!(coordinator.is_done(TrackKind::Audio));
        assert!(!coordinator.mark_done(TrackKind::Audio));
    }

    #[test]
    fn test_cancel_claim_preempts_finalize() {
        let coordinator = CompletionCoordinator::new(true, true);
        assert!(coordinator.claim());
        assert!(!coordinator.mark_done(TrackKind::Video));
        assert!(!coordinator.mark_done(TrackKind::Audio));
        assert!(!coordinator.claim());
    }

    #[test]
    fn test_concurrent_signals_finalize_once() {
        for _ in 0..64 {
            let coordinator = Arc::new(CompletionCoordinator::new(true, true));
            let finalized = Arc::new(AtomicUsize::new(0));
            let handles: Vec<_> = [TrackKind::Video, TrackKind::Audio, TrackKind::Video]
                .into_iter()
                .map(|kind| {
                    let coordinator = Arc::clone(&coordinator);
                    let finalized = Arc::clone(&finalized);
                    std::thread::spawn(move || {
                        if coordinator.mark_done(kind) {
                            finalized.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            assert_eq!(finalized.load(Ordering::SeqCst), 1);
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Signal {
        Done(TrackKind),
        Failed(TrackKind),
        Settled,
    }

    fn signal() -> impl Strategy<Value = Signal> {
        let kind = prop_oneof![Just(TrackKind::Video), Just(TrackKind::Audio)];
        prop_oneof![
            kind.clone().prop_map(Signal::Done),
            kind.prop_map(Signal::Failed),
            Just(Signal::Settled),
        ]
    }

    proptest! {
        #[test]
        fn prop_finalize_at_most_once(
            expect_video in any::<bool>(),
            expect_audio in any::<bool>(),
            signals in prop::collection::vec(signal(), 0..12),
        ) {
            let coordinator = CompletionCoordinator::new(expect_video, expect_audio);
            let mut claims = 0;
            for signal in &signals {
                let claimed = match *signal {
                    Signal::Done(kind) => coordinator.mark_done(kind),
                    Signal::Failed(kind) => coordinator.mark_failed(kind),
                    Signal::Settled => coordinator.claim_if_settled(),
                };
                if claimed {
                    claims += 1;
                }
            }
            prop_assert!(claims <= 1);

            // Once every expected track has reported, finalize must have happened.
            let flags = coordinator.flags();
            if flags.video_done && flags.audio_done {
                let late = coordinator.claim_if_settled();
                prop_assert_eq!(claims + usize::from(late), 1);
            }
        }
    }
}
