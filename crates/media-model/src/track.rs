//! Track descriptions and the media asset capability.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::MediaTime;
use crate::transform::{AffineTransform, Size};

/// Kind of timed stream inside an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub const ALL: [TrackKind; 2] = [TrackKind::Video, TrackKind::Audio];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Track identifier, unique within the asset.
    pub id: u32,

    pub kind: TrackKind,

    /// Natural frame size (video only; zero for audio).
    pub natural_size: Size,

    /// Nominal frame rate; 0.0 when unknown.
    pub nominal_frame_rate: f64,

    /// Orientation transform the track should be displayed with.
    pub preferred_transform: AffineTransform,
}

impl TrackInfo {
    pub fn video(id: u32, natural_size: Size, nominal_frame_rate: f64) -> Self {
        Self {
            id,
            kind: TrackKind::Video,
            natural_size,
            nominal_frame_rate,
            preferred_transform: AffineTransform::IDENTITY,
        }
    }

    pub fn audio(id: u32) -> Self {
        Self {
            id,
            kind: TrackKind::Audio,
            natural_size: Size::ZERO,
            nominal_frame_rate: 0.0,
            preferred_transform: AffineTransform::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: AffineTransform) -> Self {
        self.preferred_transform = transform;
        self
    }
}

/// A multi-track media source.
pub trait MediaAsset: Send + Sync {
    /// Natural duration of the asset.
    fn duration(&self) -> MediaTime;

    /// All tracks, in container order.
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Tracks of one kind, in container order.
    fn tracks_of_kind(&self, kind: TrackKind) -> Vec<TrackInfo> {
        self.tracks()
            .into_iter()
            .filter(|track| track.kind == kind)
            .collect()
    }

    /// The first track of a kind; the export uses at most one per kind.
    fn first_track(&self, kind: TrackKind) -> Option<TrackInfo> {
        self.tracks().into_iter().find(|track| track.kind == kind)
    }
}
