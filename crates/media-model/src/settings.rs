//! Typed encode settings and container kinds.
//!
//! Settings are plain data; they are validated when an export starts,
//! not when they are built.

use std::str::FromStr;

use clipexport_common::config::ExportDefaults;
use clipexport_common::error::{ExportError, ExportResult};
use serde::{Deserialize, Serialize};

/// Frame rate used when neither the settings nor the track provide one.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    #[default]
    Mp4,
    Mov,
    M4v,
    M4a,
}

impl ContainerKind {
    pub fn extension(self) -> &'static str {
        match self {
            ContainerKind::Mp4 => "mp4",
            ContainerKind::Mov => "mov",
            ContainerKind::M4v => "m4v",
            ContainerKind::M4a => "m4a",
        }
    }

    /// Whether the container can carry a video track.
    pub fn supports_video(self) -> bool {
        !matches!(self, ContainerKind::M4a)
    }
}

impl FromStr for ContainerKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(ContainerKind::Mp4),
            "mov" => Ok(ContainerKind::Mov),
            "m4v" => Ok(ContainerKind::M4v),
            "m4a" => Ok(ContainerKind::M4a),
            other => Err(ExportError::configuration(format!(
                "Unknown container: {other}. Use: mp4, mov, m4v, m4a"
            ))),
        }
    }
}

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    Hevc,
}

impl FromStr for VideoCodec {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Ok(VideoCodec::H264),
            "hevc" | "h265" => Ok(VideoCodec::Hevc),
            other => Err(ExportError::configuration(format!(
                "Unknown video codec: {other}. Use: h264, hevc"
            ))),
        }
    }
}

/// Audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Aac,
    Pcm,
}

impl FromStr for AudioCodec {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aac" => Ok(AudioCodec::Aac),
            "pcm" | "lpcm" => Ok(AudioCodec::Pcm),
            other => Err(ExportError::configuration(format!(
                "Unknown audio codec: {other}. Use: aac, pcm"
            ))),
        }
    }
}

/// Encode settings for the video track.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub codec: VideoCodec,

    /// Output width; defaults to the track's render width.
    pub width: Option<u32>,

    /// Output height; defaults to the track's render height.
    pub height: Option<u32>,

    /// Frame rate override; defaults to the track's nominal rate.
    pub frame_rate: Option<f64>,

    /// Average bitrate in bits per second; encoder default when unset.
    pub bitrate_bps: Option<u32>,

    /// Maximum distance between keyframes, in frames.
    pub max_keyframe_interval: Option<u32>,
}

impl VideoSettings {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Build settings from the application's export defaults.
    pub fn from_defaults(defaults: &ExportDefaults) -> ExportResult<Self> {
        Ok(Self {
            codec: defaults.video_codec.parse()?,
            width: Some(defaults.width),
            height: Some(defaults.height),
            frame_rate: None,
            bitrate_bps: Some(defaults.video_bitrate_bps),
            max_keyframe_interval: None,
        })
    }

    /// Frame rate to encode at, given the track's nominal rate.
    pub fn effective_frame_rate(&self, nominal: f64) -> f64 {
        [self.frame_rate, Some(nominal)]
            .into_iter()
            .flatten()
            .find(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(FALLBACK_FRAME_RATE)
    }

    pub fn validate(&self) -> ExportResult<()> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(ExportError::configuration(
                "Video width and height must be positive",
            ));
        }
        if self.width.is_some() != self.height.is_some() {
            return Err(ExportError::configuration(
                "Video width and height must be set together",
            ));
        }
        if let Some(rate) = self.frame_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ExportError::configuration(format!(
                    "Invalid video frame rate: {rate}"
                )));
            }
        }
        if self.bitrate_bps == Some(0) {
            return Err(ExportError::configuration("Video bitrate must be positive"));
        }
        if self.max_keyframe_interval == Some(0) {
            return Err(ExportError::configuration(
                "Keyframe interval must be at least one frame",
            ));
        }
        Ok(())
    }
}

/// Encode settings for the audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub codec: AudioCodec,
    pub sample_rate: u32,
    pub channels: u16,
    pub bitrate_bps: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Aac,
            sample_rate: 44_100,
            channels: 2,
            bitrate_bps: 128_000,
        }
    }
}

impl AudioSettings {
    /// Build settings from the application's export defaults.
    pub fn from_defaults(defaults: &ExportDefaults) -> ExportResult<Self> {
        Ok(Self {
            codec: defaults.audio_codec.parse()?,
            sample_rate: defaults.audio_sample_rate,
            channels: defaults.audio_channels,
            bitrate_bps: defaults.audio_bitrate_bps,
        })
    }

    pub fn validate(&self) -> ExportResult<()> {
        if self.sample_rate == 0 {
            return Err(ExportError::configuration("Audio sample rate must be positive"));
        }
        if self.channels == 0 {
            return Err(ExportError::configuration(
                "Audio channel count must be positive",
            ));
        }
        if self.codec == AudioCodec::Aac && self.bitrate_bps == 0 {
            return Err(ExportError::configuration("AAC bitrate must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_frame_rate_precedence() {
        let settings = VideoSettings::default();
        assert_eq!(settings.effective_frame_rate(24.0), 24.0);
        assert_eq!(settings.effective_frame_rate(0.0), FALLBACK_FRAME_RATE);

        let overridden = VideoSettings::default().with_frame_rate(60.0);
        assert_eq!(overridden.effective_frame_rate(24.0), 60.0);
    }

    #[test]
    fn test_video_validation() {
        assert!(VideoSettings::default().validate().is_ok());
        assert!(VideoSettings::default().with_size(0, 720).validate().is_err());
        assert!(VideoSettings::default()
            .with_frame_rate(f64::NAN)
            .validate()
            .is_err());

        let half = VideoSettings {
            width: Some(1280),
            ..VideoSettings::default()
        };
        assert!(half.validate().is_err());
    }

    #[test]
    fn test_audio_validation() {
        assert!(AudioSettings::default().validate().is_ok());
        let mono_zero = AudioSettings {
            channels: 0,
            ..AudioSettings::default()
        };
        let err = mono_zero.validate().unwrap_err();
        assert_eq!(err.code(), 1001);
    }

    #[test]
    fn test_from_defaults() {
        let defaults = ExportDefaults::default();
        let video = VideoSettings::from_defaults(&defaults).unwrap();
        assert_eq!(video.width, Some(defaults.width));
        assert_eq!(video.codec, VideoCodec::H264);

        let bad = ExportDefaults {
            audio_codec: "opus".to_string(),
            ..ExportDefaults::default()
        };
        assert!(AudioSettings::from_defaults(&bad).is_err());
    }

    #[test]
    fn test_partial_settings_json_uses_defaults() {
        let settings: AudioSettings = serde_json::from_str(r#"{"channels": 1}"#).unwrap();
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.sample_rate, 44_100);

        let container: ContainerKind = "MOV".parse().unwrap();
        assert_eq!(container.extension(), "mov");
    }
}
