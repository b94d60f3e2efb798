//! Decoded media samples.

use crate::time::MediaTime;
use crate::track::TrackKind;

/// Bytes per pixel of the BGRA layout used for every frame buffer.
pub const BYTES_PER_PIXEL: usize = 4;

/// A BGRA pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// A zero-filled buffer with a tightly packed stride.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    /// A buffer filled with one BGRA color.
    pub fn filled(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let mut buffer = Self::new(width, height);
        buffer.fill(bgra);
        buffer
    }

    pub fn fill(&mut self, bgra: [u8; 4]) {
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&bgra);
        }
    }

    /// The BGRA value at `(x, y)`, if inside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        let px = self.data.get(offset..offset + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A chunk of interleaved PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples, `frames * channels` long.
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; frames * channels as usize],
        }
    }

    /// Number of sample frames (one value per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Payload of a decoded sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplePayload {
    Video(FrameBuffer),
    Audio(AudioChunk),
}

/// One decoded unit of media with its presentation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub presentation_time: MediaTime,
    pub payload: SamplePayload,
}

impl Sample {
    pub fn video(presentation_time: MediaTime, frame: FrameBuffer) -> Self {
        Self {
            presentation_time,
            payload: SamplePayload::Video(frame),
        }
    }

    pub fn audio(presentation_time: MediaTime, chunk: AudioChunk) -> Self {
        Self {
            presentation_time,
            payload: SamplePayload::Audio(chunk),
        }
    }

    pub fn kind(&self) -> TrackKind {
        match self.payload {
            SamplePayload::Video(_) => TrackKind::Video,
            SamplePayload::Audio(_) => TrackKind::Audio,
        }
    }

    /// The pixel buffer of a video sample.
    pub fn frame(&self) -> Option<&FrameBuffer> {
        match &self.payload {
            SamplePayload::Video(frame) => Some(frame),
            SamplePayload::Audio(_) => None,
        }
    }

    /// Consume a video sample, returning its pixel buffer.
    pub fn into_frame(self) -> Option<FrameBuffer> {
        match self.payload {
            SamplePayload::Video(frame) => Some(frame),
            SamplePayload::Audio(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_buffer_pixels() {
        let buffer = FrameBuffer::filled(4, 2, [1, 2, 3, 255]);
        assert_eq!(buffer.data.len(), 4 * 2 * BYTES_PER_PIXEL);
        assert_eq!(buffer.pixel(3, 1), Some([1, 2, 3, 255]));
        assert_eq!(buffer.pixel(4, 0), None);
    }

    #[test]
    fn test_sample_kind_and_frame_access() {
        let video = Sample::video(MediaTime::ZERO, FrameBuffer::new(2, 2));
        assert_eq!(video.kind(), TrackKind::Video);
        assert!(video.frame().is_some());

        let audio = Sample::audio(MediaTime::ZERO, AudioChunk::silence(48_000, 2, 1024));
        assert_eq!(audio.kind(), TrackKind::Audio);
        assert!(audio.clone().into_frame().is_none());
        if let SamplePayload::Audio(chunk) = audio.payload {
            assert_eq!(chunk.frames(), 1024);
        }
    }
}
