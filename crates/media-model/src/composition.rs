//! Video composition instructions.
//!
//! A composition tells the source how to render decoded video frames into
//! the output frame: at what size, at what cadence, and with which
//! transform over which stretch of time.

use clipexport_common::error::{ExportError, ExportResult};
use serde::{Deserialize, Serialize};

use crate::time::{MediaTime, TimeRange};
use crate::transform::{AffineTransform, Size};

/// Transform applied to the (single) source layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerInstruction {
    /// Track the layer is drawn from.
    pub track_id: u32,
    /// Transform in effect from the start of the instruction.
    pub transform: AffineTransform,
}

/// One time slice of a composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionInstruction {
    pub time_range: TimeRange,
    pub layers: Vec<LayerInstruction>,
}

/// How decoded video is rendered into output frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoComposition {
    /// Duration of one output frame.
    pub frame_duration: MediaTime,
    /// Size of every output frame.
    pub render_size: Size,
    pub instructions: Vec<CompositionInstruction>,
}

impl VideoComposition {
    /// Output frames per second.
    pub fn frame_rate(&self) -> f64 {
        let secs = self.frame_duration.seconds();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }

    /// The instruction covering `time`, if any.
    pub fn instruction_at(&self, time: MediaTime) -> Option<&CompositionInstruction> {
        self.instructions
            .iter()
            .find(|instruction| instruction.time_range.contains(time))
    }

    /// Reject compositions a source could not render.
    pub fn validate(&self) -> ExportResult<()> {
        if !self.render_size.is_drawable() {
            return Err(ExportError::configuration(format!(
                "Composition render size {}x{} is not drawable",
                self.render_size.width, self.render_size.height
            )));
        }
        if self.frame_duration.value <= 0 {
            return Err(ExportError::configuration(
                "Composition frame duration must be positive",
            ));
        }
        if self.instructions.is_empty() {
            return Err(ExportError::configuration(
                "Composition has no instructions",
            ));
        }
        Ok(())
    }
}
