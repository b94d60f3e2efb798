//! clipexport Media Model
//!
//! Defines the data contracts shared by the export pipeline and its
//! collaborators:
//! - **Time:** Rational media timestamps and time ranges
//! - **Geometry:** Sizes and affine transforms for frame placement
//! - **Tracks:** Track descriptions and the `MediaAsset` capability
//! - **Samples:** Decoded video frames and audio chunks
//! - **Settings:** Typed per-track encode settings and container kinds
//! - **Composition:** Video composition instructions handed to the source

pub mod composition;
pub mod sample;
pub mod settings;
pub mod time;
pub mod track;
pub mod transform;

pub use composition::*;
pub use sample::*;
pub use settings::*;
pub use time::*;
pub use track::*;
pub use transform::*;
