//! clipexport Export Engine
//!
//! Exports a time range of a video + audio asset into a new container,
//! optionally passing every decoded video frame through a caller hook.
//!
//! # Pipeline Architecture
//!
//! ```text
//!                 ┌──────────────────── worker queue (one thread) ───────────────────┐
//!                 │                                                                   │
//! SourceReader ── video output ── TrackPump ── FrameTransformHook ── video input ──┐ │
//!      │                              │                                             │ │
//!      └──────── audio output ── TrackPump ──────────────────────── audio input ──┤ │
//!                                     │                                             │ │
//!                                     ▼                                             ▼ │
//!                          CompletionCoordinator ── finalize ── commit / discard ─ SinkWriter
//!                 │                                                                   │
//!                 └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sink pushes "ready for more data" notifications; each one schedules
//! a single pump iteration on the export's worker queue. The coordinator
//! joins the two tracks' completion and triggers finalize exactly once.

pub mod backend;
pub mod coordinator;
pub mod geometry;
pub mod hook;
pub mod pool;
pub mod progress;
pub mod pump;
pub mod queue;
pub mod session;
pub mod synthetic;

pub use backend::*;
pub use geometry::{build_default_composition, compute_render_geometry, RenderGeometry};
pub use hook::{FrameTransformHook, HookError};
pub use session::*;
