//! Per-frame interception.
//!
//! A hook receives every decoded video frame together with its timestamp
//! (relative to the start of the exported range) and fills a buffer taken
//! from the sink's pool. The filled buffer is what gets encoded.

use std::panic::{self, AssertUnwindSafe};

use clipexport_common::error::ExportError;
use clipexport_media_model::{FrameBuffer, MediaTime};

use crate::session::ExportSession;

/// Error returned by a [`FrameTransformHook`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Caller-supplied per-frame transform.
///
/// Called synchronously on the export's worker thread. The hook must fill
/// `output` completely; its previous contents are whatever the pool last
/// held.
pub trait FrameTransformHook: Send + Sync {
    fn transform_frame(
        &self,
        session: &ExportSession,
        input: &FrameBuffer,
        presentation_time: MediaTime,
        output: &mut FrameBuffer,
    ) -> Result<(), HookError>;
}

impl<F> FrameTransformHook for F
where
    F: Fn(&ExportSession, &FrameBuffer, MediaTime, &mut FrameBuffer) -> Result<(), HookError>
        + Send
        + Sync,
{
    fn transform_frame(
        &self,
        session: &ExportSession,
        input: &FrameBuffer,
        presentation_time: MediaTime,
        output: &mut FrameBuffer,
    ) -> Result<(), HookError> {
        self(session, input, presentation_time, output)
    }
}

/// Hook that copies the decoded frame into the output buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyFrameHook;

impl FrameTransformHook for CopyFrameHook {
    fn transform_frame(
        &self,
        _session: &ExportSession,
        input: &FrameBuffer,
        _presentation_time: MediaTime,
        output: &mut FrameBuffer,
    ) -> Result<(), HookError> {
        copy_frame(input, output)
    }
}

/// Copy `input` into `output` row by row. Sizes must match.
pub fn copy_frame(input: &FrameBuffer, output: &mut FrameBuffer) -> Result<(), HookError> {
    if input.dimensions() != output.dimensions() {
        return Err(HookError::new(format!(
            "Frame size mismatch: input {}x{}, output {}x{}",
            input.width, input.height, output.width, output.height
        )));
    }
    let row_bytes = input.width as usize * clipexport_media_model::BYTES_PER_PIXEL;
    for row in 0..input.height as usize {
        let src = input
            .data
            .get(row * input.stride..row * input.stride + row_bytes);
        let dst = output
            .data
            .get_mut(row * output.stride..row * output.stride + row_bytes);
        match (src, dst) {
            (Some(src), Some(dst)) => dst.copy_from_slice(src),
            _ => return Err(HookError::new("Frame buffer shorter than its stride")),
        }
    }
    Ok(())
}

/// Run `hook`, turning both errors and panics into [`ExportError::HookFailure`].
pub(crate) fn invoke_hook(
    hook: &dyn FrameTransformHook,
    session: &ExportSession,
    input: &FrameBuffer,
    presentation_time: MediaTime,
    output: &mut FrameBuffer,
) -> Result<(), ExportError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        hook.transform_frame(session, input, presentation_time, output)
    }));
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ExportError::hook(err.message)),
        Err(payload) => Err(ExportError::hook(format!(
            "Frame hook panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
