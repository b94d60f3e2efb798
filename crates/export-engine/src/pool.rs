//! Bounded pool of reusable output frame buffers.

use clipexport_common::error::MediaError;
use clipexport_media_model::FrameBuffer;
use parking_lot::Mutex;

use crate::backend::FrameBufferPool;

/// Default number of buffers a pool hands out at once.
pub const DEFAULT_POOL_CAPACITY: usize = 8;

/// A fixed-size pool of BGRA buffers.
///
/// At most `capacity` buffers are outstanding at once; buffers handed back
/// through [`BoundedFramePool::recycle`] are reused instead of reallocated.
#[derive(Debug)]
pub struct BoundedFramePool {
    width: u32,
    height: u32,
    capacity: usize,
    state: Mutex<PoolState>,
}

#[derive(Debug, Default)]
struct PoolState {
    free: Vec<FrameBuffer>,
    outstanding: usize,
    allocated: usize,
}

impl BoundedFramePool {
    pub fn new(width: u32, height: u32, capacity: usize) -> Self {
        Self {
            width,
            height,
            capacity: capacity.max(1),
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Buffers currently handed out.
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Buffers ever allocated (reuse keeps this at or below capacity).
    pub fn allocated(&self) -> usize {
        self.state.lock().allocated
    }

    /// Return a buffer to the pool. Buffers of the wrong size, or handed
    /// back while nothing is outstanding, are dropped.
    pub fn recycle(&self, buffer: FrameBuffer) {
        let mut state = self.state.lock();
        if state.outstanding == 0 {
            return;
        }
        state.outstanding -= 1;
        if buffer.dimensions() == (self.width, self.height) && state.free.len() < self.capacity {
            state.free.push(buffer);
        }
    }
}

impl FrameBufferPool for BoundedFramePool {
    fn acquire_buffer(&self) -> Result<FrameBuffer, MediaError> {
        let mut state = self.state.lock();
        if state.outstanding >= self.capacity {
            return Err(MediaError::new(
                "clipexport.pool",
                1,
                format!("Frame buffer pool exhausted ({} buffers)", self.capacity),
            ));
        }
        state.outstanding += 1;
        if let Some(buffer) = state.free.pop() {
            return Ok(buffer);
        }
        state.allocated += 1;
        Ok(FrameBuffer::new(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_is_bounded() {
        let pool = BoundedFramePool::new(4, 4, 2);
        let a = pool.acquire_buffer().unwrap();
        let _b = pool.acquire_buffer().unwrap();
        assert!(pool.acquire_buffer().is_err());

        pool.recycle(a);
        assert!(pool.acquire_buffer().is_ok());
    }

    #[test]
    fn test_recycled_buffers_are_reused() {
        let pool = BoundedFramePool::new(4, 4, 2);
        for _ in 0..10 {
            let buffer = pool.acquire_buffer().unwrap();
            assert_eq!(buffer.dimensions(), (4, 4));
            pool.recycle(buffer);
        }
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_foreign_buffers_are_not_pooled() {
        let pool = BoundedFramePool::new(4, 4, 2);
        let _ = pool.acquire_buffer().unwrap();
        pool.recycle(FrameBuffer::new(8, 8));
        let reused = pool.acquire_buffer().unwrap();
        assert_eq!(reused.dimensions(), (4, 4));
    }
}
