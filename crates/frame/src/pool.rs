use crate::buffer::{FrameBuffer, FrameRef};
use common::Result;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Idle buffers kept for reuse: four in flight plus two spare.
pub const FRAME_POOL_SIZE: usize = 6;

/// Bounded free-list of [`FrameBuffer`]s shared by the device callback and the
/// pipeline threads. The lock is held only while pushing or popping.
#[derive(Debug)]
pub struct FramePool {
    idle: Mutex<Vec<FrameBuffer>>,
    capacity: usize,
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new(FRAME_POOL_SIZE)
    }
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    fn idle(&self) -> MutexGuard<'_, Vec<FrameBuffer>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate buffers of `bytes` until the pool is full.
    pub fn prefill(&self, bytes: usize) -> Result<()> {
        let missing = self.capacity.saturating_sub(self.idle_count());
        let mut fresh = Vec::with_capacity(missing);
        for _ in 0..missing {
            fresh.push(FrameBuffer::with_capacity(bytes)?);
        }
        let mut idle = self.idle();
        for frame in fresh {
            if idle.len() >= self.capacity {
                break;
            }
            idle.push(frame);
        }
        Ok(())
    }

    /// Take an idle buffer (or allocate one) with a payload of exactly `min_bytes`.
    pub fn acquire(&self, min_bytes: usize) -> Result<FrameBuffer> {
        let reused = self.idle().pop();
        let mut frame = match reused {
            Some(frame) => frame,
            None => {
                tracing::trace!(bytes = min_bytes, "Frame pool empty, allocating");
                FrameBuffer::with_capacity(min_bytes)?
            }
        };
        frame.ensure_size(min_bytes)?;
        Ok(frame)
    }

    /// Return a buffer to the pool, or free it when the pool is full.
    pub fn release(&self, frame: FrameBuffer) {
        if !frame.owns_storage() {
            return;
        }
        let mut idle = self.idle();
        if idle.len() < self.capacity {
            idle.push(frame);
        }
    }

    /// Copy a transient frame into a pooled buffer.
    pub fn duplicate(&self, src: &FrameRef<'_>) -> Result<FrameBuffer> {
        let mut frame = self.acquire(src.data.len())?;
        match frame.copy_from(src) {
            Ok(()) => Ok(frame),
            Err(e) => {
                self.release(frame);
                Err(e)
            }
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.idle().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FrameInfo;
    use crate::format::PixelFormat;
    use std::sync::Arc;
    use std::thread;

    // ===== Capacity =====

    #[test]
    fn test_pool_never_exceeds_capacity() {
        let pool = FramePool::new(FRAME_POOL_SIZE);
        let frames: Vec<_> = (0..10).map(|_| pool.acquire(32).unwrap()).collect();
        for frame in frames {
            pool.release(frame);
            assert!(
                pool.idle_count() <= FRAME_POOL_SIZE,
                "Pool grew beyond its capacity"
            );
        }
        assert_eq!(pool.idle_count(), FRAME_POOL_SIZE);
    }

    #[test]
    fn test_acquire_always_satisfies_request() {
        let pool = FramePool::new(2);
        pool.prefill(16).unwrap();
        for request in [0usize, 8, 16, 100, 4096, 3] {
            let frame = pool.acquire(request).unwrap();
            assert!(frame.capacity() >= request);
            assert_eq!(frame.len(), request);
            pool.release(frame);
        }
    }

    #[test]
    fn test_prefill_and_reuse() {
        let pool = FramePool::new(3);
        pool.prefill(640 * 480 * 4).unwrap();
        assert_eq!(pool.idle_count(), 3);

        let frame = pool.acquire(100).unwrap();
        assert_eq!(pool.idle_count(), 2);
        assert!(
            frame.capacity() >= 640 * 480 * 4,
            "Reused buffer keeps its larger storage"
        );
        pool.release(frame);
        assert_eq!(pool.idle_count(), 3);

        pool.clear();
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_borrowed_storage_is_not_pooled() {
        let pool = FramePool::new(2);
        let info = FrameInfo::new(2, 1, PixelFormat::Yuyv);
        pool.release(FrameBuffer::from_storage(vec![0; 4], info));
        assert_eq!(pool.idle_count(), 0);
    }

    // ===== Duplication =====

    #[test]
    fn test_duplicate_then_release_keeps_bytes() {
        let pool = FramePool::new(2);
        let bytes: Vec<u8> = (0..=255).collect();
        let info = FrameInfo::new(128, 1, PixelFormat::Yuyv);
        let dup = pool.duplicate(&FrameRef::new(info, &bytes)).unwrap();

        let recycled = pool.acquire(8).unwrap();
        pool.release(recycled);

        assert_eq!(dup.data(), &bytes[..]);
        assert_eq!(dup.info, info);
    }

    // ===== Concurrency =====

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(FramePool::new(FRAME_POOL_SIZE));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..200 {
                        let frame = pool.acquire(64 + t * 8 + i % 7).unwrap();
                        pool.release(frame);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle_count() <= FRAME_POOL_SIZE);
    }
}
