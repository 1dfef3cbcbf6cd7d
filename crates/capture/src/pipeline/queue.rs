use frame::FrameBuffer;
use std::collections::VecDeque;

/// Frames the preview queue holds before the newest is dropped.
pub const MAX_PREVIEW_FRAMES: usize = 4;

/// Bounded FIFO between the frame source and the preview thread.
#[derive(Debug)]
pub struct PreviewQueue {
    frames: VecDeque<FrameBuffer>,
    capacity: usize,
}

impl Default for PreviewQueue {
    fn default() -> Self {
        Self::new(MAX_PREVIEW_FRAMES)
    }
}

impl PreviewQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `frame`, or hand it back when the queue is full.
    pub fn push(&mut self, frame: FrameBuffer) -> Result<(), FrameBuffer> {
        if self.frames.len() >= self.capacity {
            return Err(frame);
        }
        self.frames.push_back(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<FrameBuffer> {
        self.frames.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = FrameBuffer> + '_ {
        self.frames.drain(..)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Single pending frame for the capture thread; a newer frame replaces it.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    frame: Option<FrameBuffer>,
}

impl CaptureSlot {
    /// Store `frame`, returning the one it displaced.
    pub fn replace(&mut self, frame: FrameBuffer) -> Option<FrameBuffer> {
        self.frame.replace(frame)
    }

    pub fn take(&mut self) -> Option<FrameBuffer> {
        self.frame.take()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::{FrameInfo, FramePool, FrameRef, PixelFormat};

    fn tagged(pool: &FramePool, sequence: u32) -> FrameBuffer {
        let info = FrameInfo {
            sequence,
            ..FrameInfo::new(2, 1, PixelFormat::Yuyv)
        };
        pool.duplicate(&FrameRef::new(info, &[sequence as u8; 4]))
            .unwrap()
    }

    // ===== Preview queue =====

    #[test]
    fn test_fifth_frame_is_rejected() {
        let pool = FramePool::default();
        let mut queue = PreviewQueue::default();

        for seq in 0..4 {
            assert!(queue.push(tagged(&pool, seq)).is_ok());
        }
        let rejected = queue
            .push(tagged(&pool, 4))
            .expect_err("A full queue refuses the newest frame");
        assert_eq!(rejected.info.sequence, 4);
        pool.release(rejected);

        assert_eq!(queue.len(), MAX_PREVIEW_FRAMES, "Queue never exceeds four");
        let order: Vec<u32> = std::iter::from_fn(|| queue.pop())
            .map(|f| f.info.sequence)
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3], "Queued frames stay in FIFO order");
    }

    #[test]
    fn test_drain_empties_queue() {
        let pool = FramePool::default();
        let mut queue = PreviewQueue::default();
        queue.push(tagged(&pool, 1)).unwrap();
        queue.push(tagged(&pool, 2)).unwrap();

        for frame in queue.drain() {
            pool.release(frame);
        }
        assert!(queue.is_empty());
        assert_eq!(pool.idle_count(), 2);
    }

    // ===== Capture slot =====

    #[test]
    fn test_latest_frame_wins() {
        let pool = FramePool::default();
        let mut slot = CaptureSlot::default();

        assert!(slot.replace(tagged(&pool, 1)).is_none());
        let displaced = slot
            .replace(tagged(&pool, 2))
            .expect("The older frame is handed back");
        assert_eq!(displaced.info.sequence, 1);
        pool.release(displaced);

        assert_eq!(slot.take().map(|f| f.info.sequence), Some(2));
        assert!(slot.take().is_none(), "Exactly one frame is dequeued");
    }
}
