use super::queue::{CaptureSlot, PreviewQueue};
use crate::callback::{CallbackFormat, FrameCallback};
use crate::metrics::PipelineStats;
use crate::sink::FrameSink;
use frame::FramePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Who holds the capture consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Session {
    /// Consumers sit in [`CaptureState`]; the capture thread holds nothing.
    Stopped,
    /// The capture thread has checked the consumers out.
    Running,
    /// A swap is waiting for the capture thread to check them back in.
    StopRequested,
}

#[derive(Default)]
pub(super) struct Consumers {
    pub(super) sink: Option<Box<dyn FrameSink>>,
    pub(super) callback: Option<Box<dyn FrameCallback>>,
}

impl Consumers {
    pub(super) fn is_empty(&self) -> bool {
        self.sink.is_none() && self.callback.is_none()
    }
}

pub(super) struct CaptureState {
    pub(super) slot: CaptureSlot,
    pub(super) consumers: Consumers,
    pub(super) callback_format: CallbackFormat,
    /// Payload size of the next callback buffer at the current geometry.
    pub(super) callback_bytes: usize,
    pub(super) session: Session,
    /// Swaps in progress; the capture thread does not check out while non-zero.
    pub(super) pending_swaps: usize,
    /// The capture thread is running and accepts frames.
    pub(super) alive: bool,
    pub(super) geometry: Option<(u32, u32)>,
}

impl CaptureState {
    pub(super) fn set_callback_format(&mut self, format: CallbackFormat) {
        self.callback_format = format;
        self.callback_bytes = self
            .geometry
            .map(|(w, h)| format.output_bytes(w, h))
            .unwrap_or_default();
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self {
            slot: CaptureSlot::default(),
            consumers: Consumers::default(),
            callback_format: CallbackFormat::default(),
            callback_bytes: 0,
            session: Session::Stopped,
            pending_swaps: 0,
            alive: false,
            geometry: None,
        }
    }
}

/// State reachable from the frame source callback and both worker threads.
pub(super) struct Shared {
    pub(super) pool: FramePool,
    pub(super) stats: PipelineStats,
    pub(super) streaming: AtomicBool,
    preview: Mutex<PreviewQueue>,
    pub(super) preview_ready: Condvar,
    preview_sink: Mutex<Option<Box<dyn FrameSink>>>,
    capture: Mutex<CaptureState>,
    pub(super) capture_ready: Condvar,
}

impl Shared {
    pub(super) fn new() -> Self {
        Self {
            pool: FramePool::default(),
            stats: PipelineStats::new(),
            streaming: AtomicBool::new(false),
            preview: Mutex::new(PreviewQueue::default()),
            preview_ready: Condvar::new(),
            preview_sink: Mutex::new(None),
            capture: Mutex::new(CaptureState::default()),
            capture_ready: Condvar::new(),
        }
    }

    pub(super) fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub(super) fn preview(&self) -> MutexGuard<'_, PreviewQueue> {
        self.preview.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn wait_preview<'a>(
        &self,
        guard: MutexGuard<'a, PreviewQueue>,
    ) -> MutexGuard<'a, PreviewQueue> {
        self.preview_ready
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn preview_sink(&self) -> MutexGuard<'_, Option<Box<dyn FrameSink>>> {
        self.preview_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn capture(&self) -> MutexGuard<'_, CaptureState> {
        self.capture.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn wait_capture<'a>(
        &self,
        guard: MutexGuard<'a, CaptureState>,
    ) -> MutexGuard<'a, CaptureState> {
        self.capture_ready
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake every thread blocked on either condition variable.
    pub(super) fn wake_all(&self) {
        {
            let _queue = self.preview();
            self.preview_ready.notify_all();
        }
        let _capture = self.capture();
        self.capture_ready.notify_all();
    }
}
