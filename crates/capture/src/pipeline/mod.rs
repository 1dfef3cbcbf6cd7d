//! Preview and capture pipelines.
//!
//! Frames flow source callback -> preview queue -> preview thread (decode to
//! RGBX, draw) -> capture slot -> capture thread (capture sink, application
//! callback). Every buffer comes from and returns to one [`FramePool`].
//!
//! [`FramePool`]: frame::FramePool

mod queue;
mod shared;
mod worker;

pub use queue::{CaptureSlot, MAX_PREVIEW_FRAMES, PreviewQueue};

use crate::callback::{CallbackFormat, FrameCallback};
use crate::decoder::PreviewDecoder;
use crate::metrics::StatsSnapshot;
use crate::sink::{self, FrameSink};
use crate::source::{FrameHandler, FrameSource, NegotiatedStream, StreamRequest};
use common::{Result, UvcError};
use frame::{FrameRef, PixelFormat};
use shared::{CaptureState, Session, Shared};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Format every sink receives.
pub const PREVIEW_FORMAT: PixelFormat = PixelFormat::Rgbx8888;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Streaming,
    Stopping,
}

struct Lifecycle {
    phase: Phase,
    source: Box<dyn FrameSource>,
    source_started: bool,
    request: StreamRequest,
    negotiated: Option<NegotiatedStream>,
    preview_thread: Option<JoinHandle<()>>,
    capture_thread: Option<JoinHandle<()>>,
}

/// Owns a frame source and the two worker threads fed by it.
pub struct PreviewPipeline {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

fn check_sink_format(sink: &dyn FrameSink) -> Result<()> {
    if sink.format() != PREVIEW_FORMAT {
        return Err(UvcError::invalid(format!(
            "sink format {} does not match preview format {}",
            sink.format(),
            PREVIEW_FORMAT
        )));
    }
    Ok(())
}

impl PreviewPipeline {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Idle,
                source,
                source_started: false,
                request: StreamRequest::default(),
                negotiated: None,
                preview_thread: None,
                capture_thread: None,
            }),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle().phase
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.is_streaming()
    }

    /// Record the stream parameters the next `start` negotiates.
    pub fn set_request(&self, request: StreamRequest) -> Result<()> {
        if request.width == 0 || request.height == 0 || request.fps == 0 {
            return Err(UvcError::invalid(format!(
                "preview size {}x{} @ {} fps",
                request.width, request.height, request.fps
            )));
        }
        if !PreviewDecoder::supports(request.format) {
            return Err(UvcError::not_supported(format!(
                "{} preview source",
                request.format
            )));
        }
        self.lifecycle().request = request;
        Ok(())
    }

    pub fn request(&self) -> StreamRequest {
        self.lifecycle().request
    }

    pub fn negotiated(&self) -> Option<NegotiatedStream> {
        self.lifecycle().negotiated
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Buffers currently parked in the frame pool.
    pub fn idle_frames(&self) -> usize {
        self.shared.pool.idle_count()
    }

    pub fn has_preview_sink(&self) -> bool {
        self.shared.preview_sink().is_some()
    }

    /// A sink or callback is attached to the capture side.
    pub fn is_capturing(&self) -> bool {
        let state = self.shared.capture();
        state.session != Session::Stopped || !state.consumers.is_empty()
    }

    /// Attach, replace or detach the preview sink. Allowed while streaming.
    pub fn set_preview_sink(&self, mut sink: Option<Box<dyn FrameSink>>) -> Result<()> {
        if let Some(sink) = sink.as_deref() {
            check_sink_format(sink)?;
        }
        let geometry = self.shared.capture().geometry;
        if let (Some(sink), Some((w, h))) = (sink.as_mut(), geometry) {
            sink.set_geometry(w, h, PREVIEW_FORMAT)?;
        }
        let old = std::mem::replace(&mut *self.shared.preview_sink(), sink);
        drop(old);
        Ok(())
    }

    /// Pause the capture thread, apply `swap` to the idle consumers, resume.
    ///
    /// Blocks for at most one capture iteration when a session is running.
    fn swap_consumers<R>(&self, swap: impl FnOnce(&mut CaptureState) -> Result<R>) -> Result<R> {
        let mut state = self.shared.capture();
        state.pending_swaps += 1;
        if state.session == Session::Running {
            state.session = Session::StopRequested;
            self.shared.capture_ready.notify_all();
        }
        while state.session != Session::Stopped {
            state = self.shared.wait_capture(state);
        }

        let result = swap(&mut state);

        state.pending_swaps -= 1;
        self.shared.capture_ready.notify_all();
        result
    }

    /// Attach, replace or detach the capture sink. The sink must take RGBX.
    pub fn set_capture_sink(&self, sink: Option<Box<dyn FrameSink>>) -> Result<()> {
        if let Some(sink) = sink.as_deref() {
            check_sink_format(sink)?;
        }
        let old = self.swap_consumers(move |state| {
            let mut sink = sink;
            if let (Some(sink), Some((w, h))) = (sink.as_mut(), state.geometry) {
                sink.set_geometry(w, h, PREVIEW_FORMAT)?;
            }
            Ok(std::mem::replace(&mut state.consumers.sink, sink))
        })?;
        drop(old);
        Ok(())
    }

    /// Attach, replace or detach the application callback and its format.
    pub fn set_frame_callback(
        &self,
        callback: Option<Box<dyn FrameCallback>>,
        format: CallbackFormat,
    ) -> Result<()> {
        let old = self.swap_consumers(move |state| {
            state.set_callback_format(format);
            Ok(std::mem::replace(&mut state.consumers.callback, callback))
        })?;
        drop(old);
        Ok(())
    }

    /// Change the callback format; the next delivered frame uses it.
    pub fn set_callback_format(&self, format: CallbackFormat) {
        self.shared.capture().set_callback_format(format);
    }

    pub fn callback_format(&self) -> CallbackFormat {
        self.shared.capture().callback_format
    }

    /// Byte length of the next callback buffer, 0 before negotiation.
    pub fn callback_bytes(&self) -> usize {
        self.shared.capture().callback_bytes
    }

    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.phase != Phase::Idle {
            return Err(UvcError::AlreadyRunning);
        }
        if !self.has_preview_sink() {
            return Err(UvcError::NoSink);
        }

        lifecycle.phase = Phase::Starting;
        match self.launch(&mut lifecycle) {
            Ok(()) => {
                lifecycle.phase = Phase::Streaming;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Preview start failed, rolling back");
                self.halt(&mut lifecycle);
                lifecycle.negotiated = None;
                self.shared.capture().geometry = None;
                lifecycle.phase = Phase::Idle;
                Err(e)
            }
        }
    }

    fn launch(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        let request = lifecycle.request;
        let negotiated = lifecycle.source.negotiate(&request)?;
        let decoder = PreviewDecoder::for_format(negotiated.format)?;
        lifecycle.negotiated = Some(negotiated);

        let (width, height) = (negotiated.width, negotiated.height);
        let frame_bytes = PREVIEW_FORMAT
            .frame_bytes(width, height)
            .unwrap_or_default();
        if let Err(e) = self.shared.pool.prefill(frame_bytes) {
            tracing::warn!(error = %e, "Frame pool prefill failed");
        }

        if let Some(sink) = self.shared.preview_sink().as_mut() {
            sink.set_geometry(width, height, PREVIEW_FORMAT)?;
        }
        {
            let mut state = self.shared.capture();
            state.geometry = Some((width, height));
            let format = state.callback_format;
            state.set_callback_format(format);
            if let Some(sink) = state.consumers.sink.as_mut() {
                sink.set_geometry(width, height, PREVIEW_FORMAT)?;
            }
            state.alive = true;
        }
        self.shared.streaming.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        lifecycle.preview_thread = Some(
            thread::Builder::new()
                .name("uvc-preview".into())
                .spawn(move || worker::preview_loop(shared, decoder))?,
        );
        let shared = Arc::clone(&self.shared);
        lifecycle.capture_thread = Some(
            thread::Builder::new()
                .name("uvc-capture".into())
                .spawn(move || worker::capture_loop(shared))?,
        );

        let shared = Arc::clone(&self.shared);
        let handler: FrameHandler =
            Arc::new(move |frame: &FrameRef<'_>| worker::on_frame(&shared, frame));
        lifecycle.source.start(handler)?;
        lifecycle.source_started = true;

        tracing::info!(
            width,
            height,
            format = %negotiated.format,
            fps = negotiated.fps,
            "Preview started"
        );
        Ok(())
    }

    /// Stop the source, wake and join both workers, return queued frames.
    fn halt(&self, lifecycle: &mut Lifecycle) {
        self.shared.streaming.store(false, Ordering::Release);
        if lifecycle.source_started {
            if let Err(e) = lifecycle.source.stop() {
                tracing::warn!(error = %e, "Frame source stop failed");
            }
            lifecycle.source_started = false;
        }
        self.shared.wake_all();

        for (name, handle) in [
            ("capture", lifecycle.capture_thread.take()),
            ("preview", lifecycle.preview_thread.take()),
        ] {
            if let Some(handle) = handle
                && handle.join().is_err()
            {
                tracing::error!(thread = name, "Pipeline thread panicked");
            }
        }

        let queued: Vec<_> = self.shared.preview().drain().collect();
        for frame in queued {
            self.shared.pool.release(frame);
        }
        let pending = {
            let mut state = self.shared.capture();
            state.alive = false;
            state.slot.take()
        };
        if let Some(frame) = pending {
            self.shared.pool.release(frame);
        }
    }

    /// Stop streaming. Both sinks are cleared and detached; the callback
    /// stays registered. A no-op when already idle.
    pub fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.phase == Phase::Idle {
            return Ok(());
        }
        lifecycle.phase = Phase::Stopping;
        self.halt(&mut lifecycle);
        self.shared.pool.clear();

        let preview = self.shared.preview_sink().take();
        let capture = {
            let mut state = self.shared.capture();
            state.geometry = None;
            state.consumers.sink.take()
        };
        for mut sink in preview.into_iter().chain(capture) {
            if let Err(e) = sink::clear(sink.as_mut()) {
                tracing::debug!(error = %e, "Sink clear failed");
            }
        }

        lifecycle.negotiated = None;
        lifecycle.phase = Phase::Idle;
        let stats = self.shared.stats.snapshot();
        tracing::info!(
            received = stats.received,
            dropped = stats.dropped(),
            previewed = stats.previewed,
            captured = stats.captured,
            "Preview stopped"
        );
        Ok(())
    }
}

impl Drop for PreviewPipeline {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
