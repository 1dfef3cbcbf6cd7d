use super::shared::{Consumers, Session, Shared};
use crate::callback::CallbackFormat;
use crate::decoder::PreviewDecoder;
use crate::metrics::{DropReason, status_due};
use crate::sink::{FrameSink, SinkBuffer, copy_to_sink};
use common::{Result, span_debug};
use frame::{FrameBuffer, FrameRef, PixelFormat, convert};
use std::sync::Arc;

/// Frame source callback: copy the transient frame into the pool and queue
/// it for preview. Never blocks beyond the pool and queue locks.
pub(super) fn on_frame(shared: &Shared, frame: &FrameRef<'_>) {
    if !shared.is_streaming() {
        return;
    }
    shared.stats.record_received();

    let copy = match shared.pool.duplicate(frame) {
        Ok(copy) => copy,
        Err(e) => {
            shared.stats.record_dropped(DropReason::Pool);
            tracing::warn!(sequence = frame.info.sequence, error = %e, "Frame dropped, no buffer");
            return;
        }
    };

    let rejected = {
        let mut queue = shared.preview();
        match queue.push(copy) {
            Ok(()) => {
                shared.preview_ready.notify_one();
                None
            }
            Err(frame) => Some(frame),
        }
    };
    if let Some(frame) = rejected {
        shared.stats.record_dropped(DropReason::QueueFull);
        tracing::trace!(sequence = frame.info.sequence, "Preview queue full, frame dropped");
        shared.pool.release(frame);
    }
}

/// Copy `frame` into the sink's next buffer.
pub(super) fn present(sink: &mut dyn FrameSink, frame: &FrameBuffer) -> Result<()> {
    let mut copied = Ok(());
    sink.present(&mut |buf: &mut SinkBuffer<'_>| copied = copy_to_sink(frame, buf))?;
    copied
}

fn next_preview_frame(shared: &Shared) -> Option<FrameBuffer> {
    let mut queue = shared.preview();
    loop {
        if !shared.is_streaming() {
            return None;
        }
        if let Some(frame) = queue.pop() {
            return Some(frame);
        }
        queue = shared.wait_preview(queue);
    }
}

pub(super) fn preview_loop(shared: Arc<Shared>, mut decoder: PreviewDecoder) {
    tracing::debug!(format = %decoder.source_format(), "Preview thread started");

    while let Some(frame) = next_preview_frame(&shared) {
        let _s = span_debug!("preview_frame", sequence = frame.info.sequence);
        let rgbx_bytes = PixelFormat::Rgbx8888
            .frame_bytes(frame.info.width, frame.info.height)
            .unwrap_or_default();

        let mut converted = match shared.pool.acquire(rgbx_bytes) {
            Ok(buf) => buf,
            Err(e) => {
                shared.pool.release(frame);
                shared.stats.record_dropped(DropReason::Pool);
                tracing::warn!(error = %e, "Preview frame dropped, no buffer");
                continue;
            }
        };

        let decoded = decoder.decode(&frame, &mut converted);
        let sequence = frame.info.sequence;
        shared.pool.release(frame);
        if let Err(e) = decoded {
            shared.pool.release(converted);
            shared.stats.record_dropped(DropReason::Convert);
            tracing::warn!(sequence, error = %e, "Preview frame dropped, decode failed");
            continue;
        }

        if let Some(sink) = shared.preview_sink().as_mut()
            && let Err(e) = present(sink.as_mut(), &converted)
        {
            tracing::warn!(sequence, error = %e, "Preview sink write failed");
        }
        shared.stats.record_previewed();
        if status_due(sequence) {
            let stats = shared.stats.snapshot();
            tracing::debug!(
                sequence,
                received = stats.received,
                previewed = stats.previewed,
                dropped = stats.dropped(),
                "Preview status"
            );
        }

        hand_off(&shared, converted);
    }

    tracing::debug!("Preview thread exiting");
}

/// Give a converted frame to the capture thread, releasing whatever it displaces.
fn hand_off(shared: &Shared, frame: FrameBuffer) {
    let displaced = {
        let mut state = shared.capture();
        if state.alive && shared.is_streaming() {
            let old = state.slot.replace(frame);
            shared.capture_ready.notify_all();
            old
        } else {
            Some(frame)
        }
    };
    if let Some(frame) = displaced {
        shared.pool.release(frame);
    }
}

/// Marks the capture thread gone on any exit, panics included, so a
/// pending swap never waits on a dead thread.
struct CaptureExit<'a>(&'a Shared);

impl Drop for CaptureExit<'_> {
    fn drop(&mut self) {
        let mut state = self.0.capture();
        state.alive = false;
        state.session = Session::Stopped;
        self.0.capture_ready.notify_all();
        if std::thread::panicking() {
            tracing::error!("Capture consumer panicked, sink and callback dropped");
        }
    }
}

struct Work {
    frame: FrameBuffer,
    format: CallbackFormat,
    bytes: usize,
}

fn next_capture_frame(shared: &Shared, held: &mut Option<Consumers>) -> Option<Work> {
    let mut state = shared.capture();
    loop {
        if !shared.is_streaming() {
            if let Some(consumers) = held.take() {
                state.consumers = consumers;
            }
            return None;
        }

        if state.session == Session::StopRequested {
            if let Some(consumers) = held.take() {
                state.consumers = consumers;
            }
            state.session = Session::Stopped;
            shared.capture_ready.notify_all();
            tracing::debug!("Capture paused for consumer swap");
        }

        if held.is_none()
            && state.session == Session::Stopped
            && state.pending_swaps == 0
            && !state.consumers.is_empty()
        {
            *held = Some(std::mem::take(&mut state.consumers));
            state.session = Session::Running;
            tracing::debug!("Capture consumers attached");
        }

        if held.is_some() {
            if let Some(frame) = state.slot.take() {
                return Some(Work {
                    frame,
                    format: state.callback_format,
                    bytes: state.callback_bytes,
                });
            }
        } else if state.pending_swaps == 0
            && let Some(frame) = state.slot.take()
        {
            shared.pool.release(frame);
            continue;
        }

        state = shared.wait_capture(state);
    }
}

pub(super) fn capture_loop(shared: Arc<Shared>) {
    let _exit = CaptureExit(&shared);
    let mut held: Option<Consumers> = None;
    tracing::debug!("Capture thread started");

    while let Some(work) = next_capture_frame(&shared, &mut held) {
        if let Some(consumers) = held.as_mut() {
            deliver(&shared, consumers, &work);
        }
        shared.pool.release(work.frame);
    }

    tracing::debug!("Capture thread exiting");
}

fn deliver(shared: &Shared, consumers: &mut Consumers, work: &Work) {
    let frame = &work.frame;
    let _s = span_debug!("capture_frame", sequence = frame.info.sequence);

    if let Some(sink) = consumers.sink.as_mut()
        && let Err(e) = present(sink.as_mut(), frame)
    {
        tracing::warn!(sequence = frame.info.sequence, error = %e, "Capture sink write failed");
    }

    if let Some(callback) = consumers.callback.as_mut() {
        match shared.pool.acquire(work.bytes) {
            Ok(mut out) => {
                match convert::convert(frame, &mut out, work.format.pixel_format()) {
                    Ok(()) => callback.on_frame(&out),
                    Err(e) => tracing::warn!(
                        format = %work.format,
                        error = %e,
                        "Callback conversion failed"
                    ),
                }
                shared.pool.release(out);
            }
            Err(e) => tracing::warn!(error = %e, "Callback frame skipped, no buffer"),
        }
    }

    if !consumers.is_empty() {
        shared.stats.record_captured();
    }
}
