use crate::source::{FrameHandler, FrameSource, NegotiatedStream, StreamRequest};
use common::{Result, UvcError, retry_with_backoff};
use frame::{FrameInfo, FrameRef, PixelFormat};
use std::io;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, SyncSender},
};
use std::thread::JoinHandle;
use std::time::Duration;
use v4l::{
    Device, FourCC,
    buffer::Type,
    io::{mmap::Stream, traits::CaptureStream},
    video::{Capture, capture::Parameters},
};

const BUFFER_COUNT: u32 = 4;

/// Upper bound on how long `stop` waits for a stalled device.
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

const MAX_CONSECUTIVE_ERRORS: u32 = 8;
const ERROR_BACKOFF: Duration = Duration::from_millis(20);

const FOURCC_YUYV: FourCC = FourCC { repr: *b"YUYV" };
const FOURCC_UYVY: FourCC = FourCC { repr: *b"UYVY" };
const FOURCC_MJPG: FourCC = FourCC { repr: *b"MJPG" };

fn fourcc(format: PixelFormat) -> Result<FourCC> {
    match format {
        PixelFormat::Yuyv => Ok(FOURCC_YUYV),
        PixelFormat::Uyvy => Ok(FOURCC_UYVY),
        PixelFormat::Mjpeg => Ok(FOURCC_MJPG),
        other => Err(UvcError::not_supported(format!("{} device stream", other))),
    }
}

fn find_usable_camera() -> Option<usize> {
    v4l::context::enum_devices()
        .into_iter()
        .find(|dev| {
            Device::with_path(dev.path())
                .and_then(|d| d.query_caps())
                .map(|caps| {
                    caps.capabilities
                        .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                })
                .unwrap_or(false)
        })
        .map(|dev| dev.index())
}

fn try_open(index: usize) -> Result<Device> {
    if let Ok(dev) = Device::new(index)
        && dev.query_caps().is_ok()
    {
        return Ok(dev);
    }

    tracing::debug!(index, "Camera index busy or missing, scanning alternatives");

    let fallback = find_usable_camera()
        .ok_or_else(|| UvcError::NotFound("no usable video capture device".into()))?;
    Ok(Device::new(fallback)?)
}

/// Open a capture device, retrying while it enumerates.
pub fn open_device(index: u32) -> Result<Device> {
    let device = retry_with_backoff(|| try_open(index as usize), 10, 200, "Camera open")?;
    let caps = device.query_caps()?;
    tracing::info!(card = %caps.card, driver = %caps.driver, "Camera opened");
    Ok(device)
}

struct Running {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// [`FrameSource`] reading a V4L2 device through memory-mapped buffers.
pub struct V4l2Source {
    device: Arc<Device>,
    stream: Option<NegotiatedStream>,
    running: Option<Running>,
}

impl V4l2Source {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            stream: None,
            running: None,
        }
    }
}

fn timestamp(meta: &v4l::buffer::Metadata) -> Duration {
    let secs = meta.timestamp.sec.max(0) as u64;
    let micros = meta.timestamp.usec.clamp(0, 999_999) as u32;
    Duration::new(secs, micros * 1_000)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamExit {
    Stopped,
    Failed,
}

/// Pull frames until `stop` is raised or the device keeps failing.
///
/// Timeouts are not errors. Other errors back off linearly, and
/// `MAX_CONSECUTIVE_ERRORS` in a row end the stream.
fn pump(stop: &AtomicBool, mut next: impl FnMut() -> io::Result<()>) -> StreamExit {
    let mut consecutive = 0u32;
    let mut total = 0u64;
    while !stop.load(Ordering::Acquire) {
        match next() {
            Ok(()) => consecutive = 0,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => {
                consecutive += 1;
                total += 1;
                if consecutive >= MAX_CONSECUTIVE_ERRORS {
                    tracing::error!(error = %e, errors = total, "Capture stream failed, giving up");
                    return StreamExit::Failed;
                }
                tracing::warn!(error = %e, consecutive, "Frame capture error");
                std::thread::sleep(ERROR_BACKOFF * consecutive);
            }
        }
    }
    tracing::debug!(errors = total, "Capture stream stopped");
    StreamExit::Stopped
}

/// Spawn the stream thread and wait for it to report whether the stream
/// could be set up.
///
/// `body` must send exactly one readiness result before it starts pulling
/// frames. A setup error is returned here after the thread is joined.
fn spawn_reader<F>(body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce(SyncSender<io::Result<()>>) + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let thread = std::thread::Builder::new()
        .name("uvc-v4l2".into())
        .spawn(move || body(ready_tx))?;

    let outcome = match ready_rx.recv() {
        Ok(Ok(())) => return Ok(thread),
        Ok(Err(e)) => UvcError::Io(e),
        Err(_) => UvcError::Io(io::Error::other("capture stream thread exited during setup")),
    };
    if thread.join().is_err() {
        tracing::error!("Capture stream thread panicked during setup");
    }
    Err(outcome)
}

fn stream_loop(
    device: Arc<Device>,
    negotiated: NegotiatedStream,
    handler: FrameHandler,
    stop: Arc<AtomicBool>,
    ready: SyncSender<io::Result<()>>,
) {
    let mut stream = match Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create capture stream");
            let _ = ready.send(Err(e));
            return;
        }
    };
    stream.set_timeout(POLL_TIMEOUT);
    let _ = ready.send(Ok(()));

    pump(&stop, || {
        let (buf, meta) = stream.next()?;
        let used = (meta.bytesused as usize).min(buf.len());
        let info = FrameInfo {
            width: negotiated.width,
            height: negotiated.height,
            format: negotiated.format,
            step: negotiated.step,
            sequence: meta.sequence,
            timestamp: timestamp(meta),
        };
        handler(&FrameRef::new(info, &buf[..used]));
        Ok(())
    });
}

impl FrameSource for V4l2Source {
    fn negotiate(&mut self, request: &StreamRequest) -> Result<NegotiatedStream> {
        let wanted = fourcc(request.format)?;

        let formats = self.device.enum_formats()?;
        if !formats.iter().any(|f| f.fourcc == wanted) {
            return Err(UvcError::not_supported(format!(
                "device offers {:?}, not {}",
                formats.iter().map(|f| f.fourcc).collect::<Vec<_>>(),
                request.format
            )));
        }

        let mut format = self.device.format()?;
        format.width = request.width;
        format.height = request.height;
        format.fourcc = wanted;
        let format = self.device.set_format(&format)?;
        if format.fourcc != wanted {
            return Err(UvcError::not_supported(format!(
                "device switched to {:?}",
                format.fourcc
            )));
        }
        if (format.width, format.height) != (request.width, request.height) {
            tracing::warn!(
                requested_width = request.width,
                requested_height = request.height,
                width = format.width,
                height = format.height,
                "Device adjusted frame size"
            );
        }

        let params = self
            .device
            .set_params(&Parameters::with_fps(request.fps))?;
        let fps = match params.interval.numerator {
            0 => f64::from(request.fps),
            n => f64::from(params.interval.denominator) / f64::from(n),
        };

        let negotiated = NegotiatedStream {
            width: format.width,
            height: format.height,
            format: request.format,
            step: match request.format {
                PixelFormat::Mjpeg => 0,
                _ => format.stride,
            },
            fps,
        };
        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            format = %negotiated.format,
            fps = negotiated.fps,
            "Stream negotiated"
        );
        self.stream = Some(negotiated);
        Ok(negotiated)
    }

    fn start(&mut self, handler: FrameHandler) -> Result<()> {
        if self.running.is_some() {
            return Err(UvcError::AlreadyRunning);
        }
        let negotiated = self
            .stream
            .ok_or_else(|| UvcError::invalid("start before negotiate"))?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread = spawn_reader({
            let device = Arc::clone(&self.device);
            let stop = Arc::clone(&stop);
            move |ready| stream_loop(device, negotiated, handler, stop, ready)
        })?;
        self.running = Some(Running { stop, thread });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(running) = self.running.take() {
            running.stop.store(true, Ordering::Release);
            if running.thread.join().is_err() {
                tracing::error!("Capture stream thread panicked");
            }
        }
        Ok(())
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
