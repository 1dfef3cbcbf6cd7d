use common::Result;
use frame::{FrameRef, PixelFormat};
use std::sync::Arc;

/// Called for every delivered frame, on whatever thread the source uses.
/// The frame is transient and must be copied before the call returns.
pub type FrameHandler = Arc<dyn Fn(&FrameRef<'_>) + Send + Sync>;

/// Stream parameters asked of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub fps: u32,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            format: PixelFormat::Mjpeg,
            fps: 30,
        }
    }
}

/// Stream parameters the device settled on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegotiatedStream {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Row stride of delivered raw frames, 0 for compressed formats.
    pub step: u32,
    pub fps: f64,
}

/// Device side of the pipeline: negotiates a stream and pushes frames.
pub trait FrameSource: Send {
    fn negotiate(&mut self, request: &StreamRequest) -> Result<NegotiatedStream>;

    /// Begin delivering frames to `handler`.
    fn start(&mut self, handler: FrameHandler) -> Result<()>;

    /// Stop delivering. No handler call may be in progress or follow once
    /// this returns.
    fn stop(&mut self) -> Result<()>;
}
