use common::UvcError;
use frame::{FrameBuffer, PixelFormat};
use std::fmt;
use std::str::FromStr;

/// Pixel format requested by an application frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackFormat {
    Raw,
    Yuv,
    Nv12,
    #[default]
    Nv21,
    Rgb,
    Rgb565,
    Rgbx,
    Bgr,
}

impl CallbackFormat {
    pub const ALL: [CallbackFormat; 8] = [
        CallbackFormat::Raw,
        CallbackFormat::Yuv,
        CallbackFormat::Nv12,
        CallbackFormat::Nv21,
        CallbackFormat::Rgb,
        CallbackFormat::Rgb565,
        CallbackFormat::Rgbx,
        CallbackFormat::Bgr,
    ];

    /// Frame format delivered to the callback. RAW and YUV both get packed YUYV.
    pub fn pixel_format(self) -> PixelFormat {
        match self {
            CallbackFormat::Raw | CallbackFormat::Yuv => PixelFormat::Yuyv,
            CallbackFormat::Nv12 => PixelFormat::Nv12,
            CallbackFormat::Nv21 => PixelFormat::Nv21,
            CallbackFormat::Rgb => PixelFormat::Rgb24,
            CallbackFormat::Rgb565 => PixelFormat::Rgb565,
            CallbackFormat::Rgbx => PixelFormat::Rgbx8888,
            CallbackFormat::Bgr => PixelFormat::Bgr24,
        }
    }

    /// Exact length of every buffer handed to the callback at this geometry.
    pub fn output_bytes(self, width: u32, height: u32) -> usize {
        self.pixel_format()
            .frame_bytes(width, height)
            .unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallbackFormat::Raw => "raw",
            CallbackFormat::Yuv => "yuv",
            CallbackFormat::Nv12 => "nv12",
            CallbackFormat::Nv21 => "nv21",
            CallbackFormat::Rgb => "rgb",
            CallbackFormat::Rgb565 => "rgb565",
            CallbackFormat::Rgbx => "rgbx",
            CallbackFormat::Bgr => "bgr",
        }
    }
}

impl fmt::Display for CallbackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallbackFormat {
    type Err = UvcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| UvcError::invalid(format!("unknown callback format {:?}", s)))
    }
}

/// Application consumer of converted capture frames.
///
/// Runs on the capture thread. The buffer is only valid for the duration of
/// the call and goes back to the frame pool afterwards.
pub trait FrameCallback: Send {
    fn on_frame(&mut self, frame: &FrameBuffer);
}

impl<F> FrameCallback for F
where
    F: FnMut(&FrameBuffer) + Send,
{
    fn on_frame(&mut self, frame: &FrameBuffer) {
        self(frame)
    }
}
