#![allow(dead_code)]

use capture::{FrameHandler, FrameSink, FrameSource, NegotiatedStream, SinkBuffer, StreamRequest};
use common::{Result, UvcError};
use frame::{FrameInfo, FrameRef, PixelFormat};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Frame source driven by the test: `push` plays the device callback on the
/// calling thread.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    handler: Arc<Mutex<Option<FrameHandler>>>,
    refuse_negotiation: bool,
}

impl ScriptedSource {
    pub fn refusing() -> Self {
        Self {
            refuse_negotiation: true,
            ..Self::default()
        }
    }

    pub fn is_started(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    pub fn push(&self, info: FrameInfo, data: &[u8]) -> bool {
        let handler = self.handler.lock().unwrap().clone();
        match handler {
            Some(handler) => {
                handler(&FrameRef::new(info, data));
                true
            }
            None => false,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn negotiate(&mut self, request: &StreamRequest) -> Result<NegotiatedStream> {
        if self.refuse_negotiation {
            return Err(UvcError::not_supported("scripted refusal"));
        }
        Ok(NegotiatedStream {
            width: request.width,
            height: request.height,
            format: request.format,
            step: request.format.packed_step(request.width),
            fps: f64::from(request.fps),
        })
    }

    fn start(&mut self, handler: FrameHandler) -> Result<()> {
        *self.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.handler.lock().unwrap().take();
        Ok(())
    }
}

/// Sink whose `present` reports entry and then waits for the test.
/// Dropping the release sender lets every later call through.
pub struct GatedSink {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl GatedSink {
    pub fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        (
            Self {
                entered: entered_tx,
                release: release_rx,
            },
            entered_rx,
            release_tx,
        )
    }
}

impl FrameSink for GatedSink {
    fn set_geometry(&mut self, _: u32, _: u32, _: PixelFormat) -> Result<()> {
        Ok(())
    }

    fn format(&self) -> PixelFormat {
        PixelFormat::Rgbx8888
    }

    fn present(&mut self, _: &mut dyn FnMut(&mut SinkBuffer<'_>)) -> Result<()> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        Ok(())
    }
}

pub fn yuyv_info(width: u32, height: u32, sequence: u32) -> FrameInfo {
    FrameInfo {
        sequence,
        ..FrameInfo::new(width, height, PixelFormat::Yuyv)
    }
}

pub fn gray_yuyv(width: u32, height: u32) -> Vec<u8> {
    vec![128; (width * height * 2) as usize]
}

pub fn solid_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    use image::{ImageEncoder, codecs::jpeg::JpegEncoder};

    let pixels: Vec<u8> = rgb
        .iter()
        .copied()
        .cycle()
        .take((width * height * 3) as usize)
        .collect();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 95)
        .write_image(&pixels, width, height, image::ExtendedColorType::Rgb8)
        .expect("Failed to encode test JPEG");
    jpeg
}

/// Poll `cond` until it holds or five seconds pass.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}
