use crate::callback::{CallbackFormat, FrameCallback};
use crate::metrics::StatsSnapshot;
use crate::pipeline::PreviewPipeline;
use crate::sink::FrameSink;
use crate::source::{FrameSource, StreamRequest};
use common::{Result, UvcError};
use control::{ControlBitmaps, ControlId, ControlLimits, ControlTransport, DeviceControls};
use frame::PixelFormat;

struct Connection {
    pipeline: PreviewPipeline,
    controls: DeviceControls,
}

/// One UVC camera: a streaming pipeline plus its control cache, alive
/// between `connect` and `release`.
#[derive(Default)]
pub struct UvcCamera {
    connection: Option<Connection>,
}

impl UvcCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(
        &mut self,
        source: Box<dyn FrameSource>,
        transport: Box<dyn ControlTransport>,
        bitmaps: ControlBitmaps,
    ) -> Result<()> {
        if self.connection.is_some() {
            return Err(UvcError::Busy);
        }
        tracing::info!(
            camera_terminal = bitmaps.camera_terminal,
            processing_unit = bitmaps.processing_unit,
            "Camera connected"
        );
        self.connection = Some(Connection {
            pipeline: PreviewPipeline::new(source),
            controls: DeviceControls::new(transport, bitmaps),
        });
        Ok(())
    }

    /// Stop streaming and drop the connection. Releasing twice is fine.
    pub fn release(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.pipeline.stop()?;
            tracing::info!("Camera released");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| UvcError::NotFound("camera is not connected".into()))
    }

    pub fn pipeline(&self) -> Result<&PreviewPipeline> {
        Ok(&self.connection()?.pipeline)
    }

    pub fn controls(&self) -> Result<&DeviceControls> {
        Ok(&self.connection()?.controls)
    }

    pub fn set_preview_size(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        fps: u32,
    ) -> Result<()> {
        self.pipeline()?.set_request(StreamRequest {
            width,
            height,
            format,
            fps,
        })
    }

    pub fn set_preview_sink(&self, sink: Option<Box<dyn FrameSink>>) -> Result<()> {
        self.pipeline()?.set_preview_sink(sink)
    }

    pub fn set_capture_sink(&self, sink: Option<Box<dyn FrameSink>>) -> Result<()> {
        self.pipeline()?.set_capture_sink(sink)
    }

    pub fn set_frame_callback(
        &self,
        callback: Option<Box<dyn FrameCallback>>,
        format: CallbackFormat,
    ) -> Result<()> {
        self.pipeline()?.set_frame_callback(callback, format)
    }

    pub fn start_preview(&self) -> Result<()> {
        self.pipeline()?.start()
    }

    pub fn stop_preview(&self) -> Result<()> {
        self.pipeline()?.stop()
    }

    pub fn stats(&self) -> Result<StatsSnapshot> {
        Ok(self.pipeline()?.stats())
    }

    pub fn obtain_limit(&self, id: ControlId) -> Result<ControlLimits> {
        self.controls()?.obtain_limit(id)
    }

    pub fn set_control(&self, id: ControlId, value: i32) -> Result<()> {
        self.controls()?.set(id, value)
    }

    pub fn get_control(&self, id: ControlId) -> Result<i32> {
        self.controls()?.get(id)
    }
}

impl Drop for UvcCamera {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
