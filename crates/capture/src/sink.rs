use common::{Result, UvcError};
use frame::{FrameBuffer, PixelFormat};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Locked output buffer of a sink, valid for one `present` call.
#[derive(Debug)]
pub struct SinkBuffer<'a> {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes.
    pub stride: usize,
    pub format: PixelFormat,
    pub data: &'a mut [u8],
}

/// Display surface fed with converted frames.
pub trait FrameSink: Send {
    /// Reconfigure the surface. Called on attach and after negotiation.
    fn set_geometry(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<()>;

    fn format(&self) -> PixelFormat;

    /// Lock the next buffer, let `write` fill it, then post it.
    fn present(&mut self, write: &mut dyn FnMut(&mut SinkBuffer<'_>)) -> Result<()>;
}

/// Row-stride-aware copy of `frame` into `buf`, clipped to the smaller of
/// the two geometries.
pub fn copy_to_sink(frame: &FrameBuffer, buf: &mut SinkBuffer<'_>) -> Result<()> {
    if frame.info.format != buf.format {
        return Err(UvcError::invalid(format!(
            "sink expects {}, frame is {}",
            buf.format, frame.info.format
        )));
    }
    let bpp = buf
        .format
        .bytes_per_pixel()
        .ok_or_else(|| UvcError::not_supported(format!("{} sink", buf.format)))?;

    let src = frame.data();
    let src_stride = match frame.info.step as usize {
        0 => frame.info.width as usize * bpp,
        step => step,
    };
    let row_bytes = frame.info.width.min(buf.width) as usize * bpp;
    let rows = frame.info.height.min(buf.height) as usize;

    if src_stride == buf.stride && row_bytes == src_stride {
        let n = (rows * src_stride).min(src.len()).min(buf.data.len());
        buf.data[..n].copy_from_slice(&src[..n]);
        return Ok(());
    }

    for (src_row, dst_row) in src
        .chunks(src_stride)
        .zip(buf.data.chunks_mut(buf.stride.max(1)))
        .take(rows)
    {
        let n = row_bytes.min(src_row.len()).min(dst_row.len());
        dst_row[..n].copy_from_slice(&src_row[..n]);
    }
    Ok(())
}

/// Fill the sink's next buffer with zeros.
pub fn clear(sink: &mut dyn FrameSink) -> Result<()> {
    sink.present(&mut |buf: &mut SinkBuffer<'_>| buf.data.fill(0))
}

#[derive(Debug, Default)]
struct MemorySinkState {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
    presented: u64,
}

/// Sink backed by a heap buffer. Clones share the same surface, so a test or
/// the binary can keep a handle after attaching one to the pipeline.
#[derive(Debug, Clone)]
pub struct MemorySink {
    format: PixelFormat,
    row_padding: usize,
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            row_padding: 0,
            state: Arc::default(),
        }
    }

    /// Pad each row by `bytes`, giving a stride wider than the frame.
    pub fn with_row_padding(mut self, bytes: usize) -> Self {
        self.row_padding = bytes;
        self
    }

    fn state(&self) -> MutexGuard<'_, MemorySinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn geometry(&self) -> (u32, u32) {
        let state = self.state();
        (state.width, state.height)
    }

    pub fn stride(&self) -> usize {
        self.state().stride
    }

    pub fn presented(&self) -> u64 {
        self.state().presented
    }

    /// Copy of the surface contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.state().data.clone()
    }
}

impl FrameSink for MemorySink {
    fn set_geometry(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<()> {
        if format != self.format {
            return Err(UvcError::invalid(format!(
                "memory sink holds {}, asked for {}",
                self.format, format
            )));
        }
        let bpp = format
            .bytes_per_pixel()
            .ok_or_else(|| UvcError::not_supported(format!("{} sink", format)))?;
        let stride = width as usize * bpp + self.row_padding;
        let bytes = stride * height as usize;

        let mut state = self.state();
        state.data.clear();
        state
            .data
            .try_reserve_exact(bytes)
            .map_err(|_| UvcError::NoMemory { requested: bytes })?;
        state.data.resize(bytes, 0);
        state.width = width;
        state.height = height;
        state.stride = stride;
        Ok(())
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn present(&mut self, write: &mut dyn FnMut(&mut SinkBuffer<'_>)) -> Result<()> {
        let mut guard = self.state();
        let state = &mut *guard;
        let mut buf = SinkBuffer {
            width: state.width,
            height: state.height,
            stride: state.stride,
            format: self.format,
            data: &mut state.data,
        };
        write(&mut buf);
        state.presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame::{FrameInfo, FrameRef};

    fn rgbx_frame(width: u32, height: u32) -> FrameBuffer {
        let bytes: Vec<u8> = (0..width * height * 4).map(|i| (i % 251) as u8).collect();
        let mut frame = FrameBuffer::with_capacity(0).unwrap();
        frame
            .copy_from(&FrameRef::new(
                FrameInfo::new(width, height, PixelFormat::Rgbx8888),
                &bytes,
            ))
            .unwrap();
        frame
    }

    // ===== Copy =====

    #[test]
    fn test_copy_matching_stride() {
        let frame = rgbx_frame(4, 3);
        let mut sink = MemorySink::new(PixelFormat::Rgbx8888);
        sink.set_geometry(4, 3, PixelFormat::Rgbx8888).unwrap();

        sink.present(&mut |buf: &mut SinkBuffer<'_>| copy_to_sink(&frame, buf).unwrap())
            .unwrap();
        assert_eq!(sink.snapshot(), frame.data(), "Packed copy is byte-identical");
        assert_eq!(sink.presented(), 1);
    }

    #[test]
    fn test_copy_respects_sink_stride() {
        let frame = rgbx_frame(4, 3);
        let mut sink = MemorySink::new(PixelFormat::Rgbx8888).with_row_padding(8);
        sink.set_geometry(4, 3, PixelFormat::Rgbx8888).unwrap();
        assert_eq!(sink.stride(), 24);

        sink.present(&mut |buf: &mut SinkBuffer<'_>| copy_to_sink(&frame, buf).unwrap())
            .unwrap();
        let surface = sink.snapshot();
        for row in 0..3 {
            assert_eq!(
                &surface[row * 24..row * 24 + 16],
                &frame.data()[row * 16..row * 16 + 16],
                "Row {} lands at the sink stride",
                row
            );
            assert!(surface[row * 24 + 16..row * 24 + 24].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_copy_clips_to_smaller_sink() {
        let frame = rgbx_frame(4, 4);
        let mut sink = MemorySink::new(PixelFormat::Rgbx8888);
        sink.set_geometry(2, 2, PixelFormat::Rgbx8888).unwrap();

        sink.present(&mut |buf: &mut SinkBuffer<'_>| copy_to_sink(&frame, buf).unwrap())
            .unwrap();
        let surface = sink.snapshot();
        assert_eq!(&surface[..8], &frame.data()[..8]);
        assert_eq!(&surface[8..16], &frame.data()[16..24]);
    }

    #[test]
    fn test_copy_rejects_format_mismatch() {
        let frame = rgbx_frame(2, 2);
        let mut data = vec![0u8; 2 * 2 * 2];
        let mut buf = SinkBuffer {
            width: 2,
            height: 2,
            stride: 4,
            format: PixelFormat::Rgb565,
            data: &mut data,
        };
        assert!(matches!(
            copy_to_sink(&frame, &mut buf),
            Err(UvcError::InvalidParameter(_))
        ));
    }

    // ===== Clear =====

    #[test]
    fn test_clear_zeroes_surface() {
        let frame = rgbx_frame(2, 2);
        let mut sink = MemorySink::new(PixelFormat::Rgbx8888);
        sink.set_geometry(2, 2, PixelFormat::Rgbx8888).unwrap();
        sink.present(&mut |buf: &mut SinkBuffer<'_>| copy_to_sink(&frame, buf).unwrap())
            .unwrap();

        clear(&mut sink).unwrap();
        assert!(sink.snapshot().iter().all(|&b| b == 0));
    }
}
