use common::{Result, UvcError, span_debug};
use frame::{FrameBuffer, MjpegDecoder, PixelFormat, convert};

/// Device-format to RGBX path, chosen once per negotiated stream.
#[derive(Debug)]
pub enum PreviewDecoder {
    Mjpeg(MjpegDecoder),
    /// Packed 4:2:2 frames go through the YUV converters.
    Packed(PixelFormat),
}

impl PreviewDecoder {
    pub fn for_format(format: PixelFormat) -> Result<Self> {
        match format {
            PixelFormat::Mjpeg => Ok(Self::Mjpeg(MjpegDecoder::new()?)),
            PixelFormat::Yuyv | PixelFormat::Uyvy => Ok(Self::Packed(format)),
            other => Err(UvcError::not_supported(format!("{} preview source", other))),
        }
    }

    /// Device formats with a preview path.
    pub fn supports(format: PixelFormat) -> bool {
        matches!(
            format,
            PixelFormat::Mjpeg | PixelFormat::Yuyv | PixelFormat::Uyvy
        )
    }

    pub fn source_format(&self) -> PixelFormat {
        match self {
            Self::Mjpeg(_) => PixelFormat::Mjpeg,
            Self::Packed(format) => *format,
        }
    }

    /// Decode one device frame into `out` as RGBX8888.
    pub fn decode(&mut self, input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
        let _s = span_debug!("preview_decode", sequence = input.info.sequence);
        match self {
            Self::Mjpeg(decoder) => decoder.decode_to_rgbx(input, out),
            Self::Packed(_) => convert::to_rgbx(input, out),
        }
    }
}
