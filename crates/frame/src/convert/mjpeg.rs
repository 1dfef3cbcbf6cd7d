use super::{expect_format, prepare_output};
use crate::buffer::FrameBuffer;
use crate::format::PixelFormat;
use common::{Result, UvcError, span_debug};

/// MJPEG to RGBX decoder backed by libjpeg-turbo.
///
/// Holds one decompressor handle, so a decoder belongs to a single thread at
/// a time.
pub struct MjpegDecoder {
    decompressor: turbojpeg::Decompressor,
}

impl std::fmt::Debug for MjpegDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpegDecoder").finish_non_exhaustive()
    }
}

fn codec_error(e: turbojpeg::Error) -> UvcError {
    UvcError::Codec(e.to_string())
}

impl MjpegDecoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            decompressor: turbojpeg::Decompressor::new().map_err(codec_error)?,
        })
    }

    /// Decode `input` into `out` as RGBX8888.
    ///
    /// The JPEG header must match the geometry `input` declares; a device
    /// switching resolution mid-stream yields `InvalidParameter`.
    pub fn decode_to_rgbx(&mut self, input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
        let _s = span_debug!("mjpeg_decode");
        expect_format(input, PixelFormat::Mjpeg)?;

        let header = self
            .decompressor
            .read_header(input.data())
            .map_err(codec_error)?;
        let (width, height) = (input.info.width as usize, input.info.height as usize);
        if header.width != width || header.height != height {
            return Err(UvcError::invalid(format!(
                "MJPEG header {}x{} does not match expected {}x{}",
                header.width, header.height, width, height
            )));
        }

        prepare_output(input, out, PixelFormat::Rgbx8888)?;
        out.set_metadata(input.metadata());

        let image = turbojpeg::Image {
            pixels: out.data_mut(),
            width,
            pitch: width * 4,
            height,
            format: turbojpeg::PixelFormat::RGBX,
        };
        self.decompressor
            .decompress(input.data(), image)
            .map_err(codec_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FrameInfo, FrameRef};
    use image::{ImageEncoder, codecs::jpeg::JpegEncoder};

    fn encode_solid(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let pixels: Vec<u8> = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 95)
            .write_image(&pixels, width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        jpeg
    }

    fn mjpeg_frame(jpeg: &[u8], width: u32, height: u32) -> FrameBuffer {
        let mut frame = FrameBuffer::with_capacity(0).unwrap();
        let mut info = FrameInfo::new(width, height, PixelFormat::Mjpeg);
        info.sequence = 9;
        frame.copy_from(&FrameRef::new(info, jpeg)).unwrap();
        frame
    }

    #[test]
    fn test_decode_to_rgbx() {
        let jpeg = encode_solid(32, 16, [200, 200, 200]);
        let input = mjpeg_frame(&jpeg, 32, 16);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        let mut decoder = MjpegDecoder::new().unwrap();

        decoder.decode_to_rgbx(&input, &mut out).unwrap();

        assert_eq!(out.len(), 32 * 16 * 4);
        assert_eq!(out.info.step, 32 * 4);
        assert_eq!(out.info.format, PixelFormat::Rgbx8888);
        assert_eq!(out.info.sequence, 9, "Header is carried over");
        let px = &out.data()[..4];
        assert!(
            px[..3].iter().all(|c| c.abs_diff(200) <= 4),
            "Solid gray should survive compression, got {:?}",
            px
        );
    }

    #[test]
    fn test_header_geometry_mismatch() {
        let jpeg = encode_solid(32, 16, [10, 20, 30]);
        let input = mjpeg_frame(&jpeg, 64, 48);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        let mut decoder = MjpegDecoder::new().unwrap();

        match decoder.decode_to_rgbx(&input, &mut out) {
            Err(UvcError::InvalidParameter(msg)) => assert!(msg.contains("32x16")),
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_data() {
        let input = mjpeg_frame(&[0, 1, 2, 3], 640, 480);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        let mut decoder = MjpegDecoder::new().unwrap();
        assert!(matches!(
            decoder.decode_to_rgbx(&input, &mut out),
            Err(UvcError::Codec(_))
        ));
    }
}
