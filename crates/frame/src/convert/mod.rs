//! Pixel format conversions between [`FrameBuffer`]s.
//!
//! Every converter checks the source format, grows the destination to the
//! exact output size, copies the frame header and rewrites format and step.

mod layout;
mod mjpeg;
mod rgb;
mod yuv;

pub use mjpeg::MjpegDecoder;
pub use rgb::{
    rgb_to_rgb565, rgb_to_rgbx, rgbx_to_bgr, rgbx_to_nv12, rgbx_to_nv21, rgbx_to_rgb,
    rgbx_to_rgb565, rgbx_to_yuyv,
};
pub use yuv::{
    uyvy_to_bgr, uyvy_to_rgb, uyvy_to_rgb565, uyvy_to_rgbx, uyvy_to_y, yuyv_to_bgr, yuyv_to_nv12,
    yuyv_to_nv21, yuyv_to_rgb, yuyv_to_rgb565, yuyv_to_rgbx, yuyv_to_uv, yuyv_to_y,
};

use crate::buffer::{FrameBuffer, FrameInfo};
use crate::format::PixelFormat;
use common::{Result, UvcError};

pub(crate) fn expect_format(input: &FrameBuffer, expected: PixelFormat) -> Result<()> {
    if input.info.format != expected {
        return Err(UvcError::invalid(format!(
            "expected {} input, got {}",
            expected, input.info.format
        )));
    }
    Ok(())
}

/// Size `out` for `format` at the input geometry and copy the header over.
pub(crate) fn prepare_output(
    input: &FrameBuffer,
    out: &mut FrameBuffer,
    format: PixelFormat,
) -> Result<()> {
    let FrameInfo { width, height, .. } = input.info;
    let bytes = format
        .frame_bytes(width, height)
        .ok_or_else(|| UvcError::not_supported(format!("{} has no fixed size", format)))?;
    out.ensure_size(bytes)?;
    out.info = FrameInfo {
        format,
        step: format.packed_step(width),
        ..input.info
    };
    Ok(())
}

/// Run `f` over matching rows when both buffers have distinct non-zero strides,
/// otherwise over the whole payload as one run.
pub(crate) fn map_rows<F>(input: &FrameBuffer, out: &mut FrameBuffer, mut f: F)
where
    F: FnMut(&[u8], &mut [u8]),
{
    let in_step = input.info.step as usize;
    let out_step = out.info.step as usize;
    let rows = input.info.height.min(out.info.height) as usize;
    let src = input.data();
    let dst = out.data_mut();

    if in_step == 0 || out_step == 0 || in_step == out_step {
        f(src, dst);
        return;
    }
    for (src_row, dst_row) in src.chunks(in_step).zip(dst.chunks_mut(out_step)).take(rows) {
        f(src_row, dst_row);
    }
}

pub fn duplicate(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    out.copy_from(&input.as_frame_ref())
}

fn no_path(input: &FrameBuffer, target: PixelFormat) -> UvcError {
    UvcError::not_supported(format!("{} -> {}", input.info.format, target))
}

pub fn to_rgbx(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => yuyv_to_rgbx(input, out),
        PixelFormat::Uyvy => uyvy_to_rgbx(input, out),
        PixelFormat::Rgb24 => rgb_to_rgbx(input, out),
        PixelFormat::Rgbx8888 => duplicate(input, out),
        _ => Err(no_path(input, PixelFormat::Rgbx8888)),
    }
}

pub fn to_rgb(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => yuyv_to_rgb(input, out),
        PixelFormat::Uyvy => uyvy_to_rgb(input, out),
        PixelFormat::Rgbx8888 => rgbx_to_rgb(input, out),
        PixelFormat::Rgb24 => duplicate(input, out),
        _ => Err(no_path(input, PixelFormat::Rgb24)),
    }
}

pub fn to_bgr(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => yuyv_to_bgr(input, out),
        PixelFormat::Uyvy => uyvy_to_bgr(input, out),
        PixelFormat::Rgbx8888 => rgbx_to_bgr(input, out),
        PixelFormat::Bgr24 => duplicate(input, out),
        _ => Err(no_path(input, PixelFormat::Bgr24)),
    }
}

pub fn to_rgb565(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => yuyv_to_rgb565(input, out),
        PixelFormat::Uyvy => uyvy_to_rgb565(input, out),
        PixelFormat::Rgb24 => rgb_to_rgb565(input, out),
        PixelFormat::Rgbx8888 => rgbx_to_rgb565(input, out),
        PixelFormat::Rgb565 => duplicate(input, out),
        _ => Err(no_path(input, PixelFormat::Rgb565)),
    }
}

pub fn to_yuyv(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => duplicate(input, out),
        PixelFormat::Rgbx8888 => rgbx_to_yuyv(input, out),
        _ => Err(no_path(input, PixelFormat::Yuyv)),
    }
}

pub fn to_nv12(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => yuyv_to_nv12(input, out),
        PixelFormat::Rgbx8888 => rgbx_to_nv12(input, out),
        PixelFormat::Nv12 => duplicate(input, out),
        _ => Err(no_path(input, PixelFormat::Nv12)),
    }
}

pub fn to_nv21(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => yuyv_to_nv21(input, out),
        PixelFormat::Rgbx8888 => rgbx_to_nv21(input, out),
        PixelFormat::Nv21 => duplicate(input, out),
        _ => Err(no_path(input, PixelFormat::Nv21)),
    }
}

pub fn to_gray(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    match input.info.format {
        PixelFormat::Yuyv => yuyv_to_y(input, out),
        PixelFormat::Uyvy => uyvy_to_y(input, out),
        PixelFormat::Gray8 => duplicate(input, out),
        _ => Err(no_path(input, PixelFormat::Gray8)),
    }
}

/// Convert `input` into `target`, picking the converter from the input format.
/// MJPEG sources need a [`MjpegDecoder`] and are rejected here.
pub fn convert(input: &FrameBuffer, out: &mut FrameBuffer, target: PixelFormat) -> Result<()> {
    match target {
        PixelFormat::Rgbx8888 => to_rgbx(input, out),
        PixelFormat::Rgb24 => to_rgb(input, out),
        PixelFormat::Bgr24 => to_bgr(input, out),
        PixelFormat::Rgb565 => to_rgb565(input, out),
        PixelFormat::Yuyv => to_yuyv(input, out),
        PixelFormat::Nv12 => to_nv12(input, out),
        PixelFormat::Nv21 => to_nv21(input, out),
        PixelFormat::Gray8 => to_gray(input, out),
        PixelFormat::Uyvy | PixelFormat::Mjpeg if input.info.format == target => {
            duplicate(input, out)
        }
        PixelFormat::Uyvy | PixelFormat::Mjpeg => Err(no_path(input, target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FrameRef;

    fn frame(format: PixelFormat, width: u32, height: u32, data: &[u8]) -> FrameBuffer {
        let mut buf = FrameBuffer::with_capacity(0).unwrap();
        buf.copy_from(&FrameRef::new(FrameInfo::new(width, height, format), data))
            .unwrap();
        buf
    }

    // ===== Dispatch =====

    #[test]
    fn test_dispatch_rejects_unknown_paths() {
        let gray = frame(PixelFormat::Gray8, 2, 1, &[1, 2]);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        for target in [
            PixelFormat::Rgbx8888,
            PixelFormat::Rgb24,
            PixelFormat::Nv21,
            PixelFormat::Mjpeg,
        ] {
            match convert(&gray, &mut out, target) {
                Err(UvcError::NotSupported(msg)) => assert!(msg.contains("GRAY8")),
                other => panic!("Expected NotSupported for {}, got {:?}", target, other),
            }
        }
    }

    #[test]
    fn test_dispatch_same_format_duplicates() {
        let rgbx = frame(PixelFormat::Rgbx8888, 1, 1, &[9, 8, 7, 6]);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        convert(&rgbx, &mut out, PixelFormat::Rgbx8888).unwrap();
        assert_eq!(out.data(), rgbx.data());
        assert_eq!(out.info, rgbx.info);
    }

    #[test]
    fn test_converter_rejects_wrong_source() {
        let rgb = frame(PixelFormat::Rgb24, 2, 1, &[0; 6]);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        assert!(matches!(
            yuyv_to_rgbx(&rgb, &mut out),
            Err(UvcError::InvalidParameter(_))
        ));
    }

    // ===== Sizing =====

    #[test]
    fn test_yuyv_vga_to_rgbx_sizing() {
        let yuyv = frame(PixelFormat::Yuyv, 640, 480, &vec![128u8; 640 * 480 * 2]);
        let mut out = FrameBuffer::with_capacity(16).unwrap();
        to_rgbx(&yuyv, &mut out).unwrap();
        assert_eq!(out.len(), 640 * 480 * 4);
        assert_eq!(out.info.step, 640 * 4);
        assert_eq!(out.info.format, PixelFormat::Rgbx8888);
    }

    #[test]
    fn test_header_propagates() {
        let mut yuyv = frame(PixelFormat::Yuyv, 2, 2, &[128; 8]);
        yuyv.info.sequence = 77;
        yuyv.info.timestamp = std::time::Duration::from_micros(33_333);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        to_nv21(&yuyv, &mut out).unwrap();
        assert_eq!(out.info.sequence, 77);
        assert_eq!(out.info.timestamp, yuyv.info.timestamp);
        assert_eq!((out.info.width, out.info.height), (2, 2));
        assert_eq!(out.info.step, 2);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn test_strided_input_is_clipped_per_row() {
        // 2x2 YUYV with 4 bytes of row padding
        let padded = [
            128, 128, 128, 128, 0xde, 0xad, 0xbe, 0xef, //
            255, 128, 255, 128, 0xde, 0xad, 0xbe, 0xef,
        ];
        let mut yuyv = frame(PixelFormat::Yuyv, 2, 2, &padded);
        yuyv.info.step = 8;
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_rgb(&yuyv, &mut out).unwrap();
        assert_eq!(out.len(), 12);
        assert_eq!(&out.data()[..6], &[128; 6], "First row ignores the padding");
        assert_eq!(&out.data()[6..], &[255; 6], "Second row starts after the stride");
    }
}
