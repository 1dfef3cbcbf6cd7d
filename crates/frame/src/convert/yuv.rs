use super::layout::{Bgr, Rgb, Rgb565, RgbLayout, Rgbx};
use super::{expect_format, map_rows, prepare_output};
use crate::buffer::FrameBuffer;
use crate::format::PixelFormat;
use common::Result;

/// Byte positions inside one 4-byte 4:2:2 macropixel.
#[derive(Debug, Clone, Copy)]
struct Packing {
    y0: usize,
    u: usize,
    y1: usize,
    v: usize,
}

const YUYV: Packing = Packing {
    y0: 0,
    u: 1,
    y1: 2,
    v: 3,
};

const UYVY: Packing = Packing {
    u: 0,
    y0: 1,
    v: 2,
    y1: 3,
};

#[inline]
fn saturate(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Fixed-point BT.601 chroma offsets `(r, g, b)` for one U/V pair.
#[inline]
fn chroma_terms(u: u8, v: u8) -> (i32, i32, i32) {
    let du = u as i32 - 128;
    let dv = v as i32 - 128;
    let r = (22987 * dv) >> 14;
    let g = (-5636 * du - 11698 * dv) >> 14;
    let b = (29049 * du) >> 14;
    (r, g, b)
}

#[inline]
fn apply(y: u8, (r, g, b): (i32, i32, i32)) -> [u8; 3] {
    let y = y as i32;
    [saturate(y + r), saturate(y + g), saturate(y + b)]
}

fn packed_to_rgb<L: RgbLayout>(
    input: &FrameBuffer,
    out: &mut FrameBuffer,
    source: PixelFormat,
    packing: Packing,
) -> Result<()> {
    expect_format(input, source)?;
    prepare_output(input, out, L::FORMAT)?;

    map_rows(input, out, |src, dst| {
        for (yuv, rgb) in src.chunks_exact(4).zip(dst.chunks_exact_mut(2 * L::BPP)) {
            let terms = chroma_terms(yuv[packing.u], yuv[packing.v]);
            let (first, second) = rgb.split_at_mut(L::BPP);
            L::store(first, apply(yuv[packing.y0], terms));
            L::store(second, apply(yuv[packing.y1], terms));
        }
    });
    Ok(())
}

/// One output byte per pixel, taken at `offset` within each 2-byte pixel.
fn packed_plane(
    input: &FrameBuffer,
    out: &mut FrameBuffer,
    source: PixelFormat,
    offset: usize,
) -> Result<()> {
    expect_format(input, source)?;
    prepare_output(input, out, PixelFormat::Gray8)?;

    map_rows(input, out, |src, dst| {
        for (px, byte) in src.chunks_exact(2).zip(dst.iter_mut()) {
            *byte = px[offset];
        }
    });
    Ok(())
}

/// 4:2:2 to semi-planar 4:2:0. Chroma comes from the even row of each pair.
fn packed_to_semi_planar(
    input: &FrameBuffer,
    out: &mut FrameBuffer,
    source: PixelFormat,
    packing: Packing,
    target: PixelFormat,
) -> Result<()> {
    expect_format(input, source)?;
    prepare_output(input, out, target)?;

    let width = input.info.width as usize;
    let height = input.info.height as usize;
    let in_step = match input.info.step as usize {
        0 => width * 2,
        step => step,
    };
    let (first, second) = match target {
        PixelFormat::Nv21 => (packing.v, packing.u),
        _ => (packing.u, packing.v),
    };

    let src = input.data();
    let (luma, chroma) = out.data_mut().split_at_mut(width * height);

    for pair in 0..height / 2 {
        let row0 = src.get(2 * pair * in_step..).unwrap_or(&[]);
        let row1 = src.get((2 * pair + 1) * in_step..).unwrap_or(&[]);
        let (luma0, luma1) = luma[2 * pair * width..(2 * pair + 2) * width].split_at_mut(width);
        let uv = &mut chroma[pair * width..(pair + 1) * width];

        let macros = row0
            .chunks_exact(4)
            .zip(row1.chunks_exact(4))
            .zip(luma0.chunks_exact_mut(2))
            .zip(luma1.chunks_exact_mut(2))
            .zip(uv.chunks_exact_mut(2))
            .take(width / 2);
        for ((((even, odd), y0), y1), c) in macros {
            y0[0] = even[packing.y0];
            y0[1] = even[packing.y1];
            y1[0] = odd[packing.y0];
            y1[1] = odd[packing.y1];
            c[0] = even[first];
            c[1] = even[second];
        }
    }
    Ok(())
}

pub fn yuyv_to_rgb(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Rgb>(input, out, PixelFormat::Yuyv, YUYV)
}

pub fn yuyv_to_bgr(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Bgr>(input, out, PixelFormat::Yuyv, YUYV)
}

pub fn yuyv_to_rgbx(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Rgbx>(input, out, PixelFormat::Yuyv, YUYV)
}

pub fn yuyv_to_rgb565(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Rgb565>(input, out, PixelFormat::Yuyv, YUYV)
}

pub fn uyvy_to_rgb(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Rgb>(input, out, PixelFormat::Uyvy, UYVY)
}

pub fn uyvy_to_bgr(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Bgr>(input, out, PixelFormat::Uyvy, UYVY)
}

pub fn uyvy_to_rgbx(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Rgbx>(input, out, PixelFormat::Uyvy, UYVY)
}

pub fn uyvy_to_rgb565(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_rgb::<Rgb565>(input, out, PixelFormat::Uyvy, UYVY)
}

/// Luma plane of a YUYV frame as GRAY8.
pub fn yuyv_to_y(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_plane(input, out, PixelFormat::Yuyv, 0)
}

/// Interleaved chroma of a YUYV frame, one byte per pixel, tagged GRAY8.
pub fn yuyv_to_uv(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_plane(input, out, PixelFormat::Yuyv, 1)
}

pub fn uyvy_to_y(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_plane(input, out, PixelFormat::Uyvy, 1)
}

pub fn yuyv_to_nv12(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_semi_planar(input, out, PixelFormat::Yuyv, YUYV, PixelFormat::Nv12)
}

pub fn yuyv_to_nv21(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    packed_to_semi_planar(input, out, PixelFormat::Yuyv, YUYV, PixelFormat::Nv21)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{FrameInfo, FrameRef};

    fn packed(format: PixelFormat, width: u32, height: u32, data: &[u8]) -> FrameBuffer {
        let mut buf = FrameBuffer::with_capacity(0).unwrap();
        buf.copy_from(&FrameRef::new(FrameInfo::new(width, height, format), data))
            .unwrap();
        buf
    }

    // ===== Numeric =====

    #[test]
    fn test_mid_gray_has_no_chroma_offset() {
        let yuyv = packed(PixelFormat::Yuyv, 2, 1, &[128, 128, 128, 128]);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_rgb(&yuyv, &mut out).unwrap();
        assert_eq!(out.data(), &[128, 128, 128, 128, 128, 128]);
    }

    #[test]
    fn test_fixed_point_formula_is_exact() {
        // U=90, V=200: du=-38, dv=72
        // r = (22987*72)>>14 = 101, g = (214168-842256)>>14 = -39, b = (29049*-38)>>14 = -68
        let yuyv = packed(PixelFormat::Yuyv, 2, 1, &[100, 90, 20, 200]);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_rgb(&yuyv, &mut out).unwrap();
        assert_eq!(
            out.data(),
            &[201, 61, 32, 121, 0, 0],
            "Second pixel saturates green and blue at 0"
        );
    }

    #[test]
    fn test_saturates_high() {
        let yuyv = packed(PixelFormat::Yuyv, 2, 1, &[250, 255, 250, 255]);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_rgbx(&yuyv, &mut out).unwrap();
        assert_eq!(out.data()[0], 255, "Red saturates at 255");
        assert_eq!(out.data()[2], 255, "Blue saturates at 255");
        assert_eq!(out.data()[3], 0xff, "Filler byte is opaque");
    }

    #[test]
    fn test_uyvy_matches_yuyv() {
        let yuyv = packed(PixelFormat::Yuyv, 2, 1, &[100, 90, 20, 200]);
        let uyvy = packed(PixelFormat::Uyvy, 2, 1, &[90, 100, 200, 20]);
        let mut a = FrameBuffer::with_capacity(0).unwrap();
        let mut b = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_bgr(&yuyv, &mut a).unwrap();
        uyvy_to_bgr(&uyvy, &mut b).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(b.info.format, PixelFormat::Bgr24);
    }

    #[test]
    fn test_rgb565_output_size() {
        let yuyv = packed(PixelFormat::Yuyv, 4, 2, &[128; 16]);
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_rgb565(&yuyv, &mut out).unwrap();
        assert_eq!(out.len(), 16);
        assert_eq!(out.info.step, 8);
    }

    // ===== Planes =====

    #[test]
    fn test_luma_and_chroma_extraction() {
        let yuyv = packed(PixelFormat::Yuyv, 4, 1, &[10, 20, 30, 40, 50, 60, 70, 80]);
        let mut y = FrameBuffer::with_capacity(0).unwrap();
        let mut uv = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_y(&yuyv, &mut y).unwrap();
        yuyv_to_uv(&yuyv, &mut uv).unwrap();
        assert_eq!(y.data(), &[10, 30, 50, 70]);
        assert_eq!(uv.data(), &[20, 40, 60, 80]);
        assert_eq!(uv.info.format, PixelFormat::Gray8);

        let uyvy = packed(PixelFormat::Uyvy, 4, 1, &[20, 10, 40, 30, 60, 50, 80, 70]);
        uyvy_to_y(&uyvy, &mut y).unwrap();
        assert_eq!(y.data(), &[10, 30, 50, 70]);
    }

    #[test]
    fn test_nv12_and_nv21_subsampling() {
        // 2x2: row0 = Y0 U Y1 V, row1 = Y2 U' Y3 V'
        let yuyv = packed(PixelFormat::Yuyv, 2, 2, &[1, 50, 2, 60, 3, 51, 4, 61]);
        let mut nv12 = FrameBuffer::with_capacity(0).unwrap();
        let mut nv21 = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_nv12(&yuyv, &mut nv12).unwrap();
        yuyv_to_nv21(&yuyv, &mut nv21).unwrap();
        assert_eq!(nv12.data(), &[1, 2, 3, 4, 50, 60], "Chroma taken from the even row");
        assert_eq!(nv21.data(), &[1, 2, 3, 4, 60, 50], "NV21 swaps chroma order");
        assert_eq!(nv21.info.format, PixelFormat::Nv21);
    }

    #[test]
    fn test_truncated_input_does_not_panic() {
        let mut yuyv = packed(PixelFormat::Yuyv, 2, 2, &[128; 4]);
        yuyv.info.step = 4;
        let mut out = FrameBuffer::with_capacity(0).unwrap();
        yuyv_to_nv12(&yuyv, &mut out).unwrap();
        assert_eq!(out.len(), 6, "Output keeps its declared size");
    }
}
