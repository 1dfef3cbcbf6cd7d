use super::layout::{Bgr, Rgb, Rgb565, RgbLayout, Rgbx};
use super::{expect_format, map_rows, prepare_output};
use crate::buffer::FrameBuffer;
use crate::format::PixelFormat;
use common::Result;

fn repack<S: RgbLayout, D: RgbLayout>(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    expect_format(input, S::FORMAT)?;
    prepare_output(input, out, D::FORMAT)?;

    map_rows(input, out, |src, dst| {
        for (s, d) in src.chunks_exact(S::BPP).zip(dst.chunks_exact_mut(D::BPP)) {
            D::store(d, S::load(s));
        }
    });
    Ok(())
}

// BT.601 studio range
#[inline]
fn luma([r, g, b]: [u8; 3]) -> u8 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    ((66 * r + 129 * g + 25 * b + 0x1080) >> 8).clamp(0, 255) as u8
}

#[inline]
fn chroma([r, g, b]: [u8; 3]) -> (u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let u = (112 * b - 74 * g - 38 * r + 0x8080) >> 8;
    let v = (112 * r - 94 * g - 18 * b + 0x8080) >> 8;
    (u.clamp(0, 255) as u8, v.clamp(0, 255) as u8)
}

fn average(pixels: &[[u8; 3]]) -> [u8; 3] {
    let n = pixels.len().max(1) as u32;
    let mut sum = [0u32; 3];
    for px in pixels {
        for (acc, c) in sum.iter_mut().zip(px) {
            *acc += *c as u32;
        }
    }
    sum.map(|s| ((s + n / 2) / n) as u8)
}

pub fn rgb_to_rgbx(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    repack::<Rgb, Rgbx>(input, out)
}

pub fn rgb_to_rgb565(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    repack::<Rgb, Rgb565>(input, out)
}

pub fn rgbx_to_rgb(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    repack::<Rgbx, Rgb>(input, out)
}

pub fn rgbx_to_bgr(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    repack::<Rgbx, Bgr>(input, out)
}

pub fn rgbx_to_rgb565(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    repack::<Rgbx, Rgb565>(input, out)
}

/// RGBX to packed 4:2:2, chroma averaged over each horizontal pixel pair.
pub fn rgbx_to_yuyv(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    expect_format(input, PixelFormat::Rgbx8888)?;
    prepare_output(input, out, PixelFormat::Yuyv)?;

    map_rows(input, out, |src, dst| {
        for (pair, yuv) in src.chunks_exact(8).zip(dst.chunks_exact_mut(4)) {
            let a = Rgbx::load(&pair[..4]);
            let b = Rgbx::load(&pair[4..]);
            let (u, v) = chroma(average(&[a, b]));
            yuv[0] = luma(a);
            yuv[1] = u;
            yuv[2] = luma(b);
            yuv[3] = v;
        }
    });
    Ok(())
}

fn row_slice(src: &[u8], start: usize, len: usize) -> &[u8] {
    let start = start.min(src.len());
    let end = (start + len).min(src.len());
    &src[start..end]
}

fn rgbx_to_semi_planar(
    input: &FrameBuffer,
    out: &mut FrameBuffer,
    target: PixelFormat,
) -> Result<()> {
    expect_format(input, PixelFormat::Rgbx8888)?;
    prepare_output(input, out, target)?;

    let width = input.info.width as usize;
    let height = input.info.height as usize;
    let in_step = match input.info.step as usize {
        0 => width * 4,
        step => step,
    };
    let src = input.data();
    let (plane_y, plane_uv) = out.data_mut().split_at_mut(width * height);

    for y in 0..height {
        let luma_row = &mut plane_y[y * width..(y + 1) * width];
        for (px, out_y) in row_slice(src, y * in_step, width * 4)
            .chunks_exact(4)
            .zip(luma_row.iter_mut())
        {
            *out_y = luma(Rgbx::load(px));
        }
    }

    for pair in 0..height / 2 {
        let top = row_slice(src, 2 * pair * in_step, width * 4);
        let bottom = row_slice(src, (2 * pair + 1) * in_step, width * 4);
        let uv = &mut plane_uv[pair * width..(pair + 1) * width];
        for ((t, b), c) in top
            .chunks_exact(8)
            .zip(bottom.chunks_exact(8))
            .zip(uv.chunks_exact_mut(2))
        {
            let (u, v) = chroma(average(&[
                Rgbx::load(&t[..4]),
                Rgbx::load(&t[4..]),
                Rgbx::load(&b[..4]),
                Rgbx::load(&b[4..]),
            ]));
            match target {
                PixelFormat::Nv21 => {
                    c[0] = v;
                    c[1] = u;
                }
                _ => {
                    c[0] = u;
                    c[1] = v;
                }
            }
        }
    }
    Ok(())
}

pub fn rgbx_to_nv12(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    rgbx_to_semi_planar(input, out, PixelFormat::Nv12)
}

pub fn rgbx_to_nv21(input: &FrameBuffer, out: &mut FrameBuffer) -> Result<()> {
    rgbx_to_semi_planar(input, out, PixelFormat::Nv21)
}
