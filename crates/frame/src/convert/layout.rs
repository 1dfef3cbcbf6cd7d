use crate::format::PixelFormat;

/// Byte order of one packed RGB-family pixel.
pub(crate) trait RgbLayout {
    const FORMAT: PixelFormat;
    const BPP: usize;

    fn store(px: &mut [u8], rgb: [u8; 3]);
    fn load(px: &[u8]) -> [u8; 3];
}

pub(crate) struct Rgb;
pub(crate) struct Bgr;
pub(crate) struct Rgbx;
pub(crate) struct Rgb565;

impl RgbLayout for Rgb {
    const FORMAT: PixelFormat = PixelFormat::Rgb24;
    const BPP: usize = 3;

    #[inline]
    fn store(px: &mut [u8], [r, g, b]: [u8; 3]) {
        px[0] = r;
        px[1] = g;
        px[2] = b;
    }

    #[inline]
    fn load(px: &[u8]) -> [u8; 3] {
        [px[0], px[1], px[2]]
    }
}

impl RgbLayout for Bgr {
    const FORMAT: PixelFormat = PixelFormat::Bgr24;
    const BPP: usize = 3;

    #[inline]
    fn store(px: &mut [u8], [r, g, b]: [u8; 3]) {
        px[0] = b;
        px[1] = g;
        px[2] = r;
    }

    #[inline]
    fn load(px: &[u8]) -> [u8; 3] {
        [px[2], px[1], px[0]]
    }
}

impl RgbLayout for Rgbx {
    const FORMAT: PixelFormat = PixelFormat::Rgbx8888;
    const BPP: usize = 4;

    #[inline]
    fn store(px: &mut [u8], [r, g, b]: [u8; 3]) {
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = 0xff;
    }

    #[inline]
    fn load(px: &[u8]) -> [u8; 3] {
        [px[0], px[1], px[2]]
    }
}

impl RgbLayout for Rgb565 {
    const FORMAT: PixelFormat = PixelFormat::Rgb565;
    const BPP: usize = 2;

    // little-endian 5:6:5
    #[inline]
    fn store(px: &mut [u8], [r, g, b]: [u8; 3]) {
        px[0] = ((g << 3) & 0xe0) | (b >> 3);
        px[1] = (r & 0xf8) | (g >> 5);
    }

    #[inline]
    fn load(px: &[u8]) -> [u8; 3] {
        let r = px[1] & 0xf8;
        let g = ((px[1] & 0x07) << 5) | ((px[0] & 0xe0) >> 3);
        let b = px[0] << 3;
        [r, g, b]
    }
}
