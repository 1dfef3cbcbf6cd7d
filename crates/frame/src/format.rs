use std::fmt;

/// Pixel encodings a frame can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    Mjpeg,
    #[default]
    Yuyv,
    Uyvy,
    Rgb24,
    Bgr24,
    Rgb565,
    Rgbx8888,
    Nv12,
    Nv21,
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats. `None` for compressed and planar formats.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Yuyv | PixelFormat::Uyvy | PixelFormat::Rgb565 => Some(2),
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(3),
            PixelFormat::Rgbx8888 => Some(4),
            PixelFormat::Gray8 => Some(1),
            PixelFormat::Mjpeg | PixelFormat::Nv12 | PixelFormat::Nv21 => None,
        }
    }

    /// Exact payload size of a `width` x `height` frame, `None` for MJPEG.
    pub fn frame_bytes(self, width: u32, height: u32) -> Option<usize> {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Nv12 | PixelFormat::Nv21 => Some(pixels * 3 / 2),
            PixelFormat::Mjpeg => None,
            packed => packed.bytes_per_pixel().map(|bpp| pixels * bpp),
        }
    }

    /// Row stride of a tightly packed frame. Semi-planar frames report the
    /// luma stride, compressed frames report 0.
    pub fn packed_step(self, width: u32) -> u32 {
        match self {
            PixelFormat::Mjpeg => 0,
            PixelFormat::Nv12 | PixelFormat::Nv21 => width,
            packed => width * packed.bytes_per_pixel().unwrap_or(1) as u32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Mjpeg => "MJPEG",
            PixelFormat::Yuyv => "YUYV",
            PixelFormat::Uyvy => "UYVY",
            PixelFormat::Rgb24 => "RGB24",
            PixelFormat::Bgr24 => "BGR24",
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Rgbx8888 => "RGBX8888",
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Nv21 => "NV21",
            PixelFormat::Gray8 => "GRAY8",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
