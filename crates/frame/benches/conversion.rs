use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use frame::{FrameBuffer, FrameInfo, FrameRef, MjpegDecoder, PixelFormat, convert};

const SIZES: [(u32, u32, &str); 3] = [(640, 480, "VGA"), (1280, 720, "HD"), (1920, 1080, "Full HD")];

/// JPEG-encoded gradient, the shape of a typical MJPEG webcam frame.
fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    use image::{ImageEncoder, codecs::jpeg::JpegEncoder};

    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push(((x * 255) / width) as u8);
            pixels.push(((y * 255) / height) as u8);
            pixels.push((((x + y) * 127) / (width + height)) as u8);
        }
    }

    let mut jpeg_data = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_data, quality)
        .write_image(&pixels, width, height, image::ExtendedColorType::Rgb8)
        .expect("Failed to encode test JPEG");
    jpeg_data
}

fn frame_from(format: PixelFormat, width: u32, height: u32, data: &[u8]) -> FrameBuffer {
    let mut frame = FrameBuffer::with_capacity(data.len()).expect("allocate input");
    frame
        .copy_from(&FrameRef::new(FrameInfo::new(width, height, format), data))
        .expect("copy input");
    frame
}

fn benchmark_mjpeg_to_rgbx(c: &mut Criterion) {
    let mut group = c.benchmark_group("mjpeg_to_rgbx");
    let mut decoder = MjpegDecoder::new().expect("turbojpeg decompressor");

    for (width, height, label) in SIZES {
        let input = frame_from(PixelFormat::Mjpeg, width, height, &create_test_jpeg(width, height, 85));
        let mut out = FrameBuffer::with_capacity(0).expect("allocate output");
        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_with_input(BenchmarkId::new("turbojpeg", label), &input, |b, input| {
            b.iter(|| decoder.decode_to_rgbx(black_box(input), &mut out))
        });
    }
    group.finish();
}

fn benchmark_yuyv_conversions(c: &mut Criterion) {
    let mut group = c.benchmark_group("yuyv_conversion");

    for (width, height, label) in SIZES {
        let raw: Vec<u8> = (0..width * height * 2).map(|i| (i % 251) as u8).collect();
        let input = frame_from(PixelFormat::Yuyv, width, height, &raw);
        let mut out = FrameBuffer::with_capacity(0).expect("allocate output");
        group.throughput(Throughput::Elements((width * height) as u64));

        for target in [PixelFormat::Rgbx8888, PixelFormat::Rgb565, PixelFormat::Nv21] {
            group.bench_with_input(BenchmarkId::new(target.as_str(), label), &input, |b, input| {
                b.iter(|| convert::convert(black_box(input), &mut out, target))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_mjpeg_to_rgbx, benchmark_yuyv_conversions);
criterion_main!(benches);
