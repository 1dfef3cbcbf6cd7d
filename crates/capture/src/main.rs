use anyhow::Context;
use capture::{
    MemorySink, UvcCamera, V4l2Source, config::CaptureConfig, logging::setup_logging,
    open_device,
};
use control::{ControlId, V4l2Transport};
use frame::{FrameBuffer, PixelFormat};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const LOGGED_CONTROLS: [ControlId; 3] = [
    ControlId::Brightness,
    ControlId::Contrast,
    ControlId::FocusAbsolute,
];

fn main() -> anyhow::Result<()> {
    let config = CaptureConfig::from_env()?;
    let _telemetry = setup_logging(&config)?;
    let shutdown = Arc::new(AtomicBool::new(false));

    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    tracing::info!("Signal handlers registered (SIGTERM, SIGINT)");

    let device = Arc::new(
        open_device(config.device_id)
            .context("Failed to open camera - check V4L2 device availability")?,
    );
    let transport =
        V4l2Transport::new(Arc::clone(&device)).context("Failed to enumerate camera controls")?;
    let bitmaps = transport.bitmaps();

    let mut camera = UvcCamera::new();
    camera.connect(
        Box::new(V4l2Source::new(device)),
        Box::new(transport),
        bitmaps,
    )?;

    for id in LOGGED_CONTROLS {
        match camera.obtain_limit(id) {
            Ok(limits) => tracing::info!(
                control = ?id,
                min = limits.min,
                max = limits.max,
                default = limits.def,
                "Control limits"
            ),
            Err(e) => tracing::debug!(control = ?id, error = %e, "Control unavailable"),
        }
    }

    camera.set_preview_size(config.width, config.height, config.format, config.fps)?;
    let preview = MemorySink::new(PixelFormat::Rgbx8888);
    camera.set_preview_sink(Some(Box::new(preview.clone())))?;

    let callback_frames = Arc::new(AtomicU64::new(0));
    if let Some(format) = config.callback_format {
        let counter = Arc::clone(&callback_frames);
        camera.set_frame_callback(
            Some(Box::new(move |_: &FrameBuffer| {
                counter.fetch_add(1, Ordering::Relaxed);
            })),
            format,
        )?;
        tracing::info!(format = %format, "Frame callback registered");
    }

    camera
        .start_preview()
        .context("Failed to start preview stream")?;

    let mut last_status = Instant::now();
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
        if last_status.elapsed() < config.status_interval {
            continue;
        }
        last_status = Instant::now();

        let stats = camera.stats()?;
        tracing::info!(
            received = stats.received,
            previewed = stats.previewed,
            captured = stats.captured,
            dropped_queue_full = stats.dropped_queue_full,
            dropped_pool = stats.dropped_pool,
            dropped_convert = stats.dropped_convert,
            presented = preview.presented(),
            callback_frames = callback_frames.load(Ordering::Relaxed),
            callback_format = ?config.callback_format,
            "Status"
        );
    }

    camera.stop_preview()?;
    camera.release()?;
    tracing::info!("Preview stopped gracefully");
    Ok(())
}
