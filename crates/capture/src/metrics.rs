use opentelemetry::{
    KeyValue, global,
    metrics::Counter,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// Frames between preview status lines at debug level.
pub const STATUS_EVERY_FRAMES: u32 = 30;

/// Whether the frame with this device sequence number logs a status line.
pub fn status_due(sequence: u32) -> bool {
    sequence % STATUS_EVERY_FRAMES == 0
}

/// Why a frame never reached the preview sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Preview queue already held its maximum.
    QueueFull,
    /// The frame pool could not provide a buffer.
    Pool,
    /// Decoding or conversion failed.
    Convert,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::QueueFull => "queue_full",
            DropReason::Pool => "pool",
            DropReason::Convert => "convert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub received: u64,
    pub dropped_queue_full: u64,
    pub dropped_pool: u64,
    pub dropped_convert: u64,
    pub previewed: u64,
    pub captured: u64,
}

impl StatsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.dropped_queue_full + self.dropped_pool + self.dropped_convert
    }
}

/// Frame counters of one pipeline, mirrored to OpenTelemetry.
#[derive(Debug)]
pub struct PipelineStats {
    received: AtomicU64,
    dropped_queue_full: AtomicU64,
    dropped_pool: AtomicU64,
    dropped_convert: AtomicU64,
    previewed: AtomicU64,
    captured: AtomicU64,
    received_counter: Counter<u64>,
    dropped_counter: Counter<u64>,
    previewed_counter: Counter<u64>,
    captured_counter: Counter<u64>,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        let meter = global::meter("uvc-capture");
        Self {
            received: AtomicU64::new(0),
            dropped_queue_full: AtomicU64::new(0),
            dropped_pool: AtomicU64::new(0),
            dropped_convert: AtomicU64::new(0),
            previewed: AtomicU64::new(0),
            captured: AtomicU64::new(0),
            received_counter: meter
                .u64_counter("uvc_frames_received_total")
                .with_description("Frames delivered by the frame source")
                .build(),
            dropped_counter: meter
                .u64_counter("uvc_frames_dropped_total")
                .with_description("Frames dropped before reaching the preview sink")
                .build(),
            previewed_counter: meter
                .u64_counter("uvc_frames_previewed_total")
                .with_description("Frames converted for preview")
                .build(),
            captured_counter: meter
                .u64_counter("uvc_frames_captured_total")
                .with_description("Frames delivered to the capture sink or callback")
                .build(),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        self.received_counter.add(1, &[]);
    }

    pub fn record_dropped(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::QueueFull => &self.dropped_queue_full,
            DropReason::Pool => &self.dropped_pool,
            DropReason::Convert => &self.dropped_convert,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.dropped_counter
            .add(1, &[KeyValue::new("reason", reason.as_str())]);
    }

    pub fn record_previewed(&self) {
        self.previewed.fetch_add(1, Ordering::Relaxed);
        self.previewed_counter.add(1, &[]);
    }

    pub fn record_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
        self.captured_counter.add(1, &[]);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            dropped_pool: self.dropped_pool.load(Ordering::Relaxed),
            dropped_convert: self.dropped_convert.load(Ordering::Relaxed),
            previewed: self.previewed.load(Ordering::Relaxed),
            captured: self.captured.load(Ordering::Relaxed),
        }
    }
}
