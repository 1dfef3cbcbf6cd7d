pub mod callback;
pub mod camera;
pub mod config;
pub mod decoder;
pub mod device;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use callback::{CallbackFormat, FrameCallback};
pub use camera::UvcCamera;
pub use decoder::PreviewDecoder;
pub use device::{V4l2Source, open_device};
pub use metrics::{DropReason, PipelineStats, StatsSnapshot};
pub use pipeline::{Phase, PreviewPipeline};
pub use sink::{FrameSink, MemorySink, SinkBuffer};
pub use source::{FrameHandler, FrameSource, NegotiatedStream, StreamRequest};
