pub mod buffer;
pub mod convert;
pub mod format;
pub mod pool;

pub use buffer::{FrameBuffer, FrameInfo, FrameRef};
pub use convert::MjpegDecoder;
pub use format::PixelFormat;
pub use pool::{FRAME_POOL_SIZE, FramePool};
