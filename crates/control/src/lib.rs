pub mod cache;
pub mod ids;
pub mod layout;
pub mod record;
pub mod transport;
pub mod v4l2;

pub use cache::DeviceControls;
pub use ids::{ControlBitmaps, ControlId, Selector, Unit};
pub use layout::{Field, FieldLayout};
pub use record::{ControlLimits, ControlRecord};
pub use transport::{ControlTransport, Request};
pub use v4l2::V4l2Transport;
