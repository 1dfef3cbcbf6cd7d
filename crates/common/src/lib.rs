pub mod config;
pub mod errors;
pub mod logging;
pub mod retry;
pub mod telemetry;

pub use config::{Environment, env_or};
pub use errors::{Result, UvcError};
pub use logging::setup_logging;
pub use retry::retry_with_backoff;
