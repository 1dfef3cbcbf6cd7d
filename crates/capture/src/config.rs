use crate::callback::CallbackFormat;
use anyhow::{Context, Result, bail};
use common::env_or;
use frame::PixelFormat;
use std::env;
use std::time::Duration;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub environment: Environment,
    pub device_id: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub callback_format: Option<CallbackFormat>,
    pub status_interval: Duration,
    pub otlp_endpoint: Option<String>,
}

fn parse_preview_format(raw: &str) -> Result<PixelFormat> {
    match raw.trim().to_lowercase().as_str() {
        "mjpeg" | "mjpg" => Ok(PixelFormat::Mjpeg),
        "yuyv" => Ok(PixelFormat::Yuyv),
        other => bail!("PREVIEW_FORMAT must be mjpeg or yuyv, got {:?}", other),
    }
}

impl CaptureConfig {
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_env();

        let format = match env::var("PREVIEW_FORMAT") {
            Ok(raw) => parse_preview_format(&raw)?,
            Err(_) => PixelFormat::Mjpeg,
        };

        let callback_format = env::var("CALLBACK_FORMAT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<CallbackFormat>())
            .transpose()
            .context("Invalid CALLBACK_FORMAT")?;

        let otlp_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            environment,
            device_id: env_or("DEVICE_ID", 0),
            width: env_or("PREVIEW_WIDTH", 640),
            height: env_or("PREVIEW_HEIGHT", 480),
            fps: env_or("PREVIEW_FPS", 30),
            format,
            callback_format,
            status_interval: Duration::from_secs(env_or("STATUS_INTERVAL_SECS", 5).max(1)),
            otlp_endpoint,
        })
    }
}
