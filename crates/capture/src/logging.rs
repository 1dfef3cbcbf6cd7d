use crate::config::CaptureConfig;
use anyhow::Context;
use common::telemetry::TelemetryGuard;
use tokio::runtime::Runtime;

/// Exporters and the runtime driving them. Both must outlive the pipeline.
pub struct Telemetry {
    _guard: TelemetryGuard,
    _runtime: Runtime,
}

/// Install the log subscriber. With an OTLP endpoint configured, spans and
/// pipeline counters are exported too; hold the returned value until exit.
pub fn setup_logging(config: &CaptureConfig) -> anyhow::Result<Option<Telemetry>> {
    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        common::setup_logging(config.environment);
        return Ok(None);
    };

    // The OTLP exporters need a Tokio runtime for their gRPC channels.
    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
    let guard =
        runtime.block_on(async { TelemetryGuard::init("uvc-preview", endpoint, config.environment) })?;
    tracing::info!(endpoint, "OpenTelemetry export enabled");
    Ok(Some(Telemetry {
        _guard: guard,
        _runtime: runtime,
    }))
}
