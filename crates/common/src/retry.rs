use std::time::Duration;

/// Retry a function with exponential backoff.
///
/// `base_delay_ms` doubles after every failed attempt. The last error is
/// returned once `max_retries` attempts have failed.
pub fn retry_with_backoff<F, T, E>(
    mut f: F,
    max_retries: u32,
    base_delay_ms: u64,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let attempts = max_retries.max(1);
    let mut attempt = 0;
    loop {
        match f() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < attempts => {
                let delay_ms = base_delay_ms.saturating_mul(2_u64.saturating_pow(attempt));
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms,
                    "{} failed: {}. Retrying...",
                    operation_name,
                    e
                );
                std::thread::sleep(Duration::from_millis(delay_ms));
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("{} failed after {} attempts: {}", operation_name, attempts, e);
                return Err(e);
            }
        }
    }
}
