// file: src/logging/logger.rs
// version: 2.0.0
// guid: j0k1l2m3-n4o5-6789-0123-456789jklmno

//! Logger initialization and configuration

use crate::error::ProvisionError;
use crate::Result;
use std::io::IsTerminal;
use std::path::Path;
use tracing::Instrument;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Pick the log filter: `RUST_LOG` wins, otherwise the verbosity flags
fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Initialize the logging system
///
/// Log lines are timestamped and written to standard error, coloured when
/// stderr is a terminal. When `log_file` is set, an additional plain-text
/// copy is appended to that file.
pub fn init_logger(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_filter(build_filter(verbose, quiet));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(file)
                    .with_filter(build_filter(verbose, quiet)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ProvisionError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Create a scoped logger for operations
pub fn with_operation_span<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let span = tracing::info_span!("operation", name = operation);
    let _enter = span.enter();
    f()
}

/// Run a future inside a `stage` span
pub async fn with_async_operation_span<Fut, R>(operation: &str, fut: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    let span = tracing::info_span!("stage", name = operation);
    fut.instrument(span).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice_fails_gracefully() {
        // Arrange
        let _ = init_logger(false, false, None);

        // Act
        let second = init_logger(true, false, None);

        // Assert
        assert!(second.is_err());
    }

    #[test]
    fn test_with_operation_span_with_return_value() {
        let result = with_operation_span("math_operation", || 2 + 2);
        assert_eq!(result, 4);
    }

    #[tokio::test]
    async fn test_with_async_operation_span() {
        // Arrange
        let executed = std::sync::atomic::AtomicBool::new(false);

        // Act
        let result = with_async_operation_span("async_test_operation", async {
            executed.store(true, std::sync::atomic::Ordering::SeqCst);
            "async_result"
        })
        .await;

        // Assert
        assert!(executed.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(result, "async_result");
    }
}
