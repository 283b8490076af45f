//! # Structured Logging
//!
//! The library only emits `tracing` events. Binaries and tests that want to
//! see them install a subscriber here, filtered by `RUST_LOG` and written
//! to stderr as pretty text or JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for local runs.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) is JSON, anything else is pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `default_level`,
/// e.g. `RUST_LOG=zkcred_protocol::smt=debug`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed. Use
/// [`try_init_logging`] where that can happen.
pub fn init_logging(default_level: &str, format: LogFormat) {
    if let Err(e) = try_init_logging(default_level, format) {
        panic!("failed to install tracing subscriber: {e}");
    }
}

/// Like [`init_logging`], but reports an already-installed subscriber as an
/// error instead of panicking.
pub fn try_init_logging(
    default_level: &str,
    format: LogFormat,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
            .try_init()?,
    }

    tracing::debug!(?format, "logging initialized");
    Ok(())
}
