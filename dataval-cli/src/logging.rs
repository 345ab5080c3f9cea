//! Logging setup for the dataval CLI
//!
//! Logs go to stderr so stdout carries only report output.
//! `RUST_LOG` overrides the level given on the command line.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Install the global subscriber; a second call is a no-op
pub fn init_logging(log_level: &str, log_format: LogFormat) {
    let subscriber = tracing_subscriber::registry().with(build_filter(log_level));

    match log_format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_writer(std::io::stderr);
            let _ = subscriber.with(fmt_layer).try_init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = subscriber.with(fmt_layer).try_init();
        }
    }

    tracing::debug!(log_level = %log_level, "logging initialized");
}
