//! Structured logging setup.
//!
//! `tracing` events go through an `EnvFilter`, a sampling layer and a JSON or
//! pretty `fmt` layer, optionally behind a `tracing-appender` non-blocking
//! writer. Configuration comes from the environment:
//!
//! | Variable                       | Values                          | Default |
//! |--------------------------------|---------------------------------|---------|
//! | `TABLEGATE_LOG_LEVEL`          | trace, debug, info, warn, error | info    |
//! | `TABLEGATE_LOG_FORMAT`         | json, pretty                    | json    |
//! | `TABLEGATE_LOG_SAMPLING_MODE`  | all, error-only, sampled        | all     |
//! | `TABLEGATE_LOG_SAMPLING_RATE`  | 0.0 - 1.0                       | 0.1     |
//! | `TABLEGATE_LOG_ASYNC`          | true, false                     | true    |
//! | `TABLEGATE_LOG_TARGET_FILTER`  | comma-separated directives      |         |
//! | `TABLEGATE_LOG_INCLUDE_LOCATION` | true, false                   | false   |
//!
//! `RUST_LOG`, when set, takes precedence over `TABLEGATE_LOG_LEVEL`.

use anyhow::{Context, Result};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::subscriber::Interest;
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    All,
    /// WARN and ERROR only
    ErrorOnly,
    /// Every WARN/ERROR, a fraction of the rest
    Sampled,
}

impl SamplingMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction of non-error events kept in `Sampled` mode
    pub sampling_rate: f64,
    pub async_logging: bool,
    pub target_filter: Option<String>,
    pub include_location: bool,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("TABLEGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(&env::var("TABLEGATE_LOG_FORMAT").unwrap_or_default()),
            sampling_mode: SamplingMode::parse(
                &env::var("TABLEGATE_LOG_SAMPLING_MODE").unwrap_or_default(),
            ),
            sampling_rate: env::var("TABLEGATE_LOG_SAMPLING_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
            async_logging: env_flag("TABLEGATE_LOG_ASYNC", true),
            target_filter: env::var("TABLEGATE_LOG_TARGET_FILTER").ok(),
            include_location: env_flag("TABLEGATE_LOG_INCLUDE_LOCATION", false),
        }
    }

    /// Verbose synchronous pretty output for local work and tests
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }
}

/// Drops a share of low-severity events according to [`SamplingMode`]
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, level: &Level) -> bool {
        let severe = matches!(*level, Level::WARN | Level::ERROR);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => severe,
            SamplingMode::Sampled => {
                if severe {
                    return true;
                }
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                let interval = (1.0 / self.sampling_rate) as u64;
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                interval > 0 && count % interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    // Decided per event; a cached `never` would silence a callsite for good.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        !metadata.is_event() || self.should_sample(metadata.level())
    }
}

/// Install the global subscriber.
///
/// With async logging the returned guard flushes buffered lines when dropped;
/// keep it alive until exit.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let default_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));
    env_filter = env_filter.add_directive(
        "may_minihttp=warn"
            .parse()
            .context("invalid built-in log directive")?,
    );
    if let Some(targets) = &config.target_filter {
        for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(d) => env_filter = env_filter.add_directive(d),
                Err(_) => eprintln!("Warning: invalid log filter directive: {directive}"),
            }
        }
    }

    let (writer, guard) = if config.async_logging {
        let (nb, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
