//! Tracing subscriber bootstrap.
//!
//! Installs a registry with a reloadable [`EnvFilter`] and a console fmt layer
//! stamped in the local timezone.

use chrono::Local;
use tracing::info;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "build_notify=info";

/// Formats timestamps in the local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Handle used to change the filter of an installed subscriber.
#[derive(Clone)]
pub struct LogFilter {
    handle: Handle<EnvFilter, tracing_subscriber::Registry>,
}

impl LogFilter {
    /// Replace the active filter directive.
    pub fn set_filter(&self, directive: &str) -> Result<()> {
        let filter = parse_filter(directive)?;
        self.handle
            .reload(filter)
            .map_err(|e| Error::Other(format!("Failed to reload log filter: {}", e)))?;
        info!(directive, "Log filter updated");
        Ok(())
    }

    /// The active filter, as a directive string.
    pub fn current(&self) -> Option<String> {
        self.handle.with_current(|f| f.to_string()).ok()
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| Error::config(format!("invalid log filter {:?}: {}", directive, e)))
}

/// Initialize the global subscriber.
///
/// The filter is `directive` when given, else `RUST_LOG`, else
/// [`DEFAULT_LOG_FILTER`]. Fails on an invalid directive or when a global
/// subscriber is already installed.
pub fn init_logging(directive: Option<&str>) -> Result<LogFilter> {
    let filter = match directive {
        Some(d) => parse_filter(d)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    let (filter_layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(LogFilter { handle })
}
