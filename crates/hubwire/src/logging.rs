use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Crates whose events follow `--log-level`.
const HUBWIRE_TARGETS: [&str; 5] = [
    "hubwire",
    "hubwire_transport",
    "hubwire_frame",
    "hubwire_proto",
    "hubwire_hub",
];

/// Everything else (serial driver, etc.) is held to warnings.
const OTHER_TARGETS: LevelFilter = LevelFilter::WARN;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    /// Includes raw wire bytes for every frame.
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn targets(level: LogLevel) -> Targets {
    HUBWIRE_TARGETS
        .iter()
        .fold(Targets::new().with_default(OTHER_TARGETS), |t, target| {
            t.with_target(*target, level.as_filter())
        })
}

/// Logs go to stderr; stdout carries command output only.
///
/// Lines carry the thread name (`hubwire-events` or `hubwire-commands` for
/// the hub workers) and the module that logged them.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = targets(level);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true);

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(filter))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn level_applies_to_hubwire_crates_only() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("hubwire_hub::command_loop", &Level::DEBUG));
        assert!(filter.would_enable("hubwire_frame::reader", &Level::DEBUG));
        assert!(!filter.would_enable("hubwire_hub::event_loop", &Level::TRACE));
        assert!(!filter.would_enable("serialport::posix", &Level::INFO));
        assert!(filter.would_enable("serialport::posix", &Level::WARN));
    }

    #[test]
    fn quiet_level_still_shows_errors() {
        let filter = targets(LogLevel::Error);
        assert!(filter.would_enable("hubwire", &Level::ERROR));
        assert!(!filter.would_enable("hubwire", &Level::WARN));
    }
}
