//! Stderr logging for binaries and examples.
//!
//! Library code only uses the `log` macros. A binary installs one sink at
//! start-up: [`init_with_level`] or [`init_from_env`] for the plain stderr
//! logger, or `init_tracing` (feature `tracing`) for a subscriber that also
//! records the detector and estimator spans.
//!
//! Filters use `RUST_LOG`-style directives, e.g. `warn,fillcam_detect=debug`.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable read by [`init_from_env`] and `init_tracing`.
pub const LOG_ENV: &str = "FILLCAM_LOG";

/// Default level plus per-target overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    pub default: LevelFilter,
    /// `(target prefix, level)`; the longest matching prefix wins.
    pub targets: Vec<(String, LevelFilter)>,
}

impl LogFilter {
    pub fn new(default: LevelFilter) -> Self {
        Self {
            default,
            targets: Vec::new(),
        }
    }

    /// Parse `level` and `target=level` directives separated by commas.
    /// Unknown levels are skipped.
    pub fn parse(directives: &str) -> Self {
        let mut filter = Self::new(LevelFilter::Info);
        for part in directives.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((target, level)) => {
                    if let Ok(level) = level.trim().parse() {
                        filter.targets.push((target.trim().to_string(), level));
                    }
                }
                None => {
                    if let Ok(level) = part.parse() {
                        filter.default = level;
                    }
                }
            }
        }
        filter
    }

    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| target.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default, |(_, level)| *level)
    }

    /// Most verbose level any target can reach.
    pub fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|(_, l)| *l)
            .fold(self.default, Ord::max)
    }
}

struct StderrSink {
    filter: LogFilter,
    started: Instant,
}

impl Log for StderrSink {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let crate_name = record.target().split("::").next().unwrap_or_default();
        let line = format!(
            "{:>9.3}s {:<5} {crate_name}: {}\n",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.args()
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static SINK: OnceLock<StderrSink> = OnceLock::new();

/// Install the stderr logger with `filter`. Later calls are no-ops.
pub fn init_with_filter(filter: LogFilter) -> Result<(), log::SetLoggerError> {
    if SINK.get().is_some() {
        return Ok(());
    }
    let max = filter.max_level();
    let sink = SINK.get_or_init(|| StderrSink {
        filter,
        started: Instant::now(),
    });
    log::set_logger(sink)?;
    log::set_max_level(max);
    Ok(())
}

/// Install the stderr logger at one level for every target.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init_with_filter(LogFilter::new(level))
}

/// Install the stderr logger from [`LOG_ENV`], defaulting to `info`.
pub fn init_from_env() -> Result<(), log::SetLoggerError> {
    let directives = std::env::var(LOG_ENV).unwrap_or_default();
    init_with_filter(LogFilter::parse(&directives))
}

/// Install a `tracing` subscriber filtered by [`LOG_ENV`] (or `RUST_LOG`),
/// logging span close events with their timings. `log` records are bridged
/// by `tracing-subscriber`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);
    let installed = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.compact().finish().try_init()
    };
    if installed.is_err() {
        log::debug!("tracing subscriber already installed");
    }
}
