//! Logging setup: env_logger backend, routed through indicatif in a TTY

use indicatif::MultiProgress;

/// Label, optionally wrapped in ANSI color codes
fn level_label(level: log::Level, color: bool) -> String {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return label.to_string();
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    format!("{ansi}{label}\x1b[0m")
}

/// Logger that prints through indicatif MultiProgress so log lines do not
/// tear progress bars.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.matches(record) {
            let line = format!("[{}] {}", level_label(record.level(), true), record.args());
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Default filter: our crates at the requested level, dependencies at warn
fn default_filter(quiet: bool, debug: bool) -> String {
    let level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    format!("warn,bibline={level},bibline_core={level},bibline_schema={level},bibline_holdings={level},bibline_formats={level}")
}

/// Initialize logging. `RUST_LOG` overrides the default filter.
///
/// With `multi` (TTY mode) lines go through indicatif; otherwise plain
/// `[LEVEL] message` lines without color.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_filter(quiet, debug));

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env).build();
        let max_level = logger.filter();

        log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone())))
            .expect("failed to init logger");
        log::set_max_level(max_level);
    } else {
        env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(buf, "[{}] {}", level_label(record.level(), false), record.args())
            })
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_labels_are_padded() {
        assert_eq!(level_label(log::Level::Warn, false), "WARN ");
        assert_eq!(level_label(log::Level::Error, false), "ERROR");
    }

    #[test]
    fn colored_label_resets() {
        assert!(level_label(log::Level::Info, true).ends_with("\x1b[0m"));
    }

    #[test]
    fn default_filter_levels() {
        assert!(default_filter(false, true).contains("bibline_core=debug"));
        assert!(default_filter(true, false).contains("bibline_formats=warn"));
        assert!(default_filter(false, false).starts_with("warn,"));
    }
}
