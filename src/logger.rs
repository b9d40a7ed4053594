//! A very simple log output implementation for the CLI and for tests.
//!
//! Parse diagnostics arrive as complete `FILE:LINE:COL: LEVEL: MESSAGE`
//! lines at warn and error level; those are printed bare. Debug and
//! trace records are developer output and get decorated.

use std::error::Error as StdError;
use std::io::Write;

#[cfg(test)]
use std::sync::Once;

/// Conveniently compact type alias for dyn Trait `std::error::Error`.
pub type Flaw = Box<dyn StdError + Send + Sync + 'static>;

struct Monolog {
    other: log::Level,
}

impl log::Log for Monolog {
    fn enabled(&self, meta: &log::Metadata<'_>) -> bool {
        meta.level() <= self.other
            || meta.target().starts_with("docbook2mdoc")
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if record.level() >= log::Level::Debug {
            writeln!(
                std::io::stderr(),
                "{:5} {}: {}",
                record.level(), record.target(), record.args()
            ).ok();
        } else {
            writeln!(std::io::stderr(), "{}", record.args()).ok();
        }
    }

    fn flush(&self) {
        std::io::stderr().flush().ok();
    }
}

/// Setup the stderr logger based on the specified verbosity level.
///
/// Level 0 passes parse diagnostics only; 1 adds info, 2 and 3 debug,
/// 4 and up trace records. Will fail if a logger is already set.
pub fn setup_logger(level: u32) -> Result<(), Flaw> {
    log::set_max_level(match level {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2..=3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });

    let other = match level {
        0..=2 => log::Level::Info,
        3..=4 => log::Level::Debug,
        _ => log::Level::Trace, // unfiltered
    };
    log::set_boxed_logger(Box::new(Monolog { other }))?;
    Ok(())
}

/// Setup logger for a test run, if not already setup, based on the
/// TEST_LOG environment variable.
///
/// `TEST_LOG=0` : The default, no logging enabled.
///
/// `TEST_LOG=1` : Parse diagnostics and info.
///
/// `TEST_LOG=2`+ : Debug and trace levels.
#[cfg(test)]
pub(crate) fn ensure_logger() {
    static TEST_LOG_INIT: Once = Once::new();

    TEST_LOG_INIT.call_once(|| {
        let level = if let Ok(l) = std::env::var("TEST_LOG") {
            l.parse().expect("TEST_LOG parse integer")
        } else {
            0
        };
        if level > 0 {
            setup_logger(level).expect("setup logger");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::ensure_logger;
    use log::{debug, trace};

    #[test]
    fn log_setup() {
        ensure_logger();
        debug!("log message");
        trace!("log message 2");
    }
}
