//! Leveled logging, generalized from the teacher's hand-rolled per-module
//! logger (`LOG_GLOBALS` + `NewLineTerminatingOstream`) onto the standard
//! `log` facade. Module-level overrides are kept, because the core wants
//! to turn on `Debug` for, say, just the encoder while leaving the
//! scheduler at `Warn` during a long exploration run.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Debug)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
}

pub use LogLevel::*;

impl From<LogLevel> for log::Level {
    fn from(l: LogLevel) -> log::Level {
        match l {
            Fatal | Error => log::Level::Error,
            Warn => log::Level::Warn,
            Info => log::Level::Info,
            Debug => log::Level::Debug,
        }
    }
}

struct LogGlobals {
    level_map: HashMap<String, LogLevel>,
    default_level: LogLevel,
}

lazy_static! {
    static ref LOG_GLOBALS: Mutex<LogGlobals> = Mutex::new(LogGlobals {
        level_map: HashMap::new(),
        default_level: LogLevel::Info,
    });
}

/// Per-module override, e.g. `set_module_level("encoder", LogLevel::Debug)`.
pub fn set_module_level(module: &str, level: LogLevel) {
    LOG_GLOBALS.lock().unwrap().level_map.insert(module.to_owned(), level);
}

pub fn set_default_level(level: LogLevel) {
    LOG_GLOBALS.lock().unwrap().default_level = level;
}

fn module_level(module: &str) -> LogLevel {
    let g = LOG_GLOBALS.lock().unwrap();
    g.level_map.get(module).copied().unwrap_or(g.default_level)
}

pub fn enabled(module: &str, level: LogLevel) -> bool {
    level == Fatal || level <= module_level(module)
}

/// Initializes the `env_logger` backend once per process. Safe to call
/// more than once (subsequent calls are no-ops).
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .try_init();
}

#[macro_export]
macro_rules! mlog {
    ($level:expr, $($args:tt)*) => {{
        let module = module_path!();
        if $crate::logging::enabled(module, $level) {
            log::log!(target: module, ::log::Level::from($level), $($args)*);
        }
    }};
}

/// Logs at `Fatal`, captures a backtrace, and aborts the process. This is
/// the analogue of the teacher's `notifying_abort`: reserved for states the
/// core considers unrecoverable (corrupted arena indices, a `Trace` with a
/// dangling `EventId`), never for ordinary solver/sync errors, which use
/// `MtaError` instead.
#[macro_export]
macro_rules! fatal {
    ($($args:tt)+) => {{
        log::error!($($args)+);
        let bt = backtrace::Backtrace::new();
        $crate::logging::notifying_abort(bt);
    }};
}

pub fn notifying_abort(bt: backtrace::Backtrace) -> ! {
    eprintln!("=== mta-verify fatal backtrace:");
    eprintln!("{bt:?}");
    eprintln!("=== end backtrace");
    std::process::abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_gates_debug() {
        set_default_level(LogLevel::Info);
        assert!(!enabled("some::module", LogLevel::Debug));
        assert!(enabled("some::module", LogLevel::Info));
    }

    #[test]
    fn module_override_takes_precedence() {
        set_default_level(LogLevel::Error);
        set_module_level("override::target", LogLevel::Debug);
        assert!(enabled("override::target", LogLevel::Debug));
        assert!(!enabled("other::target", LogLevel::Debug));
    }

    #[test]
    fn fatal_level_always_enabled() {
        set_default_level(LogLevel::Fatal);
        assert!(enabled("anything", LogLevel::Fatal));
    }
}
