//! Logging for the presence bridge.
//!
//! Dual output: colored stderr and a plain log file. Stdout is left alone;
//! the host owns the bridge's stdio and does not expect output there.
//!
//! The host may never drain our stderr pipe, so in release builds only
//! warnings and errors go there. The file gets everything.

use crate::APP_NAME;
use crate::error::AppError;

use common::ErrorLocation;

use std::env;
use std::fs::create_dir_all;
use std::io::stderr;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use const_format::concatcp;
use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = concatcp!(APP_NAME, ".log");

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Most verbose level written to stderr.
pub fn stderr_level(debug_build: bool) -> LevelFilter {
    if debug_build {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// `<cache dir>/presence-bridge`, or the temp dir when there is no cache dir.
pub fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join(APP_NAME)
}

/// Create `log_dir` if needed, then [`initialize`].
///
/// # Errors
///
/// Returns [`AppError::Logger`] if the directory cannot be created or the
/// logger cannot be installed.
#[track_caller]
pub fn prepare(log_dir: &Path) -> Result<(), AppError> {
    create_dir_all(log_dir).map_err(|e| AppError::Logger {
        message: format!("Failed to create {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    initialize(log_dir)
}

/// Install the global logger. Later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns [`AppError::Logger`] if the log file cannot be opened or a
/// global logger is already installed by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), AppError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_dir).and_then(|dispatch| {
            dispatch.apply().map_err(|e| AppError::Logger {
                message: format!("Failed to install logger: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
        });
        if result.is_ok() {
            info!("Logger initialized with level: {LOG_LEVEL:?}");
        }
    });

    result
}

/// Build (but do not install) the stderr + file dispatch.
#[track_caller]
pub(crate) fn build_dispatch(log_dir: &Path) -> Result<Dispatch, AppError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stderr_dispatch = Dispatch::new()
        .level(stderr_level(cfg!(debug_assertions)))
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = format_rfc3339(SystemTime::now()),
                level = colors.color(record.level()),
                message = message,
                target = record.target(),
            ))
        })
        .chain(stderr());

    let log_file = fern::log_file(&log_file_path).map_err(|e| AppError::Logger {
        message: format!("Failed to open {}: {e}", log_file_path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(log_file);

    Ok(Dispatch::new()
        .level(LOG_LEVEL)
        .chain(stderr_dispatch)
        .chain(file_dispatch))
}
