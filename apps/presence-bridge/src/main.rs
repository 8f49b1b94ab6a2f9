//! Entry point launched by the host as a child process.
//!
//! Reads one config line from stdin, then runs the bridge until the host
//! goes away. Every failure is silent to the host: the process always exits
//! with status 0 and writes nothing to stdout.

use presence_bridge::error::AppError;
use presence_bridge::logger::{default_log_dir, prepare as LoggerPrepare};

use bridge_core::bridge::Bridge;
use bridge_core::config::{BridgeOptions, StartupConfig};
use bridge_core::watchdog::{ProcessLiveness, parent_pid};

use common::ErrorLocation;

use std::io::stdin;
use std::panic::Location;

use log::{debug, info, warn};
use tokio::runtime::Builder as RuntimeBuilder;

fn main() {
    // A bridge without logs still runs.
    if let Err(e) = LoggerPrepare(&default_log_dir()) {
        eprintln!("{e}");
    }

    let config = match StartupConfig::read_from(stdin().lock()) {
        Ok(config) => config,
        Err(e) => {
            debug!("No usable startup config: {e}");
            return;
        }
    };

    let Some(parent) = parent_pid() else {
        debug!("Could not determine parent process");
        return;
    };

    info!("Presence bridge starting for parent PID {parent}");

    if let Err(e) = run(&config, parent) {
        warn!("{e}");
    }
}

fn run(config: &StartupConfig, parent: u32) -> Result<(), AppError> {
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Runtime {
            message: format!("Failed to build runtime: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let options = BridgeOptions::default();
    let bridge = Bridge::new(config, &options, ProcessLiveness::new(), parent);

    match runtime.block_on(bridge.run()) {
        Ok(reason) => info!("Presence bridge finished: {reason:?}"),
        Err(e) => warn!("Presence bridge stopped before the event loop: {e}"),
    }

    Ok(())
}
