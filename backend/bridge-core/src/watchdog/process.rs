use crate::watchdog::Liveness;

use log::{debug, trace};
use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, System};

/// [`Liveness`] backed by `sysinfo`; zombies count as dead.
pub struct ProcessLiveness {
    system: System,
}

impl ProcessLiveness {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Refresh just `pid` and run `f` on it if it exists.
    pub(crate) fn with_process<F, R>(&mut self, pid: u32, f: F) -> Option<R>
    where
        F: FnOnce(&Process) -> R,
    {
        let pid = Pid::from_u32(pid);
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        self.system.process(pid).map(f)
    }
}

impl Default for ProcessLiveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness for ProcessLiveness {
    fn is_alive(&mut self, pid: u32) -> bool {
        let status = self.with_process(pid, |p| p.status());
        trace!("Process {pid} status: {status:?}");

        match status {
            Some(ProcessStatus::Zombie) | Some(ProcessStatus::Dead) => {
                debug!("Process {pid} has exited but not been reaped");
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}

/// Pid of the process that launched the bridge.
#[cfg(unix)]
pub fn parent_pid() -> Option<u32> {
    Some(std::os::unix::process::parent_id())
}

#[cfg(not(unix))]
pub fn parent_pid() -> Option<u32> {
    ProcessLiveness::new()
        .with_process(std::process::id(), |p| p.parent().map(|pid| pid.as_u32()))
        .flatten()
}
