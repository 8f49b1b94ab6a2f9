//! Parent-process liveness.
//!
//! The bridge has no other way to learn that the host went away without
//! sending `windowClose` (crash, kill -9), so the event loop probes the
//! parent once per iteration through [`Liveness`].

pub mod process;

pub use process::{ProcessLiveness, parent_pid};

/// "Does this process still exist?" without affecting it.
pub trait Liveness {
    fn is_alive(&mut self, pid: u32) -> bool;
}

impl<F> Liveness for F
where
    F: FnMut(u32) -> bool,
{
    fn is_alive(&mut self, pid: u32) -> bool {
        self(pid)
    }
}
