//! Running-process enumeration.
//!
//! Positional-data plugins decide whether to attach by looking for their
//! game among the running processes. [`ProcessSource`] abstracts where that
//! list comes from so the arbiter can be driven by a fixed list in tests;
//! [`SystemProcesses`] reads the real process table.

use serde::Serialize;
use tracing::debug;

#[cfg(target_os = "linux")]
mod procfs;
#[cfg(not(target_os = "linux"))]
mod sysinfo_table;

/// Tracing target for process enumeration.
const PROCESS_TARGET: &str = "lyre_plugins::process";

/// One running process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessInfo {
    name: String,
    pid: u64,
}

impl ProcessInfo {
    /// Creates a process entry.
    #[must_use]
    pub fn new(name: impl Into<String>, pid: u64) -> Self {
        Self {
            name: name.into(),
            pid,
        }
    }

    /// Executable file name, without directories.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process identifier.
    #[must_use]
    pub const fn pid(&self) -> u64 {
        self.pid
    }
}

/// Trait abstracting the process table for testability.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessSource: Send + Sync {
    /// Lists running processes ordered by PID.
    fn processes(&self) -> Vec<ProcessInfo>;
}

/// Reads the operating system's process table.
///
/// Linux walks `/proc/<pid>/exe`; other platforms go through the `sysinfo`
/// process table. Processes the current user may not inspect are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcesses;

impl ProcessSource for SystemProcesses {
    fn processes(&self) -> Vec<ProcessInfo> {
        let mut processes = platform_processes();
        processes.sort_by_key(ProcessInfo::pid);
        debug!(
            target: PROCESS_TARGET,
            count = processes.len(),
            "enumerated running processes"
        );
        processes
    }
}

/// Fixed process list, for built-in tooling and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedProcesses(Vec<ProcessInfo>);

impl FixedProcesses {
    /// Creates a source that always reports `processes`.
    #[must_use]
    pub const fn new(processes: Vec<ProcessInfo>) -> Self {
        Self(processes)
    }
}

impl ProcessSource for FixedProcesses {
    fn processes(&self) -> Vec<ProcessInfo> {
        self.0.clone()
    }
}

#[cfg(target_os = "linux")]
fn platform_processes() -> Vec<ProcessInfo> {
    procfs::processes()
}

#[cfg(not(target_os = "linux"))]
fn platform_processes() -> Vec<ProcessInfo> {
    sysinfo_table::processes()
}
