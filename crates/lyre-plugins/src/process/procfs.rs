//! `/proc` walker.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::{PROCESS_TARGET, ProcessInfo};

const PROC_ROOT: &str = "/proc";

pub(super) fn processes() -> Vec<ProcessInfo> {
    processes_under(Path::new(PROC_ROOT))
}

/// Lists processes below a procfs mount point.
///
/// Only numeric entries are processes. The name is the file name of the
/// canonicalised `exe` link, so wrapper symlinks resolve to the real binary.
pub(super) fn processes_under(root: &Path) -> Vec<ProcessInfo> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) => {
            debug!(
                target: PROCESS_TARGET,
                root = %root.display(),
                %error,
                "cannot read process table"
            );
            return Vec::new();
        }
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let pid = entry.file_name().to_str()?.parse::<u64>().ok()?;
            let executable = fs::canonicalize(entry.path().join("exe")).ok()?;
            let name = executable.file_name()?.to_string_lossy().into_owned();
            Some(ProcessInfo::new(name, pid))
        })
        .collect()
}
