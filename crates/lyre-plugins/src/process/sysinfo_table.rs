//! Process table through `sysinfo`, for platforms without procfs.

use sysinfo::System;

use super::ProcessInfo;

pub(super) fn processes() -> Vec<ProcessInfo> {
    let system = System::new_all();
    system
        .processes()
        .iter()
        .map(|(pid, process)| ProcessInfo::new(process.name().to_owned(), u64::from(pid.as_u32())))
        .collect()
}
