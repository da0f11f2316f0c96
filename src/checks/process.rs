//! Process enumeration for the web server liveness check.

use sysinfo::System;

/// Counts running processes that match a name pattern.
///
/// Implemented over the platform process table in production and by fakes in
/// tests.
pub trait ProcessEnumerator: Send + Sync {
    /// Number of processes whose name or full command line contains `pattern`.
    fn count_matching(&self, pattern: &str) -> usize;
}

/// Process table access through `sysinfo`, which covers Linux, macOS,
/// Windows and the BSDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

impl ProcessEnumerator for SystemProcesses {
    fn count_matching(&self, pattern: &str) -> usize {
        let system = System::new_all();
        let own_pid = sysinfo::get_current_pid().ok();

        system
            .processes()
            .iter()
            .filter(|(pid, process)| Some(**pid) != own_pid && process.thread_kind().is_none())
            .filter(|(_, process)| {
                process.name().to_string_lossy().contains(pattern)
                    || process
                        .cmd()
                        .iter()
                        .map(|arg| arg.to_string_lossy())
                        .collect::<Vec<_>>()
                        .join(" ")
                        .contains(pattern)
            })
            .count()
    }
}
