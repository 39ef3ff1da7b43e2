//! Resident-memory sampling for a sandboxed process.

/// Reads `VmRSS` from `/proc/<pid>/status` and returns it in bytes.
///
/// Linux-only; returns `None` on any other platform or if the process has
/// already exited.
#[cfg(target_os = "linux")]
pub fn read_rss_bytes(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let kib: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kib * 1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
pub fn read_rss_bytes(_pid: u32) -> Option<u64> {
    None
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn reads_own_process_rss() {
        let pid = std::process::id();
        let rss = read_rss_bytes(pid);
        assert!(rss.is_some());
        assert!(rss.unwrap() > 0);
    }

    #[test]
    fn returns_none_for_nonexistent_pid() {
        assert_eq!(read_rss_bytes(u32::MAX), None);
    }
}
