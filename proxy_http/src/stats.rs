//! Accounting counters shared between the proxy's accept loop and the
//! supervisor's final report assembly.

use std::sync::atomic::{AtomicU64, Ordering};
use w3f_types::NetworkCounters;

/// Atomically-updated egress counters. Held behind an `Arc` so both the
/// axum handler tasks and the `HttpEgressProxy` handle observe the same
/// state without a lock.
#[derive(Default)]
pub struct ProxyStats {
    nb_requests: AtomicU64,
    nb_throttled: AtomicU64,
    download: AtomicU64,
    upload: AtomicU64,
}

impl ProxyStats {
    pub fn record_request(&self) {
        self.nb_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_throttled(&self) {
        self.nb_throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn nb_requests(&self) -> u64 {
        self.nb_requests.load(Ordering::Relaxed)
    }

    pub fn download(&self) -> u64 {
        self.download.load(Ordering::Relaxed)
    }

    pub fn upload(&self) -> u64 {
        self.upload.load(Ordering::Relaxed)
    }

    /// Record `n` more uploaded bytes if doing so would not push the
    /// cumulative total past `cap`. Returns `true` (and records a
    /// throttled request) when the cap would be exceeded, in which case
    /// the caller must not forward the bytes.
    pub fn try_add_upload(&self, n: u64, cap: u64) -> bool {
        if self.upload.load(Ordering::Relaxed) + n > cap {
            self.record_throttled();
            true
        } else {
            self.upload.fetch_add(n, Ordering::Relaxed);
            false
        }
    }

    /// Same as [`try_add_upload`](Self::try_add_upload) for downloaded
    /// bytes.
    pub fn try_add_download(&self, n: u64, cap: u64) -> bool {
        if self.download.load(Ordering::Relaxed) + n > cap {
            self.record_throttled();
            true
        } else {
            self.download.fetch_add(n, Ordering::Relaxed);
            false
        }
    }

    /// Snapshot into the wire shape the supervisor embeds in the final
    /// report. Final once the proxy has stopped accepting traffic.
    pub fn snapshot(&self) -> NetworkCounters {
        NetworkCounters {
            nb_requests: self.nb_requests.load(Ordering::Relaxed),
            nb_throttled: self.nb_throttled.load(Ordering::Relaxed),
            download: self.download.load(Ordering::Relaxed),
            upload: self.upload.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_under_cap_is_recorded() {
        let stats = ProxyStats::default();
        assert!(!stats.try_add_upload(100, 1000));
        assert_eq!(stats.upload(), 100);
        assert_eq!(stats.snapshot().nb_throttled, 0);
    }

    #[test]
    fn upload_over_cap_is_throttled_and_not_recorded() {
        let stats = ProxyStats::default();
        stats.try_add_upload(900, 1000);
        assert!(stats.try_add_upload(200, 1000));
        assert_eq!(stats.upload(), 900);
        assert_eq!(stats.snapshot().nb_throttled, 1);
    }

    #[test]
    fn download_accounting_mirrors_upload() {
        let stats = ProxyStats::default();
        assert!(!stats.try_add_download(512, 1024));
        assert!(stats.try_add_download(1024, 1024));
        assert_eq!(stats.download(), 512);
    }
}
