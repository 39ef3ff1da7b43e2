//! Call accounting shared between the proxy's dispatch handler and the
//! `RpcProxy` handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use w3f_types::RpcCallCounters;

#[derive(Default)]
pub struct RpcStats {
    total: AtomicU64,
    throttled: AtomicU64,
    /// Per-method call counts. Not enforced against any budget today (no
    /// per-method limit exists in `RunnerOptions`); tracked so a future
    /// budget has data to act on without a wire-format change.
    per_method: Mutex<HashMap<String, u64>>,
}

impl RpcStats {
    pub fn record_call(&self, method: &str) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let mut counts = match self.per_method.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counts.entry(method.to_string()).or_insert(0) += 1;
    }

    pub fn record_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn per_method_snapshot(&self) -> HashMap<String, u64> {
        let counts = match self.per_method.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        counts.clone()
    }

    /// Snapshot into the wire shape the supervisor embeds in the final
    /// report. Final once the proxy has stopped accepting traffic.
    pub fn snapshot(&self) -> RpcCallCounters {
        RpcCallCounters {
            total: self.total.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_total_and_per_method_counts() {
        let stats = RpcStats::default();
        stats.record_call("eth_call");
        stats.record_call("eth_call");
        stats.record_call("eth_blockNumber");
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.per_method_snapshot().get("eth_call"), Some(&2));
    }

    #[test]
    fn records_throttled_separately_from_total() {
        let stats = RpcStats::default();
        stats.record_throttled();
        stats.record_throttled();
        assert_eq!(stats.snapshot().throttled, 2);
        assert_eq!(stats.snapshot().total, 0);
    }
}
