//! Keyed packet/byte counters with a cardinality cap

use parking_lot::Mutex;
use std::collections::HashMap;

/// Key that absorbs observations once a histogram is full
pub const OTHER_KEY: &str = "other";

/// Default number of distinct keys per histogram
pub const DEFAULT_MAX_KEYS: usize = 1024;

/// Packet and byte totals for one key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bucket {
    pub packets: u64,
    pub bytes: u64,
}

/// Cumulative counters keyed by label value
///
/// At most `max_keys` distinct keys are tracked. Observations for a new key
/// beyond that land in the [`OTHER_KEY`] bucket. Keys are never evicted, so
/// every exported per-key series only ever grows.
#[derive(Debug)]
pub struct CappedHistogram {
    max_keys: usize,
    entries: Mutex<HashMap<String, Bucket>>,
    other: Mutex<Bucket>,
}

impl CappedHistogram {
    pub fn new(max_keys: usize) -> Self {
        Self {
            max_keys,
            entries: Mutex::new(HashMap::new()),
            other: Mutex::new(Bucket::default()),
        }
    }

    /// Count one packet carrying `bytes` of payload under `key`
    pub fn record(&self, key: &str, bytes: u64) {
        let mut entries = self.entries.lock();

        if let Some(bucket) = entries.get_mut(key) {
            bucket.packets += 1;
            bucket.bytes += bytes;
            return;
        }

        if entries.len() >= self.max_keys {
            drop(entries);
            let mut other = self.other.lock();
            other.packets += 1;
            other.bytes += bytes;
            return;
        }

        entries.insert(key.to_string(), Bucket { packets: 1, bytes });
    }

    /// Number of distinct keys tracked, not counting the overflow bucket
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty() && self.other.lock().packets == 0
    }

    /// Totals for `key`, or for the overflow bucket when `key` is [`OTHER_KEY`]
    pub fn get(&self, key: &str) -> Option<Bucket> {
        if key == OTHER_KEY {
            let other = *self.other.lock();
            return (other.packets > 0).then_some(other);
        }
        self.entries.lock().get(key).copied()
    }

    /// Entries sorted by key, with the overflow bucket last when it is in use
    pub fn snapshot(&self) -> Vec<(String, Bucket)> {
        let mut rows: Vec<(String, Bucket)> = self
            .entries
            .lock()
            .iter()
            .map(|(key, bucket)| (key.clone(), *bucket))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let other = *self.other.lock();
        if other.packets > 0 {
            rows.push((OTHER_KEY.to_string(), other));
        }
        rows
    }
}

impl Default for CappedHistogram {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_KEYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_per_key() {
        let hist = CappedHistogram::new(8);
        hist.record("80", 100);
        hist.record("80", 50);
        hist.record("443", 10);

        assert_eq!(
            hist.get("80"),
            Some(Bucket {
                packets: 2,
                bytes: 150
            })
        );
        assert_eq!(hist.get("443").map(|b| b.packets), Some(1));
        assert_eq!(hist.len(), 2);
        assert_eq!(hist.get(OTHER_KEY), None);
    }

    #[test]
    fn test_cap_folds_new_keys_into_other() {
        let hist = CappedHistogram::new(2);
        hist.record("a", 1);
        hist.record("b", 2);
        hist.record("c", 3);
        hist.record("d", 4);

        assert_eq!(hist.len(), 2);
        assert_eq!(hist.get("c"), None);
        assert_eq!(
            hist.get(OTHER_KEY),
            Some(Bucket {
                packets: 2,
                bytes: 7
            })
        );
    }

    #[test]
    fn test_existing_keys_keep_counting_when_full() {
        let hist = CappedHistogram::new(1);
        hist.record("a", 10);
        hist.record("b", 1);
        hist.record("a", 10);

        assert_eq!(
            hist.get("a"),
            Some(Bucket {
                packets: 2,
                bytes: 20
            })
        );
        assert_eq!(hist.get(OTHER_KEY).map(|b| b.packets), Some(1));
    }

    #[test]
    fn test_snapshot_sorted_with_other_last() {
        let hist = CappedHistogram::new(2);
        hist.record("zeta", 0);
        hist.record("alpha", 0);
        hist.record("beta", 0);

        let keys: Vec<String> = hist.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alpha", "zeta", "other"]);
    }

    #[test]
    fn test_zero_cap_sends_everything_to_other() {
        let hist = CappedHistogram::new(0);
        hist.record("a", 5);
        assert_eq!(hist.len(), 0);
        assert!(!hist.is_empty());
        assert_eq!(hist.snapshot().len(), 1);
    }
}
