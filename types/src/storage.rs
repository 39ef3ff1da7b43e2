//! Storage delta: the difference between pre- and post-invocation
//! storage maps, with tombstones for deletions.
//!
//! Tombstone representation is standardized end-to-end as `Option<String>`:
//! `None` means "this key was deleted", and it is serialized as a real JSON
//! `null`, never omitted from the map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a run's storage changed relative to the snapshot it started from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageState {
    Last,
    Updated,
}

/// The post-invocation storage, plus a diff against the pre-invocation
/// snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageDelta {
    pub state: StorageState,
    pub storage: HashMap<String, String>,
    /// `None` values are tombstones — the key was present before and absent
    /// after.
    pub diff: HashMap<String, Option<String>>,
}

impl StorageDelta {
    /// Compute the delta between a pre- and post-invocation storage map by
    /// shallow comparison.
    pub fn compute(pre: &HashMap<String, String>, post: &HashMap<String, String>) -> Self {
        let mut diff = HashMap::new();

        for (key, post_value) in post {
            match pre.get(key) {
                Some(pre_value) if pre_value == post_value => {}
                _ => {
                    diff.insert(key.clone(), Some(post_value.clone()));
                }
            }
        }
        for key in pre.keys() {
            if !post.contains_key(key) {
                diff.insert(key.clone(), None);
            }
        }

        let state = if diff.is_empty() {
            StorageState::Last
        } else {
            StorageState::Updated
        };

        Self {
            state,
            storage: post.clone(),
            diff,
        }
    }

    /// Apply this delta's diff to a pre-state, returning the resulting
    /// post-state. Used to verify the invariant that `diff` applied to
    /// `pre` yields `storage`.
    pub fn apply_diff(pre: &HashMap<String, String>, diff: &HashMap<String, Option<String>>) -> HashMap<String, String> {
        let mut post = pre.clone();
        for (key, value) in diff {
            match value {
                Some(v) => {
                    post.insert(key.clone(), v.clone());
                }
                None => {
                    post.remove(key);
                }
            }
        }
        post
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_change_yields_last_state_and_empty_diff() {
        let pre = map(&[("a", "1")]);
        let post = map(&[("a", "1")]);
        let delta = StorageDelta::compute(&pre, &post);
        assert_eq!(delta.state, StorageState::Last);
        assert!(delta.diff.is_empty());
    }

    #[test]
    fn added_key_appears_in_diff_and_state_updated() {
        let pre = map(&[]);
        let post = map(&[("k", "v")]);
        let delta = StorageDelta::compute(&pre, &post);
        assert_eq!(delta.state, StorageState::Updated);
        assert_eq!(delta.diff.get("k"), Some(&Some("v".to_string())));
    }

    #[test]
    fn deleted_key_is_tombstoned_with_none() {
        let pre = map(&[("k", "v")]);
        let post = map(&[]);
        let delta = StorageDelta::compute(&pre, &post);
        assert_eq!(delta.state, StorageState::Updated);
        assert_eq!(delta.diff.get("k"), Some(&None));
    }

    #[test]
    fn changed_value_is_recorded() {
        let pre = map(&[("k", "v1")]);
        let post = map(&[("k", "v2")]);
        let delta = StorageDelta::compute(&pre, &post);
        assert_eq!(delta.diff.get("k"), Some(&Some("v2".to_string())));
    }

    #[test]
    fn applying_diff_to_pre_reproduces_post() {
        let pre = map(&[("a", "1"), ("b", "2")]);
        let post = map(&[("a", "1"), ("b", "3"), ("c", "4")]);
        let delta = StorageDelta::compute(&pre, &post);
        let reconstructed = StorageDelta::apply_diff(&pre, &delta.diff);
        assert_eq!(reconstructed, post);
    }

    #[test]
    fn tombstone_serializes_as_json_null() {
        let mut diff = HashMap::new();
        diff.insert("k".to_string(), None);
        let delta = StorageDelta {
            state: StorageState::Updated,
            storage: HashMap::new(),
            diff,
        };
        let json = serde_json::to_value(&delta).unwrap();
        assert!(json["diff"]["k"].is_null());
    }
}
