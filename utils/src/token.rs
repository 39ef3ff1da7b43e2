//! Random mount-path token generation.
//!
//! A fresh random path segment segregates one run's protocol endpoint from
//! another, so that two supervisors started back-to-back on a host that
//! reuses TCP ports quickly cannot collide on the same mount path.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a random alphanumeric mount-path token.
pub fn random_mount_path() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_nonempty_alphanumeric_token() {
        let token = random_mount_path();
        assert_eq!(token.len(), 24);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn two_calls_are_very_likely_distinct() {
        assert_ne!(random_mount_path(), random_mount_path());
    }
}
