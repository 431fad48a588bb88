//! Random key generation for participant registration and device pairing.
//!
//! # Invariants
//! - Keys are drawn from `[A-Za-z0-9]` only, so they are URL-safe as-is.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of registration keys, device keys and session tokens.
pub const KEY_LENGTH: usize = 24;

/// Returns a fresh random alphanumeric key of `length` characters.
pub fn random_key(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Returns whether `value` has the shape produced by [`random_key`].
pub fn is_well_formed_key(value: &str) -> bool {
    value.len() == KEY_LENGTH && value.bytes().all(|byte| byte.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::{is_well_formed_key, random_key, KEY_LENGTH};

    #[test]
    fn random_key_has_requested_length_and_alphabet() {
        let key = random_key(KEY_LENGTH);
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(is_well_formed_key(&key));
    }

    #[test]
    fn consecutive_keys_differ() {
        assert_ne!(random_key(KEY_LENGTH), random_key(KEY_LENGTH));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(!is_well_formed_key("short"));
        assert!(!is_well_formed_key("abc-def-ghi-jkl-mno-pqr!"));
    }
}
