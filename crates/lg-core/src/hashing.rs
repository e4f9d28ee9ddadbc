//! Content and options fingerprinting: identical inputs must always
//! produce identical hashes.
//!
//! Canonicalization happens one level up in [`crate::options`]; this module
//! is the pure, final hashing step so both the cache service and the runner
//! derive identical keys from identical inputs.

use crate::options::CanonicalOptions;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Content hash: SHA-256 over the raw submission bytes (text or archive).
pub fn content_hash(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}

/// Options hash: SHA-256 over the deterministic JSON serialization of a
/// [`CanonicalOptions`] value. Relies on `serde_json`'s `Map` being a
/// `BTreeMap` (sorted keys) and on [`CanonicalOptions`]'s array fields
/// already being sorted by [`crate::options::LintOptions::canonicalize`].
pub fn options_hash(canonical: &CanonicalOptions) -> String {
    let v = serde_json::to_value(canonical).expect("CanonicalOptions always serializes");
    let json = serde_json::to_string(&v).expect("Value always serializes");
    sha256_hex(json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LintOptions;

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash(b"var x = 1;");
        let b = content_hash(b"var x = 1;");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn content_hash_differs_for_different_input() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }

    #[test]
    fn options_hash_stable_across_shuffled_arrays() {
        let mut o1 = LintOptions::default();
        o1.exclude_patterns = vec!["z/**".into(), "a/**".into()];
        let mut o2 = LintOptions::default();
        o2.exclude_patterns = vec!["a/**".into(), "z/**".into()];
        assert_eq!(
            options_hash(&o1.canonicalize()),
            options_hash(&o2.canonicalize())
        );
    }

    #[test]
    fn options_hash_differs_when_semantics_differ() {
        let mut o1 = LintOptions::default();
        o1.fix = true;
        let o2 = LintOptions::default();
        assert_ne!(
            options_hash(&o1.canonicalize()),
            options_hash(&o2.canonicalize())
        );
    }

    // Property test for invariant 1: any two orderings of equivalent option
    // content hash identically.
    #[cfg(test)]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_options_hash_invariant_under_shuffle(
                mut patterns in prop::collection::vec("[a-z]{1,8}/\\*\\*", 0..6)
            ) {
                let mut o1 = LintOptions::default();
                o1.exclude_patterns = patterns.clone();
                patterns.reverse();
                let mut o2 = LintOptions::default();
                o2.exclude_patterns = patterns;
                prop_assert_eq!(
                    options_hash(&o1.canonicalize()),
                    options_hash(&o2.canonicalize())
                );
            }
        }
    }
}
