//! Content hashing for build freshness checks.
//!
//! Uses `rustc_hash::FxHasher`: fast and deterministic, which is all a
//! "did this file change" check needs.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Compute a 64-bit hash of byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// Short hex fingerprint for log lines.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    format!("{:016x}", compute(value))[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_is_deterministic() {
        assert_eq!(compute("abc"), compute(b"abc"));
        assert_ne!(compute("abc"), compute("abd"));
    }

    #[test]
    fn test_fingerprint_len() {
        assert_eq!(fingerprint("fix-broken-img").len(), 8);
    }
}
