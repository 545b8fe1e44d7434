//! Constant-time credential comparison.

use subtle::ConstantTimeEq;

/// Compare a candidate verifier against the stored one
///
/// Lengths are fixed in practice, so a length mismatch returns `false`
/// immediately. Equal-length inputs are compared in constant time.
pub fn verify(candidate: &[u8], stored: &[u8]) -> bool {
    if candidate.len() != stored.len() {
        return false;
    }
    candidate.ct_eq(stored).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_values_verify() {
        assert!(verify(&[7u8; 32], &[7u8; 32]));
    }

    #[test]
    fn test_single_byte_difference_rejected() {
        let stored = [7u8; 32];
        for i in 0..32 {
            let mut candidate = stored;
            candidate[i] ^= 0x80;
            assert!(!verify(&candidate, &stored));
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(!verify(&[7u8; 31], &[7u8; 32]));
        assert!(!verify(&[], &[7u8; 32]));
    }
}
