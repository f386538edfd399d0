//! BLAKE2b-256, used for program code hashes, preimage lookups and service-code checks.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

pub type Hash = [u8; 32];

#[must_use]
pub fn blake2b256(data: &[u8]) -> Hash {
    Blake2b::<U32>::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::blake2b256;

    #[test]
    fn blake2b256_empty_matches_known() {
        let expected: [u8; 32] = [
            0x0e, 0x57, 0x51, 0xc0, 0x26, 0xe5, 0x43, 0xb2, 0xe8, 0xab, 0x2e, 0xb0, 0x60, 0x99,
            0xda, 0xa1, 0xd1, 0xe5, 0xdf, 0x47, 0x77, 0x8f, 0x77, 0x87, 0xfa, 0xab, 0x45, 0xcd,
            0xf1, 0x2f, 0xe3, 0xa8,
        ];
        assert_eq!(blake2b256(&[]), expected, "BLAKE2b-256(empty)");
    }

    #[test]
    fn distinct_inputs_differ() {
        assert_ne!(blake2b256(b"a"), blake2b256(b"b"));
    }
}
