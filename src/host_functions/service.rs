//! Service accounts as seen by host calls (Gray Paper section 9).
//!
//! `items` and `octets` are derived from storage and requests rather than stored, so they can
//! never drift from the data they describe.

use crate::config::ProtocolConstants;
use crate::crypto::Hash;
use std::collections::BTreeMap;

/// Octets charged per preimage request on top of the preimage length.
pub const REQUEST_OCTETS: u64 = 81;
/// Octets charged per storage item on top of key and value lengths.
pub const STORAGE_OCTETS: u64 = 34;

/// Key of a preimage request: (hash, preimage length).
pub type RequestKey = (Hash, u32);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceAccount {
    pub code_hash: Hash,
    pub balance: u64,
    /// Minimum gas for accumulating a work item (a_g).
    pub min_item_gas: u64,
    /// Minimum gas for an on-transfer memo (a_m).
    pub min_memo_gas: u64,
    /// Deposit offset granted by the manager (a_f).
    pub gratis: u64,
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
    pub preimages: BTreeMap<Hash, Vec<u8>>,
    /// Request timeslot histories, at most three entries each.
    pub requests: BTreeMap<RequestKey, Vec<u32>>,
    pub created: u32,
    pub last_accumulation: u32,
    pub parent: u32,
}

impl ServiceAccount {
    /// a_i = 2 * |requests| + |storage|
    #[must_use]
    pub fn items(&self) -> u64 {
        2 * self.requests.len() as u64 + self.storage.len() as u64
    }

    /// a_o: footprint of requests and storage in octets.
    #[must_use]
    pub fn octets(&self) -> u64 {
        let requests: u64 = self
            .requests
            .keys()
            .map(|(_, len)| REQUEST_OCTETS + u64::from(*len))
            .sum();
        let storage: u64 = self
            .storage
            .iter()
            .map(|(k, v)| storage_octets(k, v))
            .sum();
        requests + storage
    }

    /// a_t: minimum balance the account must keep.
    #[must_use]
    pub fn threshold(&self, constants: &ProtocolConstants) -> u64 {
        minimum_balance(self.items(), self.octets(), self.gratis, constants)
    }

    /// Preimage `hash` if it was requested and is currently available at `timeslot`.
    #[must_use]
    pub fn historical_lookup(&self, hash: &Hash, timeslot: u32) -> Option<&[u8]> {
        let preimage = self.preimages.get(hash)?;
        let len = u32::try_from(preimage.len()).ok()?;
        let history = self.requests.get(&(*hash, len))?;
        is_available(history, timeslot).then_some(preimage.as_slice())
    }
}

#[must_use]
pub fn storage_octets(key: &[u8], value: &[u8]) -> u64 {
    STORAGE_OCTETS + key.len() as u64 + value.len() as u64
}

/// max(0, B_S + B_I * items + B_L * octets - gratis), saturating instead of overflowing.
#[must_use]
pub fn minimum_balance(items: u64, octets: u64, gratis: u64, constants: &ProtocolConstants) -> u64 {
    constants
        .base_deposit
        .saturating_add(constants.item_deposit.saturating_mul(items))
        .saturating_add(constants.byte_deposit.saturating_mul(octets))
        .saturating_sub(gratis)
}

/// Gray Paper equation 9.7: whether a request history makes its preimage available at `t`.
#[must_use]
pub fn is_available(history: &[u32], t: u32) -> bool {
    match *history {
        [x] => x <= t,
        [x, y] => x <= t && t < y,
        [x, y, z] => (x <= t && t < y) || z <= t,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::blake2b256;

    fn account_with_request(preimage: &[u8], history: Vec<u32>) -> (ServiceAccount, Hash) {
        let hash = blake2b256(preimage);
        let mut account = ServiceAccount::default();
        account.preimages.insert(hash, preimage.to_vec());
        account.requests.insert((hash, preimage.len() as u32), history);
        (account, hash)
    }

    #[test]
    fn footprint_counts_requests_and_storage() {
        let (mut account, _) = account_with_request(b"code", vec![]);
        account.storage.insert(b"key".to_vec(), b"value".to_vec());
        assert_eq!(account.items(), 3);
        assert_eq!(account.octets(), 81 + 4 + 34 + 3 + 5);
    }

    #[test]
    fn threshold_subtracts_gratis() {
        let constants = ProtocolConstants::default();
        let mut account = ServiceAccount::default();
        assert_eq!(account.threshold(&constants), constants.base_deposit);
        account.gratis = u64::MAX;
        assert_eq!(account.threshold(&constants), 0);
    }

    #[test]
    fn availability_windows() {
        assert!(!is_available(&[], 5));
        assert!(is_available(&[3], 5));
        assert!(!is_available(&[6], 5));
        assert!(is_available(&[3, 6], 5));
        assert!(!is_available(&[3, 5], 5));
        assert!(is_available(&[1, 2, 4], 5));
        assert!(!is_available(&[1, 2, 9], 5));
    }

    #[test]
    fn historical_lookup_honours_history() {
        let (account, hash) = account_with_request(b"blob", vec![10]);
        assert_eq!(account.historical_lookup(&hash, 12), Some(&b"blob"[..]));
        assert_eq!(account.historical_lookup(&hash, 9), None);
        assert_eq!(account.historical_lookup(&[0; 32], 12), None);
    }
}
