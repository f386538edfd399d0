//! Accumulation state (Gray Paper Implications, section B.5) and helpers shared by the
//! accumulate host functions.

use crate::config::MIN_PUBLIC_INDEX;
use crate::crypto::Hash;
use crate::host_functions::service::ServiceAccount;
use std::collections::{BTreeMap, BTreeSet};

/// Privileged service identities (χ).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Privileges {
    pub manager: u32,
    /// One assigner per core.
    pub assigners: Vec<u32>,
    pub delegator: u32,
    pub registrar: u32,
    /// Services accumulated every block, with their gas allowance.
    pub always_accumulate: BTreeMap<u32, u64>,
}

/// Balance transfer queued by TRANSFER and executed after accumulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredTransfer {
    pub source: u32,
    pub destination: u32,
    pub amount: u64,
    pub memo: Vec<u8>,
    pub gas_limit: u64,
}

/// Everything an accumulate invocation may change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Implications {
    /// Service being accumulated.
    pub service_id: u32,
    pub accounts: BTreeMap<u32, ServiceAccount>,
    pub privileges: Privileges,
    /// Validator keys staged by DESIGNATE.
    pub staging_set: Vec<Vec<u8>>,
    /// Authorizer queue per core.
    pub auth_queues: Vec<Vec<Hash>>,
    /// Candidate id for the next NEW.
    pub next_free_id: u32,
    pub transfers: Vec<DeferredTransfer>,
    pub yield_hash: Option<Hash>,
    /// (service, preimage) pairs supplied by PROVIDE.
    pub provisions: BTreeSet<(u32, Vec<u8>)>,
}

impl Implications {
    /// Implications for `service_id` over `accounts`. The next free id starts at the first
    /// unused public id; callers seeding it from entropy overwrite `next_free_id` with
    /// [`Implications::first_free_id`] of their seed.
    #[must_use]
    pub fn new(service_id: u32, accounts: BTreeMap<u32, ServiceAccount>) -> Self {
        let mut implications = Self {
            service_id,
            accounts,
            privileges: Privileges::default(),
            staging_set: Vec::new(),
            auth_queues: Vec::new(),
            next_free_id: 0,
            transfers: Vec::new(),
            yield_hash: None,
            provisions: BTreeSet::new(),
        };
        implications.next_free_id = implications.first_free_id(MIN_PUBLIC_INDEX);
        implications
    }

    #[must_use]
    pub fn current(&self) -> Option<&ServiceAccount> {
        self.accounts.get(&self.service_id)
    }

    pub fn current_mut(&mut self) -> Option<&mut ServiceAccount> {
        self.accounts.get_mut(&self.service_id)
    }

    /// check(i): first id from `candidate` onwards, cycling through the public range, that
    /// no account uses.
    #[must_use]
    pub fn first_free_id(&self, mut candidate: u32) -> u32 {
        // The public range is far larger than any account map, so this terminates.
        while self.accounts.contains_key(&candidate) {
            candidate = rotate_id(u64::from(candidate.saturating_sub(MIN_PUBLIC_INDEX)) + 1);
        }
        candidate
    }

    /// Advance `next_free_id` past an id NEW just allocated.
    pub fn advance_free_id(&mut self, allocated: u32) {
        let step = u64::from(allocated.saturating_sub(MIN_PUBLIC_INDEX)) + 42;
        self.next_free_id = self.first_free_id(rotate_id(step));
    }
}

/// S + (offset mod (2^32 - S - 2^8)): map an offset into the public id range.
#[must_use]
pub fn rotate_id(offset: u64) -> u32 {
    let range = (1u64 << 32) - u64::from(MIN_PUBLIC_INDEX) - (1 << 8);
    // Result is below 2^32 - 2^8 by construction.
    (u64::from(MIN_PUBLIC_INDEX) + offset % range) as u32
}

/// E4(service) zero-padded to 32 bytes: the code hash marking an account ejectable by `service`.
#[must_use]
pub fn ejection_hash(service: u32) -> Hash {
    let mut hash = [0u8; 32];
    hash[..4].copy_from_slice(&service.to_le_bytes());
    hash
}

/// Request key for a preimage length held in a register; lengths beyond 32 bits never match.
#[must_use]
pub fn request_len(register: u64) -> Option<u32> {
    u32::try_from(register).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_ids_stay_public_and_skip_taken() {
        let mut accounts = BTreeMap::new();
        accounts.insert(MIN_PUBLIC_INDEX, ServiceAccount::default());
        let implications = Implications::new(0, accounts);
        assert_eq!(implications.next_free_id, MIN_PUBLIC_INDEX + 1);
        assert_eq!(rotate_id((1 << 32) - u64::from(MIN_PUBLIC_INDEX) - 256), MIN_PUBLIC_INDEX);
    }

    #[test]
    fn ejection_hash_encodes_service() {
        let hash = ejection_hash(0x0102_0304);
        assert_eq!(&hash[..4], &[4, 3, 2, 1]);
        assert!(hash[4..].iter().all(|&b| b == 0));
    }
}
