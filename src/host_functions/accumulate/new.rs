//! NEW accumulation host function (Ω_N). Gray Paper: function ID 18.
//! r7 = code hash offset, r8 = code length, r9 = min item gas, r10 = min memo gas,
//! r11 = gratis, r12 = desired id (registrar only, below the public range).
//! Funds the new account's minimum balance from the caller and sets r7 = new id.

use super::AccumulateContext;
use crate::config::{FUNC_NEW, MIN_PUBLIC_INDEX, REG_CASH, REG_FULL, REG_HUH};
use crate::error::HostCallError;
use crate::host_functions::base::{read_guest_hash, HostCallResult, HostFunction};
use crate::host_functions::service::{minimum_balance, ServiceAccount, REQUEST_OCTETS};
use crate::types::{VmState, RESULT_REGISTER};
use std::collections::BTreeMap;

pub struct NewHostFunction;

impl HostFunction<AccumulateContext> for NewHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_NEW
    }
    fn name(&self) -> &'static str {
        "new"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let [hash_at, code_len, min_item_gas, min_memo_gas, gratis, desired] =
            [7, 8, 9, 10, 11, 12].map(|r| state.registers[r]);
        let code_hash = read_guest_hash(&state.memory, hash_at, "new code hash not readable")?;
        let code_len = u32::try_from(code_len).map_err(|_| HostCallError::Panic("new code length beyond 32 bits"))?;

        let constants = &context.config.protocol;
        let implications = &mut context.regular;
        let caller = implications.service_id;
        let privileges = &implications.privileges;
        if gratis != 0 && caller != privileges.manager {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        }
        let reserved = (gratis == 0 && caller == privileges.registrar)
            .then(|| u32::try_from(desired).ok())
            .flatten()
            .filter(|&id| id < MIN_PUBLIC_INDEX);

        let funding = minimum_balance(2, REQUEST_OCTETS + u64::from(code_len), gratis, constants);
        let current = implications
            .current()
            .ok_or(HostCallError::Panic("new without a current service account"))?;
        let threshold = current.threshold(constants);
        let Some(remaining) = current.balance.checked_sub(funding).filter(|&b| b >= threshold) else {
            state.registers[RESULT_REGISTER] = REG_CASH;
            return Ok(());
        };

        let id = match reserved {
            Some(id) if implications.accounts.contains_key(&id) => {
                state.registers[RESULT_REGISTER] = REG_FULL;
                return Ok(());
            }
            Some(id) => id,
            None => implications.next_free_id,
        };

        let account = ServiceAccount {
            code_hash,
            balance: funding,
            min_item_gas,
            min_memo_gas,
            gratis,
            requests: BTreeMap::from([((code_hash, code_len), Vec::new())]),
            created: context.timeslot,
            parent: caller,
            ..ServiceAccount::default()
        };
        implications.accounts.insert(id, account);
        if let Some(current) = implications.current_mut() {
            current.balance = remaining;
        }
        if reserved.is_none() {
            implications.advance_free_id(id);
        }
        crate::host_log!("[hostfn] new: service {} created {}", caller, id);
        state.registers[RESULT_REGISTER] = u64::from(id);
        Ok(())
    }
}
