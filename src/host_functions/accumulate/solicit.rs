//! SOLICIT accumulation host function (Ω_S). Gray Paper: function ID 23.
//! r7 = hash offset, r8 = preimage length. Opens a request, or re-requests a forgotten one.

use super::base::request_len;
use super::AccumulateContext;
use crate::config::{FUNC_SOLICIT, REG_FULL, REG_HUH, REG_OK};
use crate::error::HostCallError;
use crate::host_functions::base::{read_guest_hash, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct SolicitHostFunction;

impl HostFunction<AccumulateContext> for SolicitHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_SOLICIT
    }
    fn name(&self) -> &'static str {
        "solicit"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let hash = read_guest_hash(&state.memory, state.registers[7], "solicit hash not readable")?;
        let timeslot = context.timeslot;
        let constants = &context.config.protocol;
        let account = context
            .regular
            .current_mut()
            .ok_or(HostCallError::Panic("solicit without a current service account"))?;
        let Some(len) = request_len(state.registers[8]) else {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        };

        let key = (hash, len);
        let previous = account.requests.get(&key).cloned();
        let history = match previous.as_deref() {
            None => Vec::new(),
            Some(&[x, y]) => vec![x, y, timeslot],
            Some(_) => {
                state.registers[RESULT_REGISTER] = REG_HUH;
                return Ok(());
            }
        };
        account.requests.insert(key, history);
        if account.threshold(constants) > account.balance {
            match previous {
                Some(history) => account.requests.insert(key, history),
                None => account.requests.remove(&key),
            };
            state.registers[RESULT_REGISTER] = REG_FULL;
            return Ok(());
        }
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
