//! EJECT accumulation host function (Ω_J). Gray Paper: function ID 21.
//! r7 = service to eject, r8 = offset of the hash of its last remaining preimage request.
//! The target must have marked itself ejectable by setting its code hash to E32(caller).

use super::base::ejection_hash;
use super::AccumulateContext;
use crate::config::{FUNC_EJECT, REG_HUH, REG_OK, REG_WHO};
use crate::error::HostCallError;
use crate::host_functions::base::{read_guest_hash, HostCallResult, HostFunction};
use crate::host_functions::service::REQUEST_OCTETS;
use crate::types::{VmState, RESULT_REGISTER};

pub struct EjectHostFunction;

impl HostFunction<AccumulateContext> for EjectHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_EJECT
    }
    fn name(&self) -> &'static str {
        "eject"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let hash = read_guest_hash(&state.memory, state.registers[8], "eject hash not readable")?;
        let implications = &mut context.regular;
        let caller = implications.service_id;

        let target = u32::try_from(state.registers[7])
            .ok()
            .filter(|&id| id != caller)
            .and_then(|id| implications.accounts.get(&id).map(|account| (id, account)))
            .filter(|(_, account)| account.code_hash == ejection_hash(caller));
        let Some((target, account)) = target else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };

        let len = account.octets().max(REQUEST_OCTETS) - REQUEST_OCTETS;
        let expunge_period = u64::from(context.config.protocol.expunge_period);
        let expired = u32::try_from(len)
            .ok()
            .and_then(|len| account.requests.get(&(hash, len)))
            .is_some_and(|history| match history.as_slice() {
                [_, y] => u64::from(*y) + expunge_period < u64::from(context.timeslot),
                _ => false,
            });
        if account.items() != 2 || !expired {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        }

        let balance = account.balance;
        let current = implications
            .current_mut()
            .ok_or(HostCallError::Panic("eject without a current service account"))?;
        current.balance = current.balance.checked_add(balance).ok_or(HostCallError::Overflow)?;
        implications.accounts.remove(&target);
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
