//! HISTORICAL_LOOKUP host function (Ω_H). Gray Paper: function ID 6.
//! LOOKUP against the preimages available at the lookup-anchor timeslot.
//! r7 = service (NONE = self), r8 = hash offset, r9 = output offset, r10 = from, r11 = length.

use super::RefineContext;
use crate::config::{FUNC_HISTORICAL_LOOKUP, REG_NONE};
use crate::host_functions::base::{clamp_slice, read_guest_hash, write_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct HistoricalLookupHostFunction;

impl HostFunction<RefineContext> for HistoricalLookupHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_HISTORICAL_LOOKUP
    }
    fn name(&self) -> &'static str {
        "historical_lookup"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        let regs = state.registers;
        let hash = read_guest_hash(&state.memory, regs[8], "historical_lookup hash not readable")?;

        let service = if regs[7] == REG_NONE {
            Some(context.service_id)
        } else {
            u32::try_from(regs[7]).ok()
        };
        let preimage = service
            .and_then(|id| context.accounts.get(&id))
            .and_then(|account| account.historical_lookup(&hash, context.lookup_anchor_timeslot));
        let Some(preimage) = preimage else {
            state.registers[RESULT_REGISTER] = REG_NONE;
            return Ok(());
        };

        let slice = clamp_slice(preimage, regs[10], regs[11]);
        write_guest(&mut state.memory, regs[9], slice, "historical_lookup output not writable")?;
        state.registers[RESULT_REGISTER] = preimage.len() as u64;
        Ok(())
    }
}
