//! LOOKUP host function (Ω_L). Gray Paper: function ID 2.
//! r7 = service (NONE = self), r8 = hash offset, r9 = output offset, r10 = from, r11 = length.

use crate::config::{FUNC_LOOKUP, REG_NONE};
use crate::host_functions::base::{
    clamp_slice, read_guest_hash, write_guest, HostCallResult, HostFunction, ServiceEnvironment,
};
use crate::types::{VmState, RESULT_REGISTER};

pub struct LookupHostFunction;

impl<C: ServiceEnvironment> HostFunction<C> for LookupHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_LOOKUP
    }
    fn name(&self) -> &'static str {
        "lookup"
    }
    fn execute(&self, state: &mut VmState, context: &mut C) -> HostCallResult {
        let regs = state.registers;
        let hash = read_guest_hash(&state.memory, regs[8], "lookup hash not readable")?;

        let preimage = context
            .resolve_service(regs[7])
            .and_then(|id| context.account(id))
            .and_then(|account| account.preimages.get(&hash));
        let Some(preimage) = preimage else {
            crate::host_log!("[hostfn] lookup: no preimage (service={:#x})", regs[7]);
            state.registers[RESULT_REGISTER] = REG_NONE;
            return Ok(());
        };

        let slice = clamp_slice(preimage, regs[10], regs[11]);
        write_guest(&mut state.memory, regs[9], slice, "lookup output not writable")?;
        state.registers[RESULT_REGISTER] = preimage.len() as u64;
        Ok(())
    }
}
