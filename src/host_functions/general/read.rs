//! READ host function (Ω_R). Gray Paper: function ID 3.
//! r7 = service (NONE = self), r8 = key offset, r9 = key length, r10 = output offset,
//! r11 = from, r12 = length.

use crate::config::{FUNC_READ, REG_NONE};
use crate::host_functions::base::{
    clamp_slice, read_guest, write_guest, HostCallResult, HostFunction, ServiceEnvironment,
};
use crate::types::{VmState, RESULT_REGISTER};

pub struct ReadHostFunction;

impl<C: ServiceEnvironment> HostFunction<C> for ReadHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_READ
    }
    fn name(&self) -> &'static str {
        "read"
    }
    fn execute(&self, state: &mut VmState, context: &mut C) -> HostCallResult {
        let regs = state.registers;
        let key = read_guest(&state.memory, regs[8], regs[9], "read key not readable")?;

        let value = context
            .resolve_service(regs[7])
            .and_then(|id| context.account(id))
            .and_then(|account| account.storage.get(&key));
        let Some(value) = value else {
            state.registers[RESULT_REGISTER] = REG_NONE;
            return Ok(());
        };

        let slice = clamp_slice(value, regs[11], regs[12]);
        write_guest(&mut state.memory, regs[10], slice, "read output not writable")?;
        state.registers[RESULT_REGISTER] = value.len() as u64;
        Ok(())
    }
}
