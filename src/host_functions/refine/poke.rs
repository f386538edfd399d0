//! POKE host function (Ω_O). Gray Paper: function ID 10.
//! Copy r10 bytes from own memory at r8 into inner machine r7 at r9.

use super::RefineContext;
use crate::config::{FUNC_POKE, REG_OK, REG_OOB, REG_WHO};
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct PokeHostFunction;

impl HostFunction<RefineContext> for PokeHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_POKE
    }
    fn name(&self) -> &'static str {
        "poke"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        let [n, source, dest, len] = [7, 8, 9, 10].map(|r| state.registers[r]);
        let data = read_guest(&state.memory, source, len, "poke source not readable")?;
        let Some(machine) = context.machines.get_mut(&n) else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };
        let written = u32::try_from(dest)
            .ok()
            .is_some_and(|dest| machine.memory.write(dest, &data).is_ok());
        state.registers[RESULT_REGISTER] = if written { REG_OK } else { REG_OOB };
        Ok(())
    }
}
