//! EXPUNGE host function (Ω_X). Gray Paper: function ID 13.
//! Removes inner machine r7 and sets r7 = its program counter, or WHO.

use super::RefineContext;
use crate::config::{FUNC_EXPUNGE, REG_WHO};
use crate::host_functions::base::{HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct ExpungeHostFunction;

impl HostFunction<RefineContext> for ExpungeHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_EXPUNGE
    }
    fn name(&self) -> &'static str {
        "expunge"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        state.registers[RESULT_REGISTER] = context
            .machines
            .remove(&state.registers[7])
            .map_or(REG_WHO, |machine| u64::from(machine.pc));
        Ok(())
    }
}
