//! YIELD accumulation host function (Ω_Y). Gray Paper: function ID 25.
//! r7 = offset of the 32-byte accumulation output hash.

use super::AccumulateContext;
use crate::config::{FUNC_YIELD, REG_OK};
use crate::host_functions::base::{read_guest_hash, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct YieldHostFunction;

impl HostFunction<AccumulateContext> for YieldHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_YIELD
    }
    fn name(&self) -> &'static str {
        "yield"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let hash = read_guest_hash(&state.memory, state.registers[7], "yield hash not readable")?;
        context.regular.yield_hash = Some(hash);
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
