//! CHECKPOINT accumulation host function (Ω_C). Gray Paper: function ID 17.
//! Copies the regular implications over the exceptional ones; r7 = remaining gas.

use super::AccumulateContext;
use crate::config::FUNC_CHECKPOINT;
use crate::host_functions::base::{HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct CheckpointHostFunction;

impl HostFunction<AccumulateContext> for CheckpointHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_CHECKPOINT
    }
    fn name(&self) -> &'static str {
        "checkpoint"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        context.exceptional = context.regular.clone();
        state.registers[RESULT_REGISTER] = state.gas_remaining();
        Ok(())
    }
}
