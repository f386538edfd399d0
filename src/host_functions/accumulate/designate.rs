//! DESIGNATE accumulation host function (Ω_D). Gray Paper: function ID 16.
//! r7 = offset of V validator key sets, 336 bytes each.

use super::AccumulateContext;
use crate::config::{FUNC_DESIGNATE, REG_HUH, REG_OK, VALIDATOR_KEY_SIZE};
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct DesignateHostFunction;

impl HostFunction<AccumulateContext> for DesignateHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_DESIGNATE
    }
    fn name(&self) -> &'static str {
        "designate"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let len = u64::from(context.config.protocol.validator_count) * u64::from(VALIDATOR_KEY_SIZE);
        let keys = read_guest(&state.memory, state.registers[7], len, "designate keys not readable")?;

        let implications = &mut context.regular;
        if implications.service_id != implications.privileges.delegator {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        }
        implications.staging_set = keys
            .chunks_exact(VALIDATOR_KEY_SIZE as usize)
            .map(<[u8]>::to_vec)
            .collect();
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
