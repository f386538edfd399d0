//! GAS host function (Ω_G). Gray Paper: function ID 0.
//! Sets r7 = gas remaining after the call's own charge.

use crate::config::FUNC_GAS;
use crate::host_functions::base::{HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct GasHostFunction;

impl<C> HostFunction<C> for GasHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_GAS
    }
    fn name(&self) -> &'static str {
        "gas"
    }
    fn execute(&self, state: &mut VmState, _context: &mut C) -> HostCallResult {
        state.registers[RESULT_REGISTER] = state.gas_remaining();
        Ok(())
    }
}
