//! UPGRADE accumulation host function (Ω_U). Gray Paper: function ID 19.
//! r7 = code hash offset, r8 = min item gas, r9 = min memo gas.

use super::AccumulateContext;
use crate::config::{FUNC_UPGRADE, REG_OK};
use crate::error::HostCallError;
use crate::host_functions::base::{read_guest_hash, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct UpgradeHostFunction;

impl HostFunction<AccumulateContext> for UpgradeHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_UPGRADE
    }
    fn name(&self) -> &'static str {
        "upgrade"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let code_hash = read_guest_hash(&state.memory, state.registers[7], "upgrade code hash not readable")?;
        let account = context
            .regular
            .current_mut()
            .ok_or(HostCallError::Panic("upgrade without a current service account"))?;
        account.code_hash = code_hash;
        account.min_item_gas = state.registers[8];
        account.min_memo_gas = state.registers[9];
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
