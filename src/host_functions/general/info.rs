//! INFO host function (Ω_I). Gray Paper: function ID 5.
//! r7 = service (NONE = self), r8 = output offset, r9 = from, r10 = length.
//! Writes a slice of the 96-byte account summary and sets r7 = 96, or NONE for an unknown service.

use crate::config::{ProtocolConstants, FUNC_INFO, REG_NONE, SERVICE_INFO_SIZE};
use crate::host_functions::base::{
    clamp_slice, write_guest, HostCallResult, HostFunction, ServiceEnvironment,
};
use crate::host_functions::service::ServiceAccount;
use crate::types::{VmState, RESULT_REGISTER};

/// code hash (32) ++ E8(balance, threshold, a_g, a_m, octets) ++ E4(items) ++ E8(gratis)
/// ++ E4(created, last accumulation, parent).
#[must_use]
pub fn encode_info(account: &ServiceAccount, constants: &ProtocolConstants) -> [u8; SERVICE_INFO_SIZE] {
    let mut info = [0u8; SERVICE_INFO_SIZE];
    info[0..32].copy_from_slice(&account.code_hash);
    info[32..40].copy_from_slice(&account.balance.to_le_bytes());
    info[40..48].copy_from_slice(&account.threshold(constants).to_le_bytes());
    info[48..56].copy_from_slice(&account.min_item_gas.to_le_bytes());
    info[56..64].copy_from_slice(&account.min_memo_gas.to_le_bytes());
    info[64..72].copy_from_slice(&account.octets().to_le_bytes());
    let items = u32::try_from(account.items()).unwrap_or(u32::MAX);
    info[72..76].copy_from_slice(&items.to_le_bytes());
    info[76..84].copy_from_slice(&account.gratis.to_le_bytes());
    info[84..88].copy_from_slice(&account.created.to_le_bytes());
    info[88..92].copy_from_slice(&account.last_accumulation.to_le_bytes());
    info[92..96].copy_from_slice(&account.parent.to_le_bytes());
    info
}

pub struct InfoHostFunction;

impl<C: ServiceEnvironment> HostFunction<C> for InfoHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_INFO
    }
    fn name(&self) -> &'static str {
        "info"
    }
    fn execute(&self, state: &mut VmState, context: &mut C) -> HostCallResult {
        let regs = state.registers;
        let Some(account) = context.resolve_service(regs[7]).and_then(|id| context.account(id)) else {
            state.registers[RESULT_REGISTER] = REG_NONE;
            return Ok(());
        };
        let info = encode_info(account, &context.config().protocol);
        let slice = clamp_slice(&info, regs[9], regs[10]);
        write_guest(&mut state.memory, regs[8], slice, "info output not writable")?;
        state.registers[RESULT_REGISTER] = SERVICE_INFO_SIZE as u64;
        Ok(())
    }
}
