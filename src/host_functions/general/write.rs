//! WRITE host function (Ω_W). Gray Paper: function ID 4.
//! r7/r8 = key offset/length, r9/r10 = value offset/length. An empty value deletes the key.
//! Sets r7 = previous value length (NONE if absent), or FULL when the new footprint
//! would exceed the balance, in which case storage is unchanged.

use crate::config::{FUNC_WRITE, REG_FULL, REG_NONE};
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction, ServiceEnvironment};
use crate::error::HostCallError;
use crate::types::{VmState, RESULT_REGISTER};

pub struct WriteHostFunction;

impl<C: ServiceEnvironment> HostFunction<C> for WriteHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_WRITE
    }
    fn name(&self) -> &'static str {
        "write"
    }
    fn execute(&self, state: &mut VmState, context: &mut C) -> HostCallResult {
        let regs = state.registers;
        let key = read_guest(&state.memory, regs[7], regs[8], "write key not readable")?;
        let value = read_guest(&state.memory, regs[9], regs[10], "write value not readable")?;

        let constants = context.config().protocol.clone();
        let account = context
            .current_account_mut()
            .ok_or(HostCallError::Panic("write without a current service account"))?;

        let previous = if value.is_empty() {
            account.storage.remove(&key)
        } else {
            account.storage.insert(key.clone(), value)
        };
        if account.threshold(&constants) > account.balance {
            match previous {
                Some(old) => account.storage.insert(key, old),
                None => account.storage.remove(&key),
            };
            state.registers[RESULT_REGISTER] = REG_FULL;
            return Ok(());
        }
        state.registers[RESULT_REGISTER] = previous.map_or(REG_NONE, |old| old.len() as u64);
        Ok(())
    }
}
