//! PEEK host function (Ω_P). Gray Paper: function ID 9.
//! Copy from inner machine r7 at r9 into own memory at r8, r10 bytes.

use super::RefineContext;
use crate::config::{FUNC_PEEK, REG_OK, REG_OOB, REG_WHO};
use crate::error::HostCallError;
use crate::host_functions::base::{guest_writable, write_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct PeekHostFunction;

impl HostFunction<RefineContext> for PeekHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_PEEK
    }
    fn name(&self) -> &'static str {
        "peek"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        let [n, dest, source, len] = [7, 8, 9, 10].map(|r| state.registers[r]);
        if !guest_writable(&state.memory, dest, len) {
            return Err(HostCallError::Panic("peek destination not writable"));
        }
        let Some(machine) = context.machines.get(&n) else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };
        let data = u32::try_from(source)
            .ok()
            .zip(usize::try_from(len).ok())
            .and_then(|(source, len)| machine.memory.read(source, len).ok());
        let Some(data) = data else {
            state.registers[RESULT_REGISTER] = REG_OOB;
            return Ok(());
        };
        write_guest(&mut state.memory, dest, &data, "peek destination not writable")?;
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
