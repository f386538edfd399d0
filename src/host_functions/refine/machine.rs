//! MACHINE host function (Ω_M). Gray Paper: function ID 8.
//! r7 = program blob offset, r8 = blob length, r9 = initial pc.
//! Sets r7 = id of a new inner machine with empty memory, or HUH if the blob does not decode.

use super::{GuestMachine, RefineContext};
use crate::config::{FUNC_MACHINE, REG_HUH};
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::memory::Memory;
use crate::program::Program;
use crate::types::{VmState, RESULT_REGISTER};
use std::sync::Arc;

pub struct MachineHostFunction;

impl HostFunction<RefineContext> for MachineHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_MACHINE
    }
    fn name(&self) -> &'static str {
        "machine"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        let regs = state.registers;
        let blob = read_guest(&state.memory, regs[7], regs[8], "machine blob not readable")?;

        let (Ok(program), Ok(pc)) = (Program::from_blob(&blob), u32::try_from(regs[9])) else {
            crate::host_log!("[hostfn] machine: rejected blob of {} bytes", blob.len());
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        };

        let id = (0..).find(|id| !context.machines.contains_key(id)).unwrap_or(u64::MAX);
        context.machines.insert(
            id,
            GuestMachine {
                program: Arc::new(program),
                memory: Memory::new(context.config.max_memory_bytes),
                pc,
            },
        );
        state.registers[RESULT_REGISTER] = id;
        Ok(())
    }
}
