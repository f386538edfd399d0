//! INVOKE host function (Ω_K). Gray Paper: function ID 12.
//! r7 = machine, r8 = offset of a 112-byte block holding E8(gas) ++ E8(r0..r12).
//! Runs the inner machine until it terminates or reaches a host call, writes gas and
//! registers back to the block, and reports how it stopped in r7 (and r8). A page fault
//! reports the start of the faulting page.

use super::RefineContext;
use crate::config::{
    FUNC_INVOKE, REG_WHO, RESULT_CODE_FAULT, RESULT_CODE_HALT, RESULT_CODE_HOST, RESULT_CODE_OOG,
    RESULT_CODE_PANIC,
};
use crate::error::HostCallError;
use crate::host_functions::base::{guest_writable, read_guest, write_guest, HostCallResult, HostFunction};
use crate::interpreter::Interpreter;
use crate::types::{ExecOutcome, Registers, VmState, NUM_REGISTERS, RESULT_REGISTER};
use std::sync::Arc;

/// Gas word plus thirteen registers.
const BLOCK_SIZE: u64 = 8 + 8 * NUM_REGISTERS as u64;

/// (r7, r8) reported to the outer machine.
fn exit_registers(outcome: ExecOutcome) -> (u64, Option<u64>) {
    match outcome {
        ExecOutcome::HostCall(index) => (RESULT_CODE_HOST, Some(u64::from(index))),
        ExecOutcome::Halt | ExecOutcome::Continued => (RESULT_CODE_HALT, None),
        ExecOutcome::OutOfGas => (RESULT_CODE_OOG, None),
        ExecOutcome::Panic(_) => match outcome.memory_fault() {
            Some(fault) => (RESULT_CODE_FAULT, Some(u64::from(fault.page_start()))),
            None => (RESULT_CODE_PANIC, None),
        },
    }
}

pub struct InvokeHostFunction;

impl HostFunction<RefineContext> for InvokeHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_INVOKE
    }
    fn name(&self) -> &'static str {
        "invoke"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        let (n, block_at) = (state.registers[7], state.registers[8]);
        let block = read_guest(&state.memory, block_at, BLOCK_SIZE, "invoke block not readable")?;
        if !guest_writable(&state.memory, block_at, BLOCK_SIZE) {
            return Err(HostCallError::Panic("invoke block not writable"));
        }
        let Some(machine) = context.machines.get_mut(&n) else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };

        let (gas, registers) = block.split_at(8);
        let mut gas_bytes = [0u8; 8];
        gas_bytes.copy_from_slice(gas);
        let inner_state = VmState::new(
            machine.pc,
            Registers::from_le_bytes(registers),
            std::mem::take(&mut machine.memory),
            u64::from_le_bytes(gas_bytes),
        );
        let mut inner = Interpreter::new(Arc::clone(&machine.program), inner_state, Arc::clone(&context.machine_config));
        let outcome = inner.run_until_host_call();
        let inner_state = inner.into_state();
        crate::host_log!("[hostfn] invoke: machine {} stopped with {:?}", n, outcome);

        let mut out = inner_state.gas_remaining().to_le_bytes().to_vec();
        out.extend_from_slice(&inner_state.registers.to_le_bytes());
        machine.memory = inner_state.memory;
        machine.pc = inner_state.pc;
        write_guest(&mut state.memory, block_at, &out, "invoke block not writable")?;

        let (code, detail) = exit_registers(outcome);
        state.registers[RESULT_REGISTER] = code;
        if let Some(detail) = detail {
            state.registers[8] = detail;
        }
        Ok(())
    }
}
