//! Node.js bindings (feature `napi`): run a program blob under the generic context.
//! u64 values cross the boundary as BigInt so JS keeps full precision.

use napi::bindgen_prelude::{BigInt, Buffer};
use napi::{Error, Result};
use napi_derive::napi;

use crate::config::{
    RESULT_CODE_FAULT, RESULT_CODE_HALT, RESULT_CODE_HOST, RESULT_CODE_OOG, RESULT_CODE_PANIC,
};
use crate::host_functions::GenericContext;
use crate::invocation::Engine;
use crate::memory::{Memory, PageAccess};
use crate::program::Program;
use crate::types::{ExecOutcome, Registers, NUM_REGISTERS};
use std::sync::Arc;

/// A page range to map and fill before the run.
#[napi(object)]
pub struct MemoryChunk {
    pub address: u32,
    pub data: Buffer,
    pub writable: bool,
}

#[napi(object)]
pub struct RunProgramOutput {
    /// RESULT_CODE_* of the terminal outcome.
    pub result_code: u8,
    pub gas_remaining: BigInt,
    pub pc: u32,
    pub registers: Vec<BigInt>,
    /// Start of the faulting page when `result_code` is FAULT.
    pub fault_address: Option<u32>,
    /// Halt output `[r7, r7 + r8)`.
    pub output: Buffer,
}

fn result_code(outcome: ExecOutcome) -> u64 {
    match outcome {
        ExecOutcome::Halt => RESULT_CODE_HALT,
        ExecOutcome::OutOfGas => RESULT_CODE_OOG,
        ExecOutcome::HostCall(_) => RESULT_CODE_HOST,
        ExecOutcome::Panic(_) if outcome.memory_fault().is_some() => RESULT_CODE_FAULT,
        ExecOutcome::Panic(_) | ExecOutcome::Continued => RESULT_CODE_PANIC,
    }
}

#[napi]
pub fn run_program(
    blob: Buffer,
    entry: u32,
    registers: Vec<BigInt>,
    gas: BigInt,
    chunks: Option<Vec<MemoryChunk>>,
) -> Result<RunProgramOutput> {
    let program = Program::from_blob(blob.as_ref()).map_err(|e| Error::from_reason(e.to_string()))?;

    let mut regs = Registers::new();
    for (index, value) in registers.iter().take(NUM_REGISTERS).enumerate() {
        regs[index] = value.get_u64().1;
    }

    let mut memory = Memory::default();
    for chunk in chunks.unwrap_or_default() {
        let access = if chunk.writable {
            PageAccess::ReadWrite
        } else {
            PageAccess::ReadOnly
        };
        let len = u32::try_from(chunk.data.len()).map_err(|_| Error::from_reason("chunk too large"))?;
        memory
            .initialize(chunk.address, len, chunk.data.as_ref(), access)
            .map_err(|e| Error::from_reason(e.to_string()))?;
    }

    let engine = Engine::default();
    let mut context = GenericContext::new(Arc::clone(engine.config()));
    let invocation = engine.run(Arc::new(program), entry, regs, memory, gas.get_u64().1, &mut context);

    Ok(RunProgramOutput {
        result_code: result_code(invocation.outcome()) as u8,
        gas_remaining: BigInt::from(invocation.gas_remaining()),
        pc: invocation.state().pc,
        registers: invocation.registers().as_array().iter().map(|&r| BigInt::from(r)).collect(),
        fault_address: invocation.outcome().memory_fault().map(|fault| fault.page_start()),
        output: invocation.output().unwrap_or_default().into(),
    })
}
