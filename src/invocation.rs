//! Invocation entry points (Gray Paper Ψ_M / Ψ_H).
//!
//! [`Engine`] binds a [`VmConfig`] and runs programs against a [`HostCallContext`]. The
//! result is an [`Invocation`]: the terminal outcome together with the final machine state.
//! `invoke*` additionally hands that result to the context's `finish` to produce the
//! protocol-level output.

use crate::config::VmConfig;
use crate::error::{InvocationError, PanicReason, ProgramError};
use crate::host_functions::HostCallContext;
use crate::interpreter::Interpreter;
use crate::memory::Memory;
use crate::program::{Program, StandardProgram};
use crate::types::{ExecOutcome, Registers, VmState, RESULT_REGISTER};
use std::sync::Arc;
use thiserror::Error;

/// Terminal outcome plus the state the machine stopped in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    outcome: ExecOutcome,
    state: VmState,
}

/// Why an invocation produced no output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationFailure {
    #[error("out of gas")]
    OutOfGas,

    #[error("panic: {0}")]
    Panic(PanicReason),

    /// Stopped on a non-terminal outcome (only possible for hand-built invocations).
    #[error("invocation did not terminate")]
    Incomplete,
}

impl Invocation {
    #[must_use]
    pub const fn new(outcome: ExecOutcome, state: VmState) -> Self {
        Self { outcome, state }
    }

    #[must_use]
    pub const fn outcome(&self) -> ExecOutcome {
        self.outcome
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.state.registers
    }

    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.state.memory
    }

    #[must_use]
    pub const fn gas_remaining(&self) -> u64 {
        self.state.gas_remaining()
    }

    #[must_use]
    pub const fn state(&self) -> &VmState {
        &self.state
    }

    #[must_use]
    pub fn into_parts(self) -> (ExecOutcome, VmState) {
        (self.outcome, self.state)
    }

    /// Halt output: memory `[r7, r7 + r8)`. Empty when that range is not readable, `None`
    /// unless the machine halted.
    #[must_use]
    pub fn output(&self) -> Option<Vec<u8>> {
        if self.outcome != ExecOutcome::Halt {
            return None;
        }
        let regs = &self.state.registers;
        let range = u32::try_from(regs[RESULT_REGISTER])
            .ok()
            .zip(usize::try_from(regs[8]).ok());
        let output = range
            .and_then(|(address, len)| self.state.memory.read(address, len).ok())
            .unwrap_or_default();
        Some(output)
    }

    /// Output on halt, otherwise the reason there is none.
    pub fn result(&self) -> Result<Vec<u8>, InvocationFailure> {
        match self.outcome {
            ExecOutcome::Halt => Ok(self.output().unwrap_or_default()),
            ExecOutcome::OutOfGas => Err(InvocationFailure::OutOfGas),
            ExecOutcome::Panic(reason) => Err(InvocationFailure::Panic(reason)),
            ExecOutcome::Continued | ExecOutcome::HostCall(_) => Err(InvocationFailure::Incomplete),
        }
    }
}

/// Entry offsets into service code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    IsAuthorized,
    Refine,
    Accumulate,
    OnTransfer,
}

impl EntryPoint {
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::IsAuthorized | Self::Refine => 0,
            Self::Accumulate => 5,
            Self::OnTransfer => 10,
        }
    }
}

/// Runs programs under one configuration.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: Arc<VmConfig>,
}

impl Engine {
    #[must_use]
    pub fn new(config: VmConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn from_shared(config: Arc<VmConfig>) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &Arc<VmConfig> {
        &self.config
    }

    /// Run `program` from `entry` until it terminates, dispatching host calls to `context`.
    ///
    /// An entry that is not a basic-block start panics without charging gas.
    pub fn run<C: HostCallContext>(
        &self,
        program: Arc<Program>,
        entry: u32,
        registers: Registers,
        memory: Memory,
        gas: u64,
        context: &mut C,
    ) -> Invocation {
        let state = VmState::new(entry, registers, memory, gas);
        if !program.is_block_start(entry) {
            tracing::debug!(target: "pvm::engine", entry, "entry is not a block start");
            return Invocation::new(ExecOutcome::Panic(PanicReason::InvalidJumpTarget(entry)), state);
        }
        let mut interpreter = Interpreter::new(program, state, Arc::clone(&self.config));
        let outcome = interpreter.run(context);
        let state = interpreter.into_state();
        tracing::debug!(
            target: "pvm::engine",
            ?outcome,
            pc = state.pc,
            gas_used = gas.saturating_sub(state.gas_remaining()),
            "invocation finished"
        );
        Invocation::new(outcome, state)
    }

    /// [`Engine::run`] followed by the context's `finish`.
    pub fn invoke<C: HostCallContext>(
        &self,
        program: Arc<Program>,
        entry: u32,
        registers: Registers,
        memory: Memory,
        gas: u64,
        mut context: C,
    ) -> (Invocation, C::Output) {
        let invocation = self.run(program, entry, registers, memory, gas, &mut context);
        let output = context.finish(&invocation);
        (invocation, output)
    }

    /// Decode a standard program blob, lay out its memory with `args`, and invoke `entry`.
    pub fn invoke_standard<C: HostCallContext>(
        &self,
        blob: &[u8],
        entry: EntryPoint,
        args: &[u8],
        gas: u64,
        context: C,
    ) -> Result<(Invocation, C::Output), ProgramError> {
        let standard = StandardProgram::decode(blob)?;
        let (registers, memory) = standard.initial_state(args, self.config.max_memory_bytes)?;
        let program = Arc::new(standard.program);
        Ok(self.invoke(program, entry.offset(), registers, memory, gas, context))
    }

    /// [`Engine::run`] on the blocking pool. The context is moved in and handed back with
    /// the result so it can be finished or inspected.
    pub async fn run_async<C>(
        &self,
        program: Arc<Program>,
        entry: u32,
        registers: Registers,
        memory: Memory,
        gas: u64,
        mut context: C,
    ) -> Result<(Invocation, C), InvocationError>
    where
        C: HostCallContext + Send + 'static,
    {
        let engine = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let invocation = engine.run(program, entry, registers, memory, gas, &mut context);
            (invocation, context)
        });
        Ok(handle.await?)
    }
}

/// [`Engine::run`] under the default configuration.
pub fn run<C: HostCallContext>(
    program: Arc<Program>,
    entry: u32,
    registers: Registers,
    memory: Memory,
    gas: u64,
    context: &mut C,
) -> Invocation {
    Engine::default().run(program, entry, registers, memory, gas, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OPCODE_ECALLI, OPCODE_FALLTHROUGH, OPCODE_LOAD_IMM, OPCODE_TRAP, RESULT_CODE_HALT, REG_WHAT};
    use crate::host_functions::GenericContext;
    use crate::memory::PageAccess;

    fn program(code: &[u8], bitmask: &[u8]) -> Arc<Program> {
        Arc::new(Program::new(code, bitmask, vec![]).unwrap())
    }

    #[test]
    fn entry_off_block_start_panics_without_gas() {
        let engine = Engine::default();
        // load_imm r0, 1 | trap: pc 1 is an operand byte
        let program = program(&[OPCODE_LOAD_IMM, 0x00, 1, OPCODE_TRAP], &[1, 0, 0, 1]);
        let mut ctx = GenericContext::new(Arc::clone(engine.config()));
        let invocation = engine.run(program, 1, Registers::new(), Memory::default(), 50, &mut ctx);
        assert_eq!(invocation.outcome(), ExecOutcome::Panic(PanicReason::InvalidJumpTarget(1)));
        assert_eq!(invocation.gas_remaining(), 50);
        assert_eq!(invocation.result(), Err(InvocationFailure::Panic(PanicReason::InvalidJumpTarget(1))));
    }

    #[test]
    fn output_reads_result_range_on_halt() {
        let mut memory = Memory::default();
        memory.map_page(0x2_0000, PageAccess::ReadWrite).unwrap();
        memory.write(0x2_0000, b"done").unwrap();
        let mut registers = Registers::new();
        registers[7] = 0x2_0000;
        registers[8] = 4;
        let invocation = Invocation::new(ExecOutcome::Halt, VmState::new(0, registers, memory, 0));
        assert_eq!(invocation.output(), Some(b"done".to_vec()));

        let (_, mut state) = invocation.into_parts();
        state.registers[8] = 0x2000;
        let invocation = Invocation::new(ExecOutcome::Halt, state.clone());
        assert_eq!(invocation.output(), Some(Vec::new()));

        let invocation = Invocation::new(ExecOutcome::OutOfGas, state);
        assert_eq!(invocation.output(), None);
        assert_eq!(invocation.result(), Err(InvocationFailure::OutOfGas));
    }

    #[test]
    fn entry_points_match_service_layout() {
        assert_eq!(EntryPoint::Refine.offset(), 0);
        assert_eq!(EntryPoint::Accumulate.offset(), 5);
        assert_eq!(EntryPoint::OnTransfer.offset(), 10);
        assert_eq!(RESULT_CODE_HALT, 0);
    }

    #[test]
    fn running_off_the_end_is_a_trap() {
        let engine = Engine::default();
        let mut ctx = GenericContext::new(Arc::clone(engine.config()));
        let program = program(&[OPCODE_FALLTHROUGH], &[1]);
        let invocation = engine.run(program, 0, Registers::new(), Memory::default(), 10, &mut ctx);
        assert_eq!(invocation.outcome(), ExecOutcome::Panic(PanicReason::Trap));
        assert_eq!(invocation.gas_remaining(), 9);
    }

    #[test]
    fn host_calls_are_priced_by_the_engine() {
        let mut config = VmConfig::default();
        config.gas.instruction = 2;
        config.gas.unknown_host_call = 3;
        let engine = Engine::new(config);
        // context built from a different configuration
        let mut ctx = GenericContext::new(Arc::new(VmConfig::default()));
        let program = program(&[OPCODE_ECALLI, 77, OPCODE_TRAP], &[1, 0, 1]);
        let invocation = engine.run(program, 0, Registers::new(), Memory::default(), 100, &mut ctx);
        assert_eq!(invocation.outcome(), ExecOutcome::Panic(PanicReason::Trap));
        assert_eq!(invocation.registers()[RESULT_REGISTER], REG_WHAT);
        assert_eq!(invocation.gas_remaining(), 100 - 2 - 3 - 2);
    }

    #[tokio::test]
    async fn async_wrapper_matches_sync_run() {
        let engine = Engine::default();
        let program = program(&[OPCODE_LOAD_IMM, 0x03, 7, OPCODE_TRAP], &[1, 0, 0, 1]);
        let ctx = GenericContext::new(Arc::clone(engine.config()));
        let (invocation, ctx) = engine
            .run_async(Arc::clone(&program), 0, Registers::new(), Memory::default(), 20, ctx)
            .await
            .unwrap();
        let mut sync_ctx = GenericContext::new(Arc::clone(engine.config()));
        let expected = engine.run(program, 0, Registers::new(), Memory::default(), 20, &mut sync_ctx);
        assert_eq!(invocation, expected);
        assert_eq!(invocation.registers()[3], 7);
        assert!(ctx.logs.is_empty());
    }
}
