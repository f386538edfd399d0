//! Interpreter loop (Gray Paper equation 842-870).
//!
//! One [`Interpreter`] drives one [`VmState`] over a shared [`Program`]. Each step checks the
//! program counter, charges the instruction cost, decodes through the instruction registry,
//! executes, and advances the counter. `ecalli` stops the loop with [`ExecOutcome::HostCall`];
//! [`Interpreter::run`] hands those to a [`HostCallContext`] and resumes, while nested machines
//! use [`Interpreter::run_until_host_call`] and handle the trap themselves.

use crate::config::VmConfig;
use crate::error::PanicReason;
use crate::host_functions::HostCallContext;
use crate::instructions::{registry, Flow, InstructionContext};
use crate::program::Program;
use crate::types::{ExecOutcome, Status, VmState};
use std::sync::Arc;

pub struct Interpreter {
    program: Arc<Program>,
    state: VmState,
    config: Arc<VmConfig>,
    status: Status,
    /// Set once the machine terminates; later steps report it again.
    outcome: Option<ExecOutcome>,
}

impl Interpreter {
    #[must_use]
    pub fn new(program: Arc<Program>, state: VmState, config: Arc<VmConfig>) -> Self {
        Self {
            program,
            state,
            config,
            status: Status::Ready,
            outcome: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Terminal outcome, once reached.
    #[must_use]
    pub const fn outcome(&self) -> Option<ExecOutcome> {
        self.outcome
    }

    #[must_use]
    pub const fn state(&self) -> &VmState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut VmState {
        &mut self.state
    }

    #[must_use]
    pub fn into_state(self) -> VmState {
        self.state
    }

    #[must_use]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Execute one instruction.
    ///
    /// Returns `Continued` or `HostCall` while the machine is live; a terminal outcome
    /// moves it to [`Status::Terminated`] and is returned again by every later call.
    pub fn step(&mut self) -> ExecOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        self.status = Status::Running;
        let outcome = self.execute_instruction();
        match outcome {
            ExecOutcome::HostCall(_) => self.status = Status::Trapped,
            ExecOutcome::Continued => {}
            terminal => self.terminate(terminal),
        }
        outcome
    }

    /// Step until the machine terminates or traps on a host call it cannot dispatch itself.
    /// On `HostCall` the program counter already points past the `ecalli`.
    pub fn run_until_host_call(&mut self) -> ExecOutcome {
        loop {
            match self.step() {
                ExecOutcome::Continued => {}
                outcome => return outcome,
            }
        }
    }

    /// Run to a terminal outcome, dispatching every host call to `context`.
    pub fn run<C: HostCallContext>(&mut self, context: &mut C) -> ExecOutcome {
        loop {
            let ExecOutcome::HostCall(index) = self.run_until_host_call() else {
                return self.outcome.unwrap_or(ExecOutcome::Halt);
            };
            match context.dispatch(&self.config, index, &mut self.state) {
                ExecOutcome::Continued | ExecOutcome::HostCall(_) => self.status = Status::Running,
                terminal => {
                    self.terminate(terminal);
                    return terminal;
                }
            }
        }
    }

    fn terminate(&mut self, outcome: ExecOutcome) {
        self.status = Status::Terminated;
        self.outcome = Some(outcome);
    }

    fn execute_instruction(&mut self) -> ExecOutcome {
        let program = &*self.program;
        let pc = self.state.pc;

        // Running off the end of code behaves as `trap`.
        let Some(opcode) = program.opcode_at(pc) else {
            return ExecOutcome::Panic(PanicReason::Trap);
        };
        if !program.is_instruction_start(pc) {
            return ExecOutcome::Panic(PanicReason::InvalidJumpTarget(pc));
        }
        if self.state.gas.consume(self.config.gas.instruction).is_err() {
            return ExecOutcome::OutOfGas;
        }
        let Some(handler) = registry().get(opcode) else {
            return ExecOutcome::Panic(PanicReason::InvalidOpcode(opcode));
        };

        let skip = program.skip(pc);
        let mut context = InstructionContext {
            registers: &mut self.state.registers,
            memory: &mut self.state.memory,
            program,
            pc,
            operands: program.operands(pc),
            skip,
        };

        #[cfg(feature = "instruction_tracing")]
        tracing::trace!(
            target: "pvm::interpreter",
            pc,
            gas = self.state.gas.remaining(),
            "{}",
            handler.disassemble(context.operands, skip)
        );

        let next = pc + 1 + skip;
        match handler.execute(&mut context) {
            Ok(Flow::Next) => {
                self.state.pc = next;
                ExecOutcome::Continued
            }
            Ok(Flow::Jump(target)) => {
                self.state.pc = target;
                ExecOutcome::Continued
            }
            Ok(Flow::Halt) => ExecOutcome::Halt,
            Ok(Flow::HostCall(index)) => {
                self.state.pc = next;
                ExecOutcome::HostCall(index)
            }
            Err(reason) => ExecOutcome::Panic(reason),
        }
    }
}
