//! Refine invocation (Gray Paper Ψ_R): inner machines, segment exports and historical lookups.
//!
//! The context owns the integrated machines (m) and the export sequence (e). Inner machines run
//! through the same [`Interpreter`](crate::interpreter::Interpreter) as the outer program; they
//! stop at their first host call and hand control back to the guest that invoked them.

mod expunge;
mod export;
mod historical_lookup;
mod invoke;
mod machine;
mod pages;
mod peek;
mod poke;

pub use expunge::ExpungeHostFunction;
pub use export::ExportHostFunction;
pub use historical_lookup::HistoricalLookupHostFunction;
pub use invoke::InvokeHostFunction;
pub use machine::MachineHostFunction;
pub use pages::PagesHostFunction;
pub use peek::PeekHostFunction;
pub use poke::PokeHostFunction;

use crate::config::VmConfig;
use crate::host_functions::base::{HostCallContext, HostEnvironment, HostRegistry, LogEntry};
use crate::host_functions::general::{FetchData, FetchHostFunction, GasHostFunction, LogHostFunction};
use crate::host_functions::service::ServiceAccount;
use crate::invocation::{Invocation, InvocationFailure};
use crate::memory::Memory;
use crate::program::Program;
use crate::types::{ExecOutcome, VmState};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// An inner PVM created by MACHINE.
#[derive(Clone, Debug)]
pub struct GuestMachine {
    pub program: Arc<Program>,
    pub memory: Memory,
    pub pc: u32,
}

pub struct RefineContext {
    config: Arc<VmConfig>,
    /// Configuration of the engine currently dispatching; inner machines run under it.
    machine_config: Arc<VmConfig>,
    pub service_id: u32,
    /// Accounts visible to HISTORICAL_LOOKUP.
    pub accounts: BTreeMap<u32, ServiceAccount>,
    pub lookup_anchor_timeslot: u32,
    pub fetch: FetchData,
    pub machines: BTreeMap<u64, GuestMachine>,
    pub exports: Vec<Vec<u8>>,
    /// Segments exported by earlier work items of the same package.
    pub export_offset: u64,
    pub logs: Vec<LogEntry>,
}

impl RefineContext {
    #[must_use]
    pub fn new(config: Arc<VmConfig>, service_id: u32) -> Self {
        Self {
            machine_config: Arc::clone(&config),
            config,
            service_id,
            accounts: BTreeMap::new(),
            lookup_anchor_timeslot: 0,
            fetch: FetchData::default(),
            machines: BTreeMap::new(),
            exports: Vec::new(),
            export_offset: 0,
            logs: Vec::new(),
        }
    }
}

/// Refinement result: the work output (or why it failed) and the exported segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefineOutput {
    pub result: Result<Vec<u8>, InvocationFailure>,
    /// Empty unless the invocation halted.
    pub exports: Vec<Vec<u8>>,
    pub logs: Vec<LogEntry>,
}

fn registry() -> &'static HostRegistry<RefineContext> {
    static REGISTRY: OnceLock<HostRegistry<RefineContext>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = HostRegistry::<RefineContext>::new();
        registry.register(Box::new(GasHostFunction));
        registry.register(Box::new(FetchHostFunction));
        registry.register(Box::new(HistoricalLookupHostFunction));
        registry.register(Box::new(ExportHostFunction));
        registry.register(Box::new(MachineHostFunction));
        registry.register(Box::new(PeekHostFunction));
        registry.register(Box::new(PokeHostFunction));
        registry.register(Box::new(PagesHostFunction));
        registry.register(Box::new(InvokeHostFunction));
        registry.register(Box::new(ExpungeHostFunction));
        registry.register(Box::new(LogHostFunction));
        registry
    })
}

impl HostEnvironment for RefineContext {
    fn config(&self) -> &VmConfig {
        &self.config
    }
    fn fetch_data(&self) -> &FetchData {
        &self.fetch
    }
    fn record_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }
}

impl HostCallContext for RefineContext {
    type Output = RefineOutput;

    fn dispatch(&mut self, config: &Arc<VmConfig>, index: u32, state: &mut VmState) -> ExecOutcome {
        self.machine_config = Arc::clone(config);
        registry().dispatch(&config.gas, index, state, self)
    }

    fn finish(self, invocation: &Invocation) -> RefineOutput {
        let result = invocation.result();
        let exports = if result.is_ok() { self.exports } else { Vec::new() };
        RefineOutput {
            result,
            exports,
            logs: self.logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        FUNC_EXPORT, FUNC_EXPUNGE, FUNC_INVOKE, FUNC_MACHINE, FUNC_PAGES, FUNC_PEEK, FUNC_POKE,
        OPCODE_ECALLI, OPCODE_LOAD_IMM, OPCODE_LOAD_U32, OPCODE_TRAP, REG_FULL, REG_HUH, REG_OK,
        REG_OOB, REG_WHO, RESULT_CODE_FAULT, RESULT_CODE_HOST, RESULT_CODE_OOG, RESULT_CODE_PANIC,
    };
    use crate::memory::PageAccess;
    use crate::program::encode_blob;
    use crate::types::{Registers, RESULT_REGISTER};

    const SCRATCH: u32 = 0x2_0000;

    fn context() -> RefineContext {
        RefineContext::new(Arc::new(VmConfig::default()), 1)
    }

    fn outer_state() -> VmState {
        let mut memory = Memory::default();
        memory.map_range(SCRATCH, 0x2000, PageAccess::ReadWrite).unwrap();
        VmState::new(0, Registers::new(), memory, 10_000)
    }

    fn call(ctx: &mut RefineContext, state: &mut VmState, index: u32, args: &[(usize, u64)]) -> ExecOutcome {
        for &(reg, value) in args {
            state.registers[reg] = value;
        }
        let config = Arc::clone(&ctx.config);
        ctx.dispatch(&config, index, state)
    }

    /// Create a machine from `code` (every byte an instruction start unless `bitmask` says otherwise).
    fn create_machine(ctx: &mut RefineContext, state: &mut VmState, code: &[u8], bitmask: &[u8]) -> u64 {
        let blob = encode_blob(code, bitmask, &[]);
        state.memory.write(SCRATCH, &blob).unwrap();
        let outcome = call(ctx, state, FUNC_MACHINE, &[(7, u64::from(SCRATCH)), (8, blob.len() as u64), (9, 0)]);
        assert_eq!(outcome, ExecOutcome::Continued);
        state.registers[RESULT_REGISTER]
    }

    fn invoke_block(gas: u64, registers: Registers) -> Vec<u8> {
        let mut block = gas.to_le_bytes().to_vec();
        block.extend_from_slice(&registers.to_le_bytes());
        block
    }

    #[test]
    fn export_pads_and_counts() {
        let mut ctx = context();
        ctx.export_offset = 5;
        let mut state = outer_state();
        state.memory.write(SCRATCH, b"seg").unwrap();
        call(&mut ctx, &mut state, FUNC_EXPORT, &[(7, u64::from(SCRATCH)), (8, 3)]);
        assert_eq!(state.registers[RESULT_REGISTER], 5);
        let segment_size = ctx.config.protocol.segment_size() as usize;
        assert_eq!(ctx.exports[0].len(), segment_size);
        assert_eq!(&ctx.exports[0][..3], b"seg");

        ctx.export_offset = u64::from(ctx.config.protocol.max_exports) - 1;
        call(&mut ctx, &mut state, FUNC_EXPORT, &[(7, u64::from(SCRATCH)), (8, 3)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_FULL);
        assert_eq!(ctx.exports.len(), 1);
    }

    #[test]
    fn machine_rejects_bad_blob_and_reuses_ids() {
        let mut ctx = context();
        let mut state = outer_state();
        assert_eq!(create_machine(&mut ctx, &mut state, &[OPCODE_TRAP], &[1]), 0);
        assert_eq!(create_machine(&mut ctx, &mut state, &[OPCODE_TRAP], &[1]), 1);

        call(&mut ctx, &mut state, FUNC_EXPUNGE, &[(7, 0)]);
        assert_eq!(state.registers[RESULT_REGISTER], 0);
        assert_eq!(create_machine(&mut ctx, &mut state, &[OPCODE_TRAP], &[1]), 0);

        state.memory.write(SCRATCH, &[0xff; 4]).unwrap();
        call(&mut ctx, &mut state, FUNC_MACHINE, &[(7, u64::from(SCRATCH)), (8, 4), (9, 0)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_HUH);
        call(&mut ctx, &mut state, FUNC_EXPUNGE, &[(7, 9)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_WHO);
    }

    #[test]
    fn pages_poke_and_peek() {
        let mut ctx = context();
        let mut state = outer_state();
        let n = create_machine(&mut ctx, &mut state, &[OPCODE_TRAP], &[1]);
        let inner = u64::from(SCRATCH);

        // Below the first zone, and protecting unmapped pages, are rejected.
        call(&mut ctx, &mut state, FUNC_PAGES, &[(7, n), (8, 1), (9, 1), (10, 2)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_HUH);
        call(&mut ctx, &mut state, FUNC_PAGES, &[(7, n), (8, 32), (9, 1), (10, 4)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_HUH);

        call(&mut ctx, &mut state, FUNC_POKE, &[(7, n), (8, u64::from(SCRATCH)), (9, inner), (10, 4)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_OOB);

        call(&mut ctx, &mut state, FUNC_PAGES, &[(7, n), (8, 32), (9, 1), (10, 2)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_OK);
        state.memory.write(SCRATCH, b"ping").unwrap();
        call(&mut ctx, &mut state, FUNC_POKE, &[(7, n), (8, u64::from(SCRATCH)), (9, inner), (10, 4)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_OK);

        let dest = u64::from(SCRATCH) + 0x100;
        call(&mut ctx, &mut state, FUNC_PEEK, &[(7, n), (8, dest), (9, inner), (10, 4)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_OK);
        assert_eq!(state.memory.read(SCRATCH + 0x100, 4).unwrap(), b"ping");

        call(&mut ctx, &mut state, FUNC_PEEK, &[(7, 7), (8, dest), (9, inner), (10, 4)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_WHO);

        // Read-only pages keep their contents but refuse pokes.
        call(&mut ctx, &mut state, FUNC_PAGES, &[(7, n), (8, 32), (9, 1), (10, 3)]);
        call(&mut ctx, &mut state, FUNC_POKE, &[(7, n), (8, u64::from(SCRATCH)), (9, inner), (10, 4)]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_OOB);
        assert_eq!(ctx.machines[&n].memory.read(SCRATCH, 4).unwrap(), b"ping");
    }

    #[test]
    fn peek_into_unwritable_memory_panics() {
        let mut ctx = context();
        let mut state = outer_state();
        let outcome = call(&mut ctx, &mut state, FUNC_PEEK, &[(7, 0), (8, 0x9_0000), (9, 0), (10, 4)]);
        assert!(matches!(outcome, ExecOutcome::Panic(_)));
    }

    #[test]
    fn invoke_reports_host_call_and_resumes() {
        let mut ctx = context();
        let mut state = outer_state();
        // load_imm r7, 9 | ecalli 3 | trap
        let n = create_machine(
            &mut ctx,
            &mut state,
            &[OPCODE_LOAD_IMM, 0x07, 9, OPCODE_ECALLI, 3, OPCODE_TRAP],
            &[1, 0, 0, 1, 0, 1],
        );
        let block_at = SCRATCH + 0x1000;
        state.memory.write(block_at, &invoke_block(100, Registers::new())).unwrap();

        call(&mut ctx, &mut state, FUNC_INVOKE, &[(7, n), (8, u64::from(block_at))]);
        assert_eq!(state.registers[RESULT_REGISTER], RESULT_CODE_HOST);
        assert_eq!(state.registers[8], 3);
        let block = state.memory.read(block_at, 112).unwrap();
        assert_eq!(&block[..8], &98u64.to_le_bytes());
        assert_eq!(&block[8 + 7 * 8..8 + 8 * 8], &9u64.to_le_bytes());
        assert_eq!(ctx.machines[&n].pc, 5);

        call(&mut ctx, &mut state, FUNC_INVOKE, &[(7, n), (8, u64::from(block_at))]);
        assert_eq!(state.registers[RESULT_REGISTER], RESULT_CODE_PANIC);
    }

    #[test]
    fn invoke_reports_fault_address_and_out_of_gas() {
        let mut ctx = context();
        let mut state = outer_state();
        // load_u32 r1, [0x30000]
        let n = create_machine(
            &mut ctx,
            &mut state,
            &[OPCODE_LOAD_U32, 0x01, 0x00, 0x00, 0x03],
            &[1, 0, 0, 0, 0],
        );
        let block_at = SCRATCH + 0x1000;
        state.memory.write(block_at, &invoke_block(100, Registers::new())).unwrap();
        call(&mut ctx, &mut state, FUNC_INVOKE, &[(7, n), (8, u64::from(block_at))]);
        assert_eq!(state.registers[RESULT_REGISTER], RESULT_CODE_FAULT);
        assert_eq!(state.registers[8], 0x3_0000);

        let n = create_machine(&mut ctx, &mut state, &[OPCODE_TRAP], &[1]);
        state.memory.write(block_at, &invoke_block(0, Registers::new())).unwrap();
        call(&mut ctx, &mut state, FUNC_INVOKE, &[(7, n), (8, u64::from(block_at))]);
        assert_eq!(state.registers[RESULT_REGISTER], RESULT_CODE_OOG);

        call(&mut ctx, &mut state, FUNC_INVOKE, &[(7, 42), (8, u64::from(block_at))]);
        assert_eq!(state.registers[RESULT_REGISTER], REG_WHO);
    }

    #[test]
    fn invoke_fault_reports_page_start() {
        let mut ctx = context();
        let mut state = outer_state();
        // load_u32 r1, [0x30010]
        let n = create_machine(
            &mut ctx,
            &mut state,
            &[OPCODE_LOAD_U32, 0x01, 0x10, 0x00, 0x03],
            &[1, 0, 0, 0, 0],
        );
        let block_at = SCRATCH + 0x1000;
        state.memory.write(block_at, &invoke_block(100, Registers::new())).unwrap();
        call(&mut ctx, &mut state, FUNC_INVOKE, &[(7, n), (8, u64::from(block_at))]);
        assert_eq!(state.registers[RESULT_REGISTER], RESULT_CODE_FAULT);
        assert_eq!(state.registers[8], 0x3_0000);
    }

    #[test]
    fn invoke_reserved_access_is_panic() {
        let mut ctx = context();
        let mut state = outer_state();
        // load_u32 r1, [0x100]
        let n = create_machine(&mut ctx, &mut state, &[OPCODE_LOAD_U32, 0x01, 0x00, 0x01], &[1, 0, 0, 0]);
        let block_at = SCRATCH + 0x1000;
        state.memory.write(block_at, &invoke_block(100, Registers::new())).unwrap();
        call(&mut ctx, &mut state, FUNC_INVOKE, &[(7, n), (8, u64::from(block_at))]);
        assert_eq!(state.registers[RESULT_REGISTER], RESULT_CODE_PANIC);
        assert_eq!(state.registers[8], u64::from(block_at));
    }

    #[test]
    fn invoke_uses_dispatching_cost_table() {
        let mut ctx = context();
        let mut state = outer_state();
        let n = create_machine(&mut ctx, &mut state, &[OPCODE_TRAP], &[1]);
        let block_at = SCRATCH + 0x1000;
        state.memory.write(block_at, &invoke_block(100, Registers::new())).unwrap();

        let mut engine_config = VmConfig::default();
        engine_config.gas.instruction = 5;
        engine_config.gas.host_call_base = 3;
        let engine_config = Arc::new(engine_config);
        let before = state.gas_remaining();
        state.registers[7] = n;
        state.registers[8] = u64::from(block_at);
        ctx.dispatch(&engine_config, FUNC_INVOKE, &mut state);

        assert_eq!(state.gas_remaining(), before - 3);
        assert_eq!(state.registers[RESULT_REGISTER], RESULT_CODE_PANIC);
        assert_eq!(state.memory.read(block_at, 8).unwrap(), 95u64.to_le_bytes());
    }
}
