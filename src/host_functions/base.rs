//! Host-call contract (Gray Paper Appendix B.1).
//!
//! A [`HostCallContext`] receives every `ecalli` the interpreter traps on. Contexts keep a
//! [`HostRegistry`] of the calls they support; anything else is answered with `WHAT`.
//! Individual calls are unit structs implementing [`HostFunction`] over the context type
//! they need, usually through the [`HostEnvironment`] / [`ServiceEnvironment`] accessors.

use crate::config::{GasCostTable, VmConfig, REG_WHAT};
use crate::crypto::Hash;
use crate::error::{HostCallError, PanicReason};
use crate::host_functions::general::fetch::FetchData;
use crate::host_functions::service::ServiceAccount;
use crate::invocation::Invocation;
use crate::memory::Memory;
use crate::types::{ExecOutcome, Registers, VmState, RESULT_REGISTER};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Capability set of one invocation kind.
pub trait HostCallContext {
    /// What the invocation yields to the caller once it terminates.
    type Output;

    /// Handle host call `index`. The program counter already points past the `ecalli`.
    /// `config` belongs to the running engine; its gas table prices the call.
    fn dispatch(&mut self, config: &Arc<VmConfig>, index: u32, state: &mut VmState) -> ExecOutcome;

    /// Turn the final context state and invocation result into the protocol-level output.
    fn finish(self, invocation: &Invocation) -> Self::Output;
}

pub type HostCallResult = Result<(), HostCallError>;

/// One host call, implemented for every context type `C` that can serve it.
pub trait HostFunction<C>: Send + Sync {
    /// FUNC_* index.
    fn function_id(&self) -> u32;
    fn name(&self) -> &'static str;

    /// Gas charged before `execute` runs.
    fn gas_cost(&self, table: &GasCostTable, _registers: &Registers) -> u64 {
        table.host_call_cost(self.function_id())
    }

    fn execute(&self, state: &mut VmState, context: &mut C) -> HostCallResult;
}

/// Charge, run and translate one host call.
pub fn call<C>(
    function: &dyn HostFunction<C>,
    table: &GasCostTable,
    state: &mut VmState,
    context: &mut C,
) -> ExecOutcome {
    if state.gas.consume(function.gas_cost(table, &state.registers)).is_err() {
        return ExecOutcome::OutOfGas;
    }
    crate::host_log!(
        "[hostfn] {}({}) r7={:#x}",
        function.name(),
        function.function_id(),
        state.registers[RESULT_REGISTER]
    );
    match function.execute(state, context) {
        Ok(()) => ExecOutcome::Continued,
        Err(HostCallError::Panic(reason)) => {
            crate::host_log_error!("[hostfn] {} PANIC: {}", function.name(), reason);
            ExecOutcome::Panic(PanicReason::HostCallFault(reason))
        }
        Err(HostCallError::Overflow) => {
            crate::host_log_error!("[hostfn] {} PANIC: arithmetic overflow", function.name());
            ExecOutcome::Panic(PanicReason::ArithmeticFault)
        }
        Err(HostCallError::Halt) => ExecOutcome::Halt,
    }
}

/// Answer an index the context does not support: charge the fixed cost and write `WHAT`.
pub fn unknown(table: &GasCostTable, index: u32, state: &mut VmState) -> ExecOutcome {
    if state.gas.consume(table.unknown_host_call).is_err() {
        return ExecOutcome::OutOfGas;
    }
    crate::host_log!("[hostfn] unknown host call {}", index);
    state.registers[RESULT_REGISTER] = REG_WHAT;
    ExecOutcome::Continued
}

/// Host calls supported by one context type, keyed by index.
pub struct HostRegistry<C> {
    functions: BTreeMap<u32, Box<dyn HostFunction<C>>>,
}

impl<C> HostRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, function: Box<dyn HostFunction<C>>) {
        self.functions.insert(function.function_id(), function);
    }

    #[must_use]
    pub fn get(&self, index: u32) -> Option<&dyn HostFunction<C>> {
        self.functions.get(&index).map(Box::as_ref)
    }

    pub fn supported(&self) -> impl Iterator<Item = u32> + '_ {
        self.functions.keys().copied()
    }

    /// Dispatch `index` to its function, or answer `WHAT`.
    pub fn dispatch(&self, table: &GasCostTable, index: u32, state: &mut VmState, context: &mut C) -> ExecOutcome {
        match self.get(index) {
            Some(function) => call(function, table, state, context),
            None => unknown(table, index, state),
        }
    }
}

impl<C> Default for HostRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Context accessors
// ============================================================================

/// One LOG (JIP-1) entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub level: u64,
    pub target: Option<String>,
    pub message: String,
}

/// What every context offers: configuration, FETCH data and the debug log.
pub trait HostEnvironment {
    fn config(&self) -> &VmConfig;
    fn fetch_data(&self) -> &FetchData;
    fn record_log(&mut self, entry: LogEntry);
}

/// Contexts acting on behalf of one service with a view of service accounts.
pub trait ServiceEnvironment: HostEnvironment {
    fn service_id(&self) -> u32;
    fn account(&self, id: u32) -> Option<&ServiceAccount>;
    fn current_account_mut(&mut self) -> Option<&mut ServiceAccount>;

    /// `NONE` in a service register selects the current service.
    fn resolve_service(&self, register: u64) -> Option<u32> {
        if register == u64::MAX {
            Some(self.service_id())
        } else {
            u32::try_from(register).ok()
        }
    }
}

// ============================================================================
// Guest memory helpers
// ============================================================================

fn guest_range(address: u64, len: u64) -> Option<(u32, usize)> {
    let address = u32::try_from(address).ok()?;
    let len = usize::try_from(len).ok()?;
    Some((address, len))
}

/// Read `len` bytes the guest pointed at, panicking the invocation if they are not readable.
pub fn read_guest(memory: &Memory, address: u64, len: u64, what: &'static str) -> Result<Vec<u8>, HostCallError> {
    let (address, len) = guest_range(address, len).ok_or(HostCallError::Panic(what))?;
    memory.read(address, len).map_err(|_| HostCallError::Panic(what))
}

pub fn read_guest_hash(memory: &Memory, address: u64, what: &'static str) -> Result<Hash, HostCallError> {
    let mut hash = [0u8; 32];
    let address = u32::try_from(address).map_err(|_| HostCallError::Panic(what))?;
    memory.read_into(address, &mut hash).map_err(|_| HostCallError::Panic(what))?;
    Ok(hash)
}

pub fn write_guest(memory: &mut Memory, address: u64, data: &[u8], what: &'static str) -> HostCallResult {
    let address = u32::try_from(address).map_err(|_| HostCallError::Panic(what))?;
    memory.write(address, data).map_err(|_| HostCallError::Panic(what))
}

/// Whether `[address, address + len)` is writable, with out-of-range arguments counting as not.
#[must_use]
pub fn guest_writable(memory: &Memory, address: u64, len: u64) -> bool {
    guest_range(address, len).is_some_and(|(address, len)| memory.is_writable(address, len))
}

/// v[f..f+l] with f = min(from, |v|) and l = min(len, |v| - f).
#[must_use]
pub fn clamp_slice(value: &[u8], from: u64, len: u64) -> &[u8] {
    let start = usize::try_from(from).unwrap_or(usize::MAX).min(value.len());
    let len = usize::try_from(len).unwrap_or(usize::MAX).min(value.len() - start);
    &value[start..start + len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FUNC_GAS;
    use crate::memory::PageAccess;

    struct Bare;

    struct Echo;

    impl HostFunction<Bare> for Echo {
        fn function_id(&self) -> u32 {
            FUNC_GAS
        }
        fn name(&self) -> &'static str {
            "echo"
        }
        fn execute(&self, state: &mut VmState, _context: &mut Bare) -> HostCallResult {
            if state.registers[8] == 1 {
                return Err(HostCallError::Panic("asked to fail"));
            }
            state.registers[RESULT_REGISTER] = 99;
            Ok(())
        }
    }

    fn registry() -> HostRegistry<Bare> {
        let mut registry = HostRegistry::<Bare>::new();
        registry.register(Box::new(Echo));
        registry
    }

    #[test]
    fn known_call_charges_and_runs() {
        let mut state = VmState::new(0, Registers::new(), Memory::default(), 100);
        let outcome = registry().dispatch(&GasCostTable::default(), FUNC_GAS, &mut state, &mut Bare);
        assert_eq!(outcome, ExecOutcome::Continued);
        assert_eq!(state.registers[RESULT_REGISTER], 99);
        assert_eq!(state.gas_remaining(), 90);
    }

    #[test]
    fn unknown_call_writes_what() {
        let mut state = VmState::new(0, Registers::new(), Memory::default(), 100);
        let outcome = registry().dispatch(&GasCostTable::default(), 77, &mut state, &mut Bare);
        assert_eq!(outcome, ExecOutcome::Continued);
        assert_eq!(state.registers[RESULT_REGISTER], REG_WHAT);
        assert_eq!(state.gas_remaining(), 90);
    }

    #[test]
    fn unknown_call_without_gas_is_out_of_gas() {
        let mut state = VmState::new(0, Registers::new(), Memory::default(), 5);
        let outcome = registry().dispatch(&GasCostTable::default(), 77, &mut state, &mut Bare);
        assert_eq!(outcome, ExecOutcome::OutOfGas);
        assert_eq!(state.registers[RESULT_REGISTER], 0);
    }

    #[test]
    fn failing_call_panics_with_reason() {
        let mut state = VmState::new(0, Registers::new(), Memory::default(), 100);
        state.registers[8] = 1;
        let outcome = registry().dispatch(&GasCostTable::default(), FUNC_GAS, &mut state, &mut Bare);
        assert_eq!(outcome, ExecOutcome::Panic(PanicReason::HostCallFault("asked to fail")));
    }

    #[test]
    fn guest_reads_fault_as_panic() {
        let mut memory = Memory::default();
        memory.map_page(0x2_0000, PageAccess::ReadOnly).unwrap();
        assert_eq!(read_guest(&memory, 0x2_0000, 4, "x"), Ok(vec![0; 4]));
        assert_eq!(read_guest(&memory, 0x3_0000, 4, "x"), Err(HostCallError::Panic("x")));
        assert_eq!(read_guest(&memory, 1 << 40, 4, "x"), Err(HostCallError::Panic("x")));
        assert!(!guest_writable(&memory, 0x2_0000, 1));
        assert!(write_guest(&mut memory, 0x2_0000, &[1], "w").is_err());
    }

    #[test]
    fn slices_clamp_to_value() {
        let value = [1u8, 2, 3, 4];
        assert_eq!(clamp_slice(&value, 1, 2), &[2, 3]);
        assert_eq!(clamp_slice(&value, 3, 10), &[4]);
        assert!(clamp_slice(&value, 9, 10).is_empty());
        assert_eq!(clamp_slice(&value, 0, u64::MAX), &value);
    }
}
