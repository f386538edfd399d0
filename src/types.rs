//! Core execution types: register file, outcomes, interpreter status and VM state.

use crate::error::{MemoryFault, PanicReason};
use crate::gas::GasMeter;
use crate::memory::Memory;
use std::ops::{Index, IndexMut};

// ============================================================================
// Register file
// ============================================================================

pub const NUM_REGISTERS: usize = 13;

/// Register carrying host-call arguments in and the status code out.
pub const RESULT_REGISTER: usize = 7;

/// Thirteen 64-bit registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Registers([u64; NUM_REGISTERS]);

impl Registers {
    #[must_use]
    pub const fn new() -> Self {
        Self([0; NUM_REGISTERS])
    }

    #[must_use]
    pub const fn from_array(values: [u64; NUM_REGISTERS]) -> Self {
        Self(values)
    }

    #[must_use]
    pub const fn as_array(&self) -> &[u64; NUM_REGISTERS] {
        &self.0
    }

    /// Register `index`, low 32 bits, as a guest address.
    #[must_use]
    pub const fn address(&self, index: usize) -> u32 {
        self.0[index] as u32
    }

    /// Little-endian 8-byte encoding of every register, in order.
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|r| r.to_le_bytes()).collect()
    }

    /// Inverse of [`Registers::to_le_bytes`]. Missing trailing bytes read as zero.
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let mut values = [0u64; NUM_REGISTERS];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks(8)) {
            *value = crate::codec::read_le(chunk);
        }
        Self(values)
    }
}

impl From<[u64; NUM_REGISTERS]> for Registers {
    fn from(values: [u64; NUM_REGISTERS]) -> Self {
        Self(values)
    }
}

impl Index<usize> for Registers {
    type Output = u64;

    fn index(&self, index: usize) -> &u64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Registers {
    fn index_mut(&mut self, index: usize) -> &mut u64 {
        &mut self.0[index]
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Signal produced by one interpreter step or one host-call dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Resume interpreting.
    Continued,
    /// `ecalli` trapped with this index. Internal to the loop.
    HostCall(u32),
    Halt,
    OutOfGas,
    Panic(PanicReason),
}

impl ExecOutcome {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Halt | Self::OutOfGas | Self::Panic(_))
    }

    /// Memory fault carried by a panic, if any.
    #[must_use]
    pub const fn memory_fault(&self) -> Option<MemoryFault> {
        match self {
            Self::Panic(PanicReason::MemoryFault(fault)) => Some(*fault),
            _ => None,
        }
    }
}

/// Interpreter state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ready,
    Running,
    /// Stopped on a host call that has not been dispatched yet.
    Trapped,
    Terminated,
}

// ============================================================================
// VM state
// ============================================================================

/// Registers, memory, gas and program counter of one invocation. The unit handed to host calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmState {
    pub pc: u32,
    pub registers: Registers,
    pub memory: Memory,
    pub gas: GasMeter,
}

impl VmState {
    #[must_use]
    pub const fn new(pc: u32, registers: Registers, memory: Memory, gas: u64) -> Self {
        Self {
            pc,
            registers,
            memory,
            gas: GasMeter::new(gas),
        }
    }

    #[must_use]
    pub const fn gas_remaining(&self) -> u64 {
        self.gas.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_bytes_round_trip() {
        let mut regs = Registers::new();
        regs[0] = 1;
        regs[12] = u64::MAX;
        let bytes = regs.to_le_bytes();
        assert_eq!(bytes.len(), 8 * NUM_REGISTERS);
        assert_eq!(Registers::from_le_bytes(&bytes), regs);
    }

    #[test]
    fn address_truncates_to_low_bits() {
        let regs = Registers::from_array([0x1_0000_0002, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(regs.address(0), 2);
    }

    #[test]
    fn terminal_outcomes() {
        assert!(ExecOutcome::Halt.is_terminal());
        assert!(ExecOutcome::Panic(PanicReason::Trap).is_terminal());
        assert!(!ExecOutcome::HostCall(3).is_terminal());
        assert!(!ExecOutcome::Continued.is_terminal());
    }
}
