//! Error taxonomy for program construction, memory access and execution.

use crate::config::PAGE_SIZE;
use thiserror::Error;

/// Rejection of a program before any instruction runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("malformed program blob: {0}")]
    MalformedBlob(&'static str),

    #[error("bitmask covers {bitmask} positions but code has {code} bytes")]
    BitmaskLengthMismatch { code: usize, bitmask: usize },

    #[error("first code byte is not an instruction start")]
    MissingInstructionStart,

    #[error("jump table entry {index} targets {target}, beyond code length {code_len}")]
    JumpTargetOutOfBounds { index: usize, target: u32, code_len: usize },

    #[error("jump table entry {index} targets {target}, which is not a basic block start")]
    JumpTargetNotBlockStart { index: usize, target: u32 },

    #[error("{what} is {value}, limit is {limit}")]
    LimitExceeded { what: &'static str, value: u64, limit: u64 },

    #[error("standard program layout does not fit the address space")]
    InvalidLayout,
}

/// Classification of a rejected memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Unmapped page or address wrap.
    OutOfBounds,
    /// Mapped page whose permission does not cover the access.
    PermissionDenied,
}

/// A rejected memory access. `address` is the first byte that could not be accessed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("memory fault ({kind:?}) at {address:#010x}")]
pub struct MemoryFault {
    pub kind: FaultKind,
    pub address: u32,
}

impl MemoryFault {
    #[must_use]
    pub const fn out_of_bounds(address: u32) -> Self {
        Self {
            kind: FaultKind::OutOfBounds,
            address,
        }
    }

    #[must_use]
    pub const fn permission_denied(address: u32) -> Self {
        Self {
            kind: FaultKind::PermissionDenied,
            address,
        }
    }

    /// Start of the page holding `address`, as reported to an outer machine.
    #[must_use]
    pub const fn page_start(&self) -> u32 {
        self.address / PAGE_SIZE * PAGE_SIZE
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error(transparent)]
    Fault(#[from] MemoryFault),

    #[error("memory limit exceeded: requested end {requested:#x}, limit {limit:#x}")]
    LimitExceeded { requested: u64, limit: u64 },
}

/// Gas counter exhaustion.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("out of gas")]
pub struct OutOfGas;

/// Why an invocation ended in `panic`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicReason {
    #[error("trap")]
    Trap,

    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),

    #[error("invalid jump target {0}")]
    InvalidJumpTarget(u32),

    #[error(transparent)]
    MemoryFault(#[from] MemoryFault),

    /// Load or store below the first zone boundary.
    #[error("access to reserved address {0:#x}")]
    ReservedAddress(u32),

    #[error("memory limit exceeded")]
    MemoryLimitExceeded,

    #[error("arithmetic fault")]
    ArithmeticFault,

    #[error("host call fault: {0}")]
    HostCallFault(&'static str),
}

impl From<MemoryError> for PanicReason {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Fault(fault) => Self::MemoryFault(fault),
            MemoryError::LimitExceeded { .. } => Self::MemoryLimitExceeded,
        }
    }
}

/// Failure of a host function body. Mapped to an [`ExecOutcome`](crate::ExecOutcome) by the dispatcher.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCallError {
    /// The guest violated the call's memory contract.
    #[error("host call panic: {0}")]
    Panic(&'static str),

    #[error("host call arithmetic overflow")]
    Overflow,

    #[error("host call halted the invocation")]
    Halt,
}

/// Failure of the async invocation wrapper itself.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("invocation worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Program(#[from] ProgramError),
}
