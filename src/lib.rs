//! PVM execution engine: a gas-metered register machine for JAM service code.
//!
//! Programs are decoded once into an immutable [`Program`] and shared through `Arc`. An
//! [`Engine`] runs them against a [`HostCallContext`], which decides what each `ecalli` may
//! do. The five invocation kinds (generic, is-authorized, refine, accumulate, on-transfer)
//! ship as ready-made contexts in [`host_functions`].

/// Host-call trace event, compiled out unless built with `--features host_calls_logging`.
#[macro_export]
macro_rules! host_log {
    ($($t:tt)*) => {
        #[cfg(feature = "host_calls_logging")]
        tracing::debug!(target: "pvm::host", $($t)*);
        #[cfg(not(feature = "host_calls_logging"))]
        {
            let _ = || ::std::format!($($t)*);
        }
    };
}

/// Host-call error path (PANIC, HUH, FULL). Emitted under `host_calls_errors_only` or
/// `host_calls_logging`.
#[macro_export]
macro_rules! host_log_error {
    ($($t:tt)*) => {
        #[cfg(any(feature = "host_calls_logging", feature = "host_calls_errors_only"))]
        tracing::warn!(target: "pvm::host", $($t)*);
        #[cfg(not(any(feature = "host_calls_logging", feature = "host_calls_errors_only")))]
        {
            let _ = || ::std::format!($($t)*);
        }
    };
}

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gas;
pub mod host_functions;
pub mod instructions;
pub mod interpreter;
pub mod invocation;
pub mod memory;
pub mod program;
pub mod types;

#[cfg(feature = "napi")]
mod bindings;

pub use config::{GasCostTable, ProtocolConstants, VmConfig};
pub use error::{
    FaultKind, HostCallError, InvocationError, MemoryError, MemoryFault, PanicReason, ProgramError,
};
pub use host_functions::{
    AccumulateContext, GenericContext, HostCallContext, InvocationContext, InvocationOutput,
    IsAuthorizedContext, OnTransferContext, RefineContext,
};
pub use interpreter::Interpreter;
pub use invocation::{run, Engine, EntryPoint, Invocation, InvocationFailure};
pub use memory::{Memory, PageAccess};
pub use program::{Program, StandardProgram};
pub use types::{ExecOutcome, Registers, Status, VmState};
