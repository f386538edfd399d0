//! Host functions (Gray Paper Appendix B), grouped by the invocation kinds that expose them.
//! Every context owns a static registry; see [`base`] for the dispatch contract.

pub mod accumulate;
pub mod base;
pub mod contexts;
pub mod general;
pub mod refine;
pub mod service;

pub use accumulate::{AccumulateContext, AccumulateOutput, DeferredTransfer, Implications, Privileges};
pub use base::{HostCallContext, HostEnvironment, HostFunction, HostRegistry, LogEntry, ServiceEnvironment};
pub use contexts::{
    GenericContext, InvocationContext, InvocationOutput, IsAuthorizedContext, OnTransferContext,
};
pub use general::FetchData;
pub use refine::{GuestMachine, RefineContext, RefineOutput};
pub use service::ServiceAccount;
