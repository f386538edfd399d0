//! The remaining invocation kinds and the closed [`InvocationContext`] enum over all five.
//!
//! Each context carries its own static registry, so dispatch never consults a call the
//! invocation kind does not allow; those indices fall through to `WHAT`.

use crate::config::VmConfig;
use crate::host_functions::accumulate::{AccumulateContext, AccumulateOutput};
use crate::host_functions::base::{HostCallContext, HostEnvironment, HostRegistry, LogEntry, ServiceEnvironment};
use crate::host_functions::general::{
    FetchData, FetchHostFunction, GasHostFunction, InfoHostFunction, LogHostFunction,
    LookupHostFunction, ReadHostFunction, WriteHostFunction,
};
use crate::host_functions::refine::{RefineContext, RefineOutput};
use crate::host_functions::service::ServiceAccount;
use crate::invocation::{Invocation, InvocationFailure};
use crate::types::{ExecOutcome, VmState};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

// ============================================================================
// Generic
// ============================================================================

/// Bare invocation: GAS and LOG only. Output is the collected log.
pub struct GenericContext {
    config: Arc<VmConfig>,
    fetch: FetchData,
    pub logs: Vec<LogEntry>,
}

impl GenericContext {
    #[must_use]
    pub fn new(config: Arc<VmConfig>) -> Self {
        Self {
            config,
            fetch: FetchData::default(),
            logs: Vec::new(),
        }
    }
}

fn generic_registry() -> &'static HostRegistry<GenericContext> {
    static REGISTRY: OnceLock<HostRegistry<GenericContext>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = HostRegistry::<GenericContext>::new();
        registry.register(Box::new(GasHostFunction));
        registry.register(Box::new(LogHostFunction));
        registry
    })
}

impl HostEnvironment for GenericContext {
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

impl HostCallContext for GenericContext {
    type Output = Vec<LogEntry>;

    fn dispatch(&mut self, config: &Arc<VmConfig>, index: u32, state: &mut VmState) -> ExecOutcome {
        generic_registry().dispatch(&config.gas, index, state, self)
    }

    fn finish(self, _invocation: &Invocation) -> Vec<LogEntry> {
        self.logs
    }
}

// ============================================================================
// Is-authorized (Ψ_I)
// ============================================================================

pub struct IsAuthorizedContext {
    config: Arc<VmConfig>,
    /// Work package, authorizer configuration and token.
    pub fetch: FetchData,
    pub logs: Vec<LogEntry>,
}

impl IsAuthorizedContext {
    #[must_use]
    pub fn new(config: Arc<VmConfig>, fetch: FetchData) -> Self {
        Self {
            config,
            fetch,
            logs: Vec::new(),
        }
    }
}

fn is_authorized_registry() -> &'static HostRegistry<IsAuthorizedContext> {
    static REGISTRY: OnceLock<HostRegistry<IsAuthorizedContext>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = HostRegistry::<IsAuthorizedContext>::new();
        registry.register(Box::new(GasHostFunction));
        registry.register(Box::new(FetchHostFunction));
        registry.register(Box::new(LogHostFunction));
        registry
    })
}

impl HostEnvironment for IsAuthorizedContext {
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

impl HostCallContext for IsAuthorizedContext {
    /// The authorizer trace on halt.
    type Output = Result<Vec<u8>, InvocationFailure>;

    fn dispatch(&mut self, config: &Arc<VmConfig>, index: u32, state: &mut VmState) -> ExecOutcome {
        is_authorized_registry().dispatch(&config.gas, index, state, self)
    }

    fn finish(self, invocation: &Invocation) -> Self::Output {
        invocation.result()
    }
}

// ============================================================================
// On-transfer (Ψ_T)
// ============================================================================

pub struct OnTransferContext {
    config: Arc<VmConfig>,
    pub service_id: u32,
    pub timeslot: u32,
    /// Receiving service plus every account LOOKUP, READ and INFO may consult.
    pub accounts: BTreeMap<u32, ServiceAccount>,
    /// Timeslot, service id and the encoded transfers.
    pub fetch: FetchData,
    pub logs: Vec<LogEntry>,
}

impl OnTransferContext {
    #[must_use]
    pub fn new(config: Arc<VmConfig>, service_id: u32, timeslot: u32, accounts: BTreeMap<u32, ServiceAccount>) -> Self {
        Self {
            config,
            service_id,
            timeslot,
            accounts,
            fetch: FetchData::default(),
            logs: Vec::new(),
        }
    }
}

fn on_transfer_registry() -> &'static HostRegistry<OnTransferContext> {
    static REGISTRY: OnceLock<HostRegistry<OnTransferContext>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = HostRegistry::<OnTransferContext>::new();
        registry.register(Box::new(GasHostFunction));
        registry.register(Box::new(FetchHostFunction));
        registry.register(Box::new(LookupHostFunction));
        registry.register(Box::new(ReadHostFunction));
        registry.register(Box::new(WriteHostFunction));
        registry.register(Box::new(InfoHostFunction));
        registry.register(Box::new(LogHostFunction));
        registry
    })
}

impl HostEnvironment for OnTransferContext {
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

impl ServiceEnvironment for OnTransferContext {
    fn service_id(&self) -> u32 {
        self.service_id
    }
    fn account(&self, id: u32) -> Option<&ServiceAccount> {
        self.accounts.get(&id)
    }
    fn current_account_mut(&mut self) -> Option<&mut ServiceAccount> {
        self.accounts.get_mut(&self.service_id)
    }
}

impl HostCallContext for OnTransferContext {
    /// The receiving account after the handler ran.
    type Output = Option<ServiceAccount>;

    fn dispatch(&mut self, config: &Arc<VmConfig>, index: u32, state: &mut VmState) -> ExecOutcome {
        on_transfer_registry().dispatch(&config.gas, index, state, self)
    }

    fn finish(mut self, _invocation: &Invocation) -> Option<ServiceAccount> {
        self.accounts.remove(&self.service_id)
    }
}

// ============================================================================
// Closed set
// ============================================================================

/// Any of the five invocation kinds, for callers that pick one at runtime.
pub enum InvocationContext {
    Generic(GenericContext),
    IsAuthorized(IsAuthorizedContext),
    Refine(RefineContext),
    Accumulate(AccumulateContext),
    OnTransfer(OnTransferContext),
}

/// Output of an [`InvocationContext`], tagged like the context that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationOutput {
    Generic(Vec<LogEntry>),
    IsAuthorized(Result<Vec<u8>, InvocationFailure>),
    Refine(RefineOutput),
    Accumulate(AccumulateOutput),
    OnTransfer(Option<ServiceAccount>),
}

impl HostCallContext for InvocationContext {
    type Output = InvocationOutput;

    fn dispatch(&mut self, config: &Arc<VmConfig>, index: u32, state: &mut VmState) -> ExecOutcome {
        match self {
            Self::Generic(ctx) => ctx.dispatch(config, index, state),
            Self::IsAuthorized(ctx) => ctx.dispatch(config, index, state),
            Self::Refine(ctx) => ctx.dispatch(config, index, state),
            Self::Accumulate(ctx) => ctx.dispatch(config, index, state),
            Self::OnTransfer(ctx) => ctx.dispatch(config, index, state),
        }
    }

    fn finish(self, invocation: &Invocation) -> InvocationOutput {
        match self {
            Self::Generic(ctx) => InvocationOutput::Generic(ctx.finish(invocation)),
            Self::IsAuthorized(ctx) => InvocationOutput::IsAuthorized(ctx.finish(invocation)),
            Self::Refine(ctx) => InvocationOutput::Refine(ctx.finish(invocation)),
            Self::Accumulate(ctx) => InvocationOutput::Accumulate(ctx.finish(invocation)),
            Self::OnTransfer(ctx) => InvocationOutput::OnTransfer(ctx.finish(invocation)),
        }
    }
}
