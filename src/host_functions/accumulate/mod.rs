//! Accumulate invocation (Gray Paper Ψ_A).
//!
//! Host calls mutate the regular [`Implications`]. CHECKPOINT snapshots them into the
//! exceptional slot, which becomes the result if the invocation later panics or runs out of gas.

mod assign;
mod base;
mod bless;
mod checkpoint;
mod designate;
mod eject;
mod forget;
mod new;
mod provide;
mod query;
mod solicit;
mod transfer;
mod upgrade;
mod yield_;

pub use assign::AssignHostFunction;
pub use base::{ejection_hash, DeferredTransfer, Implications, Privileges};
pub use bless::BlessHostFunction;
pub use checkpoint::CheckpointHostFunction;
pub use designate::DesignateHostFunction;
pub use eject::EjectHostFunction;
pub use forget::ForgetHostFunction;
pub use new::NewHostFunction;
pub use provide::ProvideHostFunction;
pub use query::{encode_history, QueryHostFunction};
pub use solicit::SolicitHostFunction;
pub use transfer::TransferHostFunction;
pub use upgrade::UpgradeHostFunction;
pub use yield_::YieldHostFunction;

use crate::config::VmConfig;
use crate::host_functions::base::{HostCallContext, HostEnvironment, HostRegistry, LogEntry, ServiceEnvironment};
use crate::host_functions::general::{
    FetchData, FetchHostFunction, GasHostFunction, InfoHostFunction, LogHostFunction,
    LookupHostFunction, ReadHostFunction, WriteHostFunction,
};
use crate::host_functions::service::ServiceAccount;
use crate::invocation::Invocation;
use crate::types::{ExecOutcome, VmState};
use std::sync::{Arc, OnceLock};

pub struct AccumulateContext {
    config: Arc<VmConfig>,
    pub timeslot: u32,
    pub fetch: FetchData,
    pub regular: Implications,
    pub exceptional: Implications,
    pub logs: Vec<LogEntry>,
}

impl AccumulateContext {
    /// Context whose exceptional state starts as a copy of `implications`.
    #[must_use]
    pub fn new(config: Arc<VmConfig>, timeslot: u32, implications: Implications) -> Self {
        Self {
            config,
            timeslot,
            fetch: FetchData::default(),
            exceptional: implications.clone(),
            regular: implications,
            logs: Vec::new(),
        }
    }
}

/// Post-accumulation state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccumulateOutput {
    pub implications: Implications,
    pub logs: Vec<LogEntry>,
}

fn registry() -> &'static HostRegistry<AccumulateContext> {
    static REGISTRY: OnceLock<HostRegistry<AccumulateContext>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = HostRegistry::<AccumulateContext>::new();
        registry.register(Box::new(GasHostFunction));
        registry.register(Box::new(FetchHostFunction));
        registry.register(Box::new(LookupHostFunction));
        registry.register(Box::new(ReadHostFunction));
        registry.register(Box::new(WriteHostFunction));
        registry.register(Box::new(InfoHostFunction));
        registry.register(Box::new(BlessHostFunction));
        registry.register(Box::new(AssignHostFunction));
        registry.register(Box::new(DesignateHostFunction));
        registry.register(Box::new(CheckpointHostFunction));
        registry.register(Box::new(NewHostFunction));
        registry.register(Box::new(UpgradeHostFunction));
        registry.register(Box::new(TransferHostFunction));
        registry.register(Box::new(EjectHostFunction));
        registry.register(Box::new(QueryHostFunction));
        registry.register(Box::new(SolicitHostFunction));
        registry.register(Box::new(ForgetHostFunction));
        registry.register(Box::new(YieldHostFunction));
        registry.register(Box::new(ProvideHostFunction));
        registry.register(Box::new(LogHostFunction));
        registry
    })
}

impl HostEnvironment for AccumulateContext {
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

impl ServiceEnvironment for AccumulateContext {
    fn service_id(&self) -> u32 {
        self.regular.service_id
    }
    fn account(&self, id: u32) -> Option<&ServiceAccount> {
        self.regular.accounts.get(&id)
    }
    fn current_account_mut(&mut self) -> Option<&mut ServiceAccount> {
        self.regular.current_mut()
    }
}

impl HostCallContext for AccumulateContext {
    type Output = AccumulateOutput;

    fn dispatch(&mut self, config: &Arc<VmConfig>, index: u32, state: &mut VmState) -> ExecOutcome {
        registry().dispatch(&config.gas, index, state, self)
    }

    fn finish(self, invocation: &Invocation) -> AccumulateOutput {
        let mut implications = match invocation.outcome() {
            ExecOutcome::Panic(_) | ExecOutcome::OutOfGas => self.exceptional,
            _ => self.regular,
        };
        // A 32-byte halt output is the accumulation result hash.
        if let Some(output) = invocation.output() {
            if let Ok(hash) = <[u8; 32]>::try_from(output.as_slice()) {
                implications.yield_hash = Some(hash);
            }
        }
        AccumulateOutput {
            implications,
            logs: self.logs,
        }
    }
}
