//! LOG host function (JIP-1). Function ID 100.
//! r7 = level, r8/r9 = target offset/length (ignored when zero), r10/r11 = message offset/length.
//! Never fails: an unreadable message is dropped and execution continues.

use crate::config::FUNC_LOG;
use crate::host_functions::base::{HostCallResult, HostEnvironment, HostFunction, LogEntry};
use crate::memory::Memory;
use crate::types::VmState;

pub struct LogHostFunction;

fn read_text(memory: &Memory, address: u64, len: u64) -> Option<String> {
    let address = u32::try_from(address).ok()?;
    let len = usize::try_from(len).ok()?;
    let bytes = memory.read(address, len).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Forward an entry to `tracing` under target `pvm::log`.
pub fn emit(entry: &LogEntry) {
    let target = entry.target.as_deref().unwrap_or("");
    let message = entry.message.as_str();
    match entry.level {
        0 => tracing::error!(target: "pvm::log", service_target = target, "{message}"),
        1 => tracing::warn!(target: "pvm::log", service_target = target, "{message}"),
        2 => tracing::info!(target: "pvm::log", service_target = target, "{message}"),
        3 => tracing::debug!(target: "pvm::log", service_target = target, "{message}"),
        _ => tracing::trace!(target: "pvm::log", service_target = target, "{message}"),
    }
}

impl<C: HostEnvironment> HostFunction<C> for LogHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_LOG
    }
    fn name(&self) -> &'static str {
        "log"
    }
    fn execute(&self, state: &mut VmState, context: &mut C) -> HostCallResult {
        let regs = state.registers;
        let target = if regs[8] != 0 && regs[9] != 0 {
            read_text(&state.memory, regs[8], regs[9])
        } else {
            None
        };
        let Some(message) = read_text(&state.memory, regs[10], regs[11]) else {
            return Ok(());
        };
        let entry = LogEntry {
            level: regs[7],
            target,
            message,
        };
        emit(&entry);
        context.record_log(entry);
        Ok(())
    }
}
