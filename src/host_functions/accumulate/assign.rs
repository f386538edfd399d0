//! ASSIGN accumulation host function (Ω_A). Gray Paper: function ID 15.
//! r7 = core, r8 = authorizer queue offset (Q hashes), r9 = new assigner for the core.

use super::AccumulateContext;
use crate::config::{FUNC_ASSIGN, REG_CORE, REG_HUH, REG_OK, REG_WHO};
use crate::crypto::Hash;
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct AssignHostFunction;

impl HostFunction<AccumulateContext> for AssignHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_ASSIGN
    }
    fn name(&self) -> &'static str {
        "assign"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let [core, queue_at, assigner] = [7, 8, 9].map(|r| state.registers[r]);
        let protocol = &context.config.protocol;
        let queue_len = u64::from(protocol.auth_queue_size) * 32;
        let queue = read_guest(&state.memory, queue_at, queue_len, "assign queue not readable")?;

        if core >= u64::from(protocol.core_count) {
            state.registers[RESULT_REGISTER] = REG_CORE;
            return Ok(());
        }
        // core < core_count <= u16::MAX
        let core = core as usize;
        let implications = &mut context.regular;
        if implications.privileges.assigners.get(core) != Some(&implications.service_id) {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        }
        let Ok(assigner) = u32::try_from(assigner) else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };

        let queue: Vec<Hash> = queue
            .chunks_exact(32)
            .map(|chunk| {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(chunk);
                hash
            })
            .collect();
        if implications.auth_queues.len() <= core {
            implications.auth_queues.resize(core + 1, Vec::new());
        }
        implications.auth_queues[core] = queue;
        implications.privileges.assigners[core] = assigner;
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
