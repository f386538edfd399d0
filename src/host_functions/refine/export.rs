//! EXPORT host function (Ω_E). Gray Paper: function ID 7.
//! r7 = segment offset, r8 = length (capped at the segment size, zero-padded).
//! Sets r7 = index of the new segment, or FULL once the export limit is reached.

use super::RefineContext;
use crate::config::{FUNC_EXPORT, REG_FULL};
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct ExportHostFunction;

impl HostFunction<RefineContext> for ExportHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_EXPORT
    }
    fn name(&self) -> &'static str {
        "export"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        let protocol = &context.config.protocol;
        let segment_size = u64::from(protocol.segment_size());
        let len = state.registers[8].min(segment_size);
        let mut segment = read_guest(&state.memory, state.registers[7], len, "export data not readable")?;

        let index = context.export_offset + context.exports.len() as u64;
        if index >= u64::from(protocol.max_exports) {
            state.registers[RESULT_REGISTER] = REG_FULL;
            return Ok(());
        }
        segment.resize(segment_size as usize, 0);
        context.exports.push(segment);
        state.registers[RESULT_REGISTER] = index;
        Ok(())
    }
}
