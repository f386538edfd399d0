//! QUERY accumulation host function (Ω_Q). Gray Paper: function ID 22.
//! r7 = hash offset, r8 = preimage length. Encodes the request history into r7/r8:
//! [] -> (0, 0), [x] -> (1 + 2^32 x, 0), [x, y] -> (2 + 2^32 x, y),
//! [x, y, z] -> (3 + 2^32 x, y + 2^32 z); no request -> (NONE, 0).

use super::base::request_len;
use super::AccumulateContext;
use crate::config::{FUNC_QUERY, REG_NONE};
use crate::host_functions::base::{read_guest_hash, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

const SHIFT: u32 = 32;

/// (r7, r8) for a request history.
#[must_use]
pub fn encode_history(history: &[u32]) -> (u64, u64) {
    let slot = |i: usize| u64::from(history[i]);
    match history.len() {
        0 => (0, 0),
        1 => (1 + (slot(0) << SHIFT), 0),
        2 => (2 + (slot(0) << SHIFT), slot(1)),
        _ => (3 + (slot(0) << SHIFT), slot(1) + (slot(2) << SHIFT)),
    }
}

pub struct QueryHostFunction;

impl HostFunction<AccumulateContext> for QueryHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_QUERY
    }
    fn name(&self) -> &'static str {
        "query"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let hash = read_guest_hash(&state.memory, state.registers[7], "query hash not readable")?;
        let history = request_len(state.registers[8])
            .zip(context.regular.current())
            .and_then(|(len, account)| account.requests.get(&(hash, len)));
        let (r7, r8) = history.map_or((REG_NONE, 0), |history| encode_history(history));
        state.registers[RESULT_REGISTER] = r7;
        state.registers[8] = r8;
        Ok(())
    }
}
