//! PROVIDE accumulation host function (Ω_♈). Gray Paper: function ID 26.
//! r7 = service (NONE = self), r8 = preimage offset, r9 = preimage length.
//! The service must have an open request for exactly this preimage.

use super::base::request_len;
use super::AccumulateContext;
use crate::config::{FUNC_PROVIDE, REG_HUH, REG_NONE, REG_OK, REG_WHO};
use crate::crypto::blake2b256;
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct ProvideHostFunction;

impl HostFunction<AccumulateContext> for ProvideHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_PROVIDE
    }
    fn name(&self) -> &'static str {
        "provide"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let [service, preimage_at, len] = [7, 8, 9].map(|r| state.registers[r]);
        let preimage = read_guest(&state.memory, preimage_at, len, "provide preimage not readable")?;

        let implications = &mut context.regular;
        let service = if service == REG_NONE {
            Some(implications.service_id)
        } else {
            u32::try_from(service).ok()
        };
        let Some((service, account)) = service.and_then(|id| implications.accounts.get(&id).map(|a| (id, a))) else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };

        let key = request_len(len).map(|len| (blake2b256(&preimage), len));
        let requested = key.and_then(|key| account.requests.get(&key)).is_some_and(Vec::is_empty);
        let entry = (service, preimage);
        if !requested || implications.provisions.contains(&entry) {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        }
        implications.provisions.insert(entry);
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
