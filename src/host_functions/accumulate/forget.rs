//! FORGET accumulation host function (Ω_F). Gray Paper: function ID 24.
//! r7 = hash offset, r8 = preimage length.
//! [] and expired [x, y] drop the request and preimage; [x] becomes [x, t];
//! expired [x, y, w] becomes [w, t]. Anything else is HUH.

use super::base::request_len;
use super::AccumulateContext;
use crate::config::{FUNC_FORGET, REG_HUH, REG_OK};
use crate::error::HostCallError;
use crate::host_functions::base::{read_guest_hash, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

pub struct ForgetHostFunction;

impl HostFunction<AccumulateContext> for ForgetHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_FORGET
    }
    fn name(&self) -> &'static str {
        "forget"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let hash = read_guest_hash(&state.memory, state.registers[7], "forget hash not readable")?;
        let t = context.timeslot;
        let expunge_period = u64::from(context.config.protocol.expunge_period);
        let expired = |y: u32| u64::from(y) + expunge_period < u64::from(t);

        let account = context
            .regular
            .current_mut()
            .ok_or(HostCallError::Panic("forget without a current service account"))?;
        let Some(key) = request_len(state.registers[8]).map(|len| (hash, len)) else {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        };

        let history = account.requests.get(&key).cloned();
        match history.as_deref() {
            Some([]) => {
                account.requests.remove(&key);
                account.preimages.remove(&hash);
            }
            Some(&[_, y]) if expired(y) => {
                account.requests.remove(&key);
                account.preimages.remove(&hash);
            }
            Some(&[x]) => {
                account.requests.insert(key, vec![x, t]);
            }
            Some(&[_, y, w]) if expired(y) => {
                account.requests.insert(key, vec![w, t]);
            }
            _ => {
                state.registers[RESULT_REGISTER] = REG_HUH;
                return Ok(());
            }
        }
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
