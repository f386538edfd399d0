//! BLESS accumulation host function (Ω_B). Gray Paper: function ID 14.
//! r7 = manager, r8 = assigners offset (E4 per core), r9 = delegator, r10 = registrar,
//! r11 = always-accumulate offset, r12 = always-accumulate count (E4 service ++ E8 gas each).

use super::base::Privileges;
use super::AccumulateContext;
use crate::codec::read_le;
use crate::config::{FUNC_BLESS, REG_HUH, REG_OK, REG_WHO};
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::types::{VmState, RESULT_REGISTER};

const ASSIGNER_SIZE: u64 = 4;
const ALWAYS_ACCUMULATE_SIZE: u64 = 12;

pub struct BlessHostFunction;

impl HostFunction<AccumulateContext> for BlessHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_BLESS
    }
    fn name(&self) -> &'static str {
        "bless"
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let [manager, assigners_at, delegator, registrar, always_at, always_count] =
            [7, 8, 9, 10, 11, 12].map(|r| state.registers[r]);

        let cores = u64::from(context.config.protocol.core_count);
        let assigners = read_guest(&state.memory, assigners_at, cores * ASSIGNER_SIZE, "bless assigners not readable")?;
        let always_len = always_count.saturating_mul(ALWAYS_ACCUMULATE_SIZE);
        let always = read_guest(&state.memory, always_at, always_len, "bless always-accumulate not readable")?;

        let privileges = &mut context.regular.privileges;
        if context.regular.service_id != privileges.manager {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        }
        let (Ok(manager), Ok(delegator), Ok(registrar)) =
            (u32::try_from(manager), u32::try_from(delegator), u32::try_from(registrar))
        else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };

        *privileges = Privileges {
            manager,
            assigners: assigners.chunks_exact(4).map(|c| read_le(c) as u32).collect(),
            delegator,
            registrar,
            always_accumulate: always
                .chunks_exact(12)
                .map(|c| (read_le(&c[..4]) as u32, read_le(&c[4..])))
                .collect(),
        };
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
