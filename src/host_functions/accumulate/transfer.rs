//! TRANSFER accumulation host function (Ω_T). Gray Paper: function ID 20.
//! r7 = destination, r8 = amount, r9 = gas limit, r10 = memo offset (W_T bytes).
//! Costs the base host-call gas plus the gas limit handed to the destination.

use super::base::DeferredTransfer;
use super::AccumulateContext;
use crate::config::{GasCostTable, FUNC_TRANSFER, REG_CASH, REG_LOW, REG_OK, REG_WHO};
use crate::error::HostCallError;
use crate::host_functions::base::{read_guest, HostCallResult, HostFunction};
use crate::types::{Registers, VmState, RESULT_REGISTER};

pub struct TransferHostFunction;

impl HostFunction<AccumulateContext> for TransferHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_TRANSFER
    }
    fn name(&self) -> &'static str {
        "transfer"
    }
    fn gas_cost(&self, table: &GasCostTable, registers: &Registers) -> u64 {
        table.host_call_cost(FUNC_TRANSFER).saturating_add(registers[9])
    }
    fn execute(&self, state: &mut VmState, context: &mut AccumulateContext) -> HostCallResult {
        let [destination, amount, gas_limit, memo_at] = [7, 8, 9, 10].map(|r| state.registers[r]);
        let constants = &context.config.protocol;
        let memo = read_guest(&state.memory, memo_at, u64::from(constants.memo_size), "transfer memo not readable")?;

        let implications = &mut context.regular;
        let target = u32::try_from(destination)
            .ok()
            .and_then(|id| implications.accounts.get(&id).map(|account| (id, account.min_memo_gas)));
        let Some((destination, min_memo_gas)) = target else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };
        if gas_limit < min_memo_gas {
            state.registers[RESULT_REGISTER] = REG_LOW;
            return Ok(());
        }

        let source = implications.service_id;
        let account = implications
            .current_mut()
            .ok_or(HostCallError::Panic("transfer without a current service account"))?;
        let threshold = account.threshold(constants);
        let Some(remaining) = account.balance.checked_sub(amount).filter(|&b| b >= threshold) else {
            state.registers[RESULT_REGISTER] = REG_CASH;
            return Ok(());
        };
        account.balance = remaining;
        implications.transfers.push(DeferredTransfer {
            source,
            destination,
            amount,
            memo,
            gas_limit,
        });
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
