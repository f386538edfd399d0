//! FETCH host function (Ω_Y). Gray Paper: function ID 1.
//! r7 = output offset, r8 = from, r9 = length, r10 = selector, r11/r12 = indices.
//! Writes the selected slice and sets r7 = full length, or r7 = NONE when nothing is available.

use crate::codec::encode_natural;
use crate::config::{FUNC_FETCH, REG_NONE};
use crate::host_functions::base::{clamp_slice, write_guest, HostCallResult, HostEnvironment, HostFunction};
use crate::types::{Registers, VmState, RESULT_REGISTER};

/// Data an invocation exposes through FETCH. Absent fields answer NONE.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchData {
    /// Selector 1: entropy (accumulate) or n0 (refine).
    pub entropy: Option<Vec<u8>>,
    /// Selector 2: authorizer trace.
    pub authorizer_trace: Option<Vec<u8>>,
    /// Selectors 3 and 4: export segments per work item.
    pub exports: Option<Vec<Vec<Vec<u8>>>>,
    /// Selectors 5 and 6: import segments per work item.
    pub imports: Option<Vec<Vec<Vec<u8>>>>,
    /// Work item being refined; selectors 4 and 6 read from it.
    pub work_item_index: Option<usize>,
    /// Selector 7: encoded work package.
    pub work_package: Option<Vec<u8>>,
    /// Selector 8: authorizer configuration.
    pub auth_config: Option<Vec<u8>>,
    /// Selector 9: authorization token.
    pub auth_token: Option<Vec<u8>>,
    /// Selector 10: encoded refinement context.
    pub refine_context: Option<Vec<u8>>,
    /// Selectors 11 and 12: encoded work item summaries.
    pub work_item_summaries: Option<Vec<Vec<u8>>>,
    /// Selector 13: work item payloads.
    pub work_item_payloads: Option<Vec<Vec<u8>>>,
    /// Selectors 14 and 15: encoded accumulation inputs.
    pub accumulate_inputs: Option<Vec<Vec<u8>>>,
}

fn nth<T: Clone>(items: &[T], index: u64) -> Option<T> {
    usize::try_from(index).ok().and_then(|i| items.get(i)).cloned()
}

fn segment(segments: &[Vec<Vec<u8>>], item: Option<usize>, index: u64) -> Option<Vec<u8>> {
    nth(segments.get(item?)?, index)
}

/// Natural-length prefix followed by every item.
fn sequence(items: &[Vec<u8>]) -> Vec<u8> {
    let mut out = encode_natural(items.len() as u64);
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

impl FetchData {
    /// Resolve `selector` against this data. Selector 0 is answered by the caller from config.
    #[must_use]
    pub fn select(&self, selector: u64, registers: &Registers) -> Option<Vec<u8>> {
        let (i, j) = (registers[11], registers[12]);
        match selector {
            1 => self.entropy.clone(),
            2 => self.authorizer_trace.clone(),
            3 => segment(self.exports.as_deref()?, usize::try_from(i).ok(), j),
            4 => segment(self.exports.as_deref()?, self.work_item_index, i),
            5 => segment(self.imports.as_deref()?, usize::try_from(i).ok(), j),
            6 => segment(self.imports.as_deref()?, self.work_item_index, i),
            7 => self.work_package.clone(),
            8 => self.auth_config.clone(),
            9 => self.auth_token.clone(),
            10 => self.refine_context.clone(),
            11 => self.work_item_summaries.as_deref().map(sequence),
            12 => nth(self.work_item_summaries.as_deref()?, i),
            13 => nth(self.work_item_payloads.as_deref()?, i),
            14 => self.accumulate_inputs.as_deref().map(sequence),
            15 => nth(self.accumulate_inputs.as_deref()?, i),
            _ => None,
        }
    }
}

pub struct FetchHostFunction;

impl<C: HostEnvironment> HostFunction<C> for FetchHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_FETCH
    }
    fn name(&self) -> &'static str {
        "fetch"
    }
    fn execute(&self, state: &mut VmState, context: &mut C) -> HostCallResult {
        let selector = state.registers[10];
        let data = if selector == 0 {
            Some(context.config().protocol.encode())
        } else {
            context.fetch_data().select(selector, &state.registers)
        };
        let Some(data) = data else {
            state.registers[RESULT_REGISTER] = REG_NONE;
            return Ok(());
        };
        let slice = clamp_slice(&data, state.registers[8], state.registers[9]);
        write_guest(&mut state.memory, state.registers[7], slice, "fetch output not writable")?;
        state.registers[RESULT_REGISTER] = data.len() as u64;
        Ok(())
    }
}
