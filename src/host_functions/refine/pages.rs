//! PAGES host function (Ω_Z). Gray Paper: function ID 11.
//! r7 = machine, r8 = first page, r9 = page count, r10 = mode:
//! 0 unmap, 1/2 map read-only/read-write zeroed, 3/4 set read-only/read-write keeping data.

use super::RefineContext;
use crate::config::{FUNC_PAGES, PAGE_COUNT, PAGE_SIZE, REG_HUH, REG_OK, REG_WHO, ZONE_SIZE};
use crate::error::HostCallError;
use crate::host_functions::base::{HostCallResult, HostFunction};
use crate::memory::{Memory, PageAccess};
use crate::types::{VmState, RESULT_REGISTER};

/// Pages below the first zone are never handed to inner machines.
const FIRST_PAGE: u64 = (ZONE_SIZE / PAGE_SIZE) as u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Unmap,
    Map(PageAccess),
    Protect(PageAccess),
}

impl Mode {
    const fn from_register(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Unmap),
            1 => Some(Self::Map(PageAccess::ReadOnly)),
            2 => Some(Self::Map(PageAccess::ReadWrite)),
            3 => Some(Self::Protect(PageAccess::ReadOnly)),
            4 => Some(Self::Protect(PageAccess::ReadWrite)),
            _ => None,
        }
    }
}

fn apply(memory: &mut Memory, address: u32, mode: Mode) -> HostCallResult {
    match mode {
        Mode::Unmap => memory.unmap_page(address),
        Mode::Map(access) => {
            memory
                .map_page(address, access)
                .map_err(|_| HostCallError::Panic("pages mapping exceeds memory limit"))?;
            memory.zero_page(address);
        }
        Mode::Protect(access) => memory
            .protect(address, access)
            .map_err(|_| HostCallError::Panic("pages protect on unmapped page"))?,
    }
    Ok(())
}

pub struct PagesHostFunction;

impl HostFunction<RefineContext> for PagesHostFunction {
    fn function_id(&self) -> u32 {
        FUNC_PAGES
    }
    fn name(&self) -> &'static str {
        "pages"
    }
    fn execute(&self, state: &mut VmState, context: &mut RefineContext) -> HostCallResult {
        let [n, first, count, mode] = [7, 8, 9, 10].map(|r| state.registers[r]);
        let Some(machine) = context.machines.get_mut(&n) else {
            state.registers[RESULT_REGISTER] = REG_WHO;
            return Ok(());
        };
        let end = first.checked_add(count).unwrap_or(u64::MAX);
        let mode = Mode::from_register(mode)
            .filter(|_| first >= FIRST_PAGE && end < u64::from(PAGE_COUNT))
            .filter(|_| end * u64::from(PAGE_SIZE) <= machine.memory.limit());
        let Some(mode) = mode else {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        };
        // end < 2^20, so every page address fits in u32.
        let addresses = (first..end).map(|page| (page as u32) * PAGE_SIZE);
        if matches!(mode, Mode::Protect(_))
            && addresses.clone().any(|address| machine.memory.access(address) == PageAccess::None)
        {
            state.registers[RESULT_REGISTER] = REG_HUH;
            return Ok(());
        }
        for address in addresses {
            apply(&mut machine.memory, address, mode)?;
        }
        state.registers[RESULT_REGISTER] = REG_OK;
        Ok(())
    }
}
