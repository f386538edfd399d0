//! Paged guest memory (Gray Paper equation 770-802).
//!
//! A sparse map of 4 KiB pages, each tagged with a [`PageAccess`]. Page contents are allocated
//! lazily: a mapped page that was never written reads as zeros. Every access is checked page by
//! page before any byte is touched, so a faulting write leaves memory unchanged.
//!
//! Growth happens only through [`Memory::map_page`], [`Memory::map_range`] and [`Memory::sbrk`],
//! all bounded by the limit fixed at construction.

use crate::config::{ADDRESS_SPACE_SIZE, PAGE_COUNT, PAGE_SIZE, ZONE_SIZE};
use crate::error::{MemoryError, MemoryFault};
use std::collections::BTreeMap;

/// Page permission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PageAccess {
    #[default]
    None,
    ReadOnly,
    ReadWrite,
}

impl PageAccess {
    #[must_use]
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Page {
    access: PageAccess,
    data: Option<Box<[u8]>>,
}

impl Page {
    const fn new(access: PageAccess) -> Self {
        Self { access, data: None }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data
            .get_or_insert_with(|| vec![0u8; PAGE_SIZE as usize].into_boxed_slice())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Guest address space of one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    pages: BTreeMap<u32, Page>,
    /// Exclusive upper bound of mappable addresses.
    limit: u64,
    heap_start: u32,
    heap_end: u32,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(ADDRESS_SPACE_SIZE)
    }
}

#[inline]
const fn page_index(address: u32) -> u32 {
    address / PAGE_SIZE
}

#[inline]
const fn page_offset(address: u32) -> usize {
    (address % PAGE_SIZE) as usize
}

impl Memory {
    /// Empty address space that may grow up to `max_bytes` (capped at 2^32).
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self {
            pages: BTreeMap::new(),
            limit: max_bytes.min(ADDRESS_SPACE_SIZE),
            heap_start: ZONE_SIZE,
            heap_end: ZONE_SIZE,
        }
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Access of the page containing `address`.
    #[must_use]
    pub fn access(&self, address: u32) -> PageAccess {
        self.pages
            .get(&page_index(address))
            .map_or(PageAccess::None, |p| p.access)
    }

    pub fn mapped_pages(&self) -> impl Iterator<Item = (u32, PageAccess)> + '_ {
        self.pages.iter().map(|(&index, page)| (index, page.access))
    }

    fn check_limit(&self, end: u64) -> Result<(), MemoryError> {
        if end > self.limit {
            return Err(MemoryError::LimitExceeded {
                requested: end,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Map the page containing `address`. Remapping an existing page only changes its permission.
    pub fn map_page(&mut self, address: u32, access: PageAccess) -> Result<(), MemoryError> {
        let index = page_index(address);
        self.check_limit((u64::from(index) + 1) * u64::from(PAGE_SIZE))?;
        self.pages
            .entry(index)
            .and_modify(|p| p.access = access)
            .or_insert_with(|| Page::new(access));
        Ok(())
    }

    /// Map every page overlapping `[start, start + len)`.
    pub fn map_range(&mut self, start: u32, len: u32, access: PageAccess) -> Result<(), MemoryError> {
        if len == 0 {
            return Ok(());
        }
        let end = u64::from(start) + u64::from(len);
        self.check_limit(end.div_ceil(u64::from(PAGE_SIZE)) * u64::from(PAGE_SIZE))?;
        let last = ((end - 1) / u64::from(PAGE_SIZE)) as u32;
        for index in page_index(start)..=last {
            self.pages
                .entry(index)
                .and_modify(|p| p.access = access)
                .or_insert_with(|| Page::new(access));
        }
        Ok(())
    }

    /// Change the permission of an already mapped page.
    pub fn protect(&mut self, address: u32, access: PageAccess) -> Result<(), MemoryError> {
        match self.pages.get_mut(&page_index(address)) {
            Some(page) => {
                page.access = access;
                Ok(())
            }
            None => Err(MemoryFault::out_of_bounds(address).into()),
        }
    }

    /// Remove the page containing `address`, discarding its contents.
    pub fn unmap_page(&mut self, address: u32) {
        self.pages.remove(&page_index(address));
    }

    fn check(&self, address: u32, len: usize, access: Access) -> Result<(), MemoryFault> {
        if len == 0 {
            return Ok(());
        }
        let end = u64::from(address) + len as u64;
        if end > ADDRESS_SPACE_SIZE {
            // Accesses never wrap around the address space.
            let first_unmapped = self.check(address, (ADDRESS_SPACE_SIZE - u64::from(address)) as usize, access);
            return first_unmapped.and(Err(MemoryFault::out_of_bounds(0)));
        }
        let last = ((end - 1) / u64::from(PAGE_SIZE)) as u32;
        for index in page_index(address)..=last {
            let fault_at = address.max(index * PAGE_SIZE);
            let Some(page) = self.pages.get(&index) else {
                return Err(MemoryFault::out_of_bounds(fault_at));
            };
            let allowed = match access {
                Access::Read => page.access.is_readable(),
                Access::Write => page.access.is_writable(),
            };
            if !allowed {
                return Err(MemoryFault::permission_denied(fault_at));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_readable(&self, address: u32, len: usize) -> bool {
        self.check(address, len, Access::Read).is_ok()
    }

    #[must_use]
    pub fn is_writable(&self, address: u32, len: usize) -> bool {
        self.check(address, len, Access::Write).is_ok()
    }

    /// Read `len` bytes starting at `address`.
    pub fn read(&self, address: u32, len: usize) -> Result<Vec<u8>, MemoryFault> {
        self.check(address, len, Access::Read)?;
        let mut out = vec![0u8; len];
        self.copy_out(address, &mut out);
        Ok(out)
    }

    /// Fill `buf` from memory starting at `address`.
    pub fn read_into(&self, address: u32, buf: &mut [u8]) -> Result<(), MemoryFault> {
        self.check(address, buf.len(), Access::Read)?;
        self.copy_out(address, buf);
        Ok(())
    }

    fn copy_out(&self, address: u32, buf: &mut [u8]) {
        let mut done = 0usize;
        let mut current = address;
        while done < buf.len() {
            let offset = page_offset(current);
            let chunk = (buf.len() - done).min(PAGE_SIZE as usize - offset);
            let target = &mut buf[done..done + chunk];
            match self.pages.get(&page_index(current)).and_then(|p| p.data.as_deref()) {
                Some(data) => target.copy_from_slice(&data[offset..offset + chunk]),
                None => target.fill(0),
            }
            done += chunk;
            current = current.wrapping_add(chunk as u32);
        }
    }

    /// Write `data` starting at `address`. Nothing is written if any byte faults.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), MemoryFault> {
        self.check(address, data.len(), Access::Write)?;
        self.copy_in(address, data);
        Ok(())
    }

    fn copy_in(&mut self, address: u32, data: &[u8]) {
        let mut done = 0usize;
        let mut current = address;
        while done < data.len() {
            let offset = page_offset(current);
            let chunk = (data.len() - done).min(PAGE_SIZE as usize - offset);
            if let Some(page) = self.pages.get_mut(&page_index(current)) {
                page.bytes_mut()[offset..offset + chunk].copy_from_slice(&data[done..done + chunk]);
            }
            done += chunk;
            current = current.wrapping_add(chunk as u32);
        }
    }

    /// Map `[address, address + len)` with `access` and fill its start with `data`, ignoring
    /// the final permission. Used to lay out an invocation before it starts.
    pub fn initialize(
        &mut self,
        address: u32,
        len: u32,
        data: &[u8],
        access: PageAccess,
    ) -> Result<(), MemoryError> {
        self.map_range(address, len.max(data.len() as u32), access)?;
        self.copy_in(address, data);
        Ok(())
    }

    /// Zero the contents of the page containing `address`, keeping its permission.
    pub fn zero_page(&mut self, address: u32) {
        if let Some(page) = self.pages.get_mut(&page_index(address)) {
            page.data = None;
        }
    }

    /// Set the heap break, e.g. after laying out a standard program.
    pub fn set_heap(&mut self, start: u32, end: u32) {
        self.heap_start = start;
        self.heap_end = end.max(start);
    }

    #[must_use]
    pub const fn heap_end(&self) -> u32 {
        self.heap_end
    }

    /// Grow the heap by `increment` bytes, mapping new pages read-write.
    /// Returns the previous break; `sbrk(0)` only reports it.
    pub fn sbrk(&mut self, increment: u64) -> Result<u32, MemoryError> {
        let previous = self.heap_end;
        if increment == 0 {
            return Ok(previous);
        }
        let new_end = u64::from(previous) + increment;
        if new_end > self.limit || new_end >= ADDRESS_SPACE_SIZE {
            return Err(MemoryError::LimitExceeded {
                requested: new_end,
                limit: self.limit,
            });
        }
        let last = new_end.div_ceil(u64::from(PAGE_SIZE)).min(u64::from(PAGE_COUNT)) as u32;
        for index in page_index(previous)..last {
            self.pages
                .entry(index)
                .or_insert_with(|| Page::new(PageAccess::ReadWrite));
        }
        self.heap_end = new_end as u32;
        Ok(previous)
    }

    /// Copy of a page's contents (zeros when unmapped or untouched).
    #[must_use]
    pub fn page_dump(&self, index: u32) -> Vec<u8> {
        self.pages
            .get(&index)
            .and_then(|p| p.data.as_deref())
            .map_or_else(|| vec![0u8; PAGE_SIZE as usize], <[u8]>::to_vec)
    }
}
