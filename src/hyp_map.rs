//! Hyp Address Space Manager
//!
//! Builds the translation tables used by TTBR0_EL2 while the hypervisor
//! runs. Two kinds of mappings live side by side (see [`crate::layout`]):
//! identity mappings in the lower half, used while the EL2 MMU is switched
//! on or off, and host kernel addresses moved to the upper half by
//! [`ktohyp`].
//!
//! Tables use the 4KB granule with four levels; every mapping is made of
//! L3 page descriptors. Table pages come from a [`PageTableAlloc`] and all
//! of them are handed back by [`HypMap::cleanup`].

use core::ptr::{read_volatile, write_volatile};

use log::{debug, trace, warn};

use crate::arch::aarch64::defs::{PAGE_MASK_4KB, PAGE_OFFSET_MASK, PAGE_SIZE_4KB, PT_ENTRIES};
use crate::arch::aarch64::mm::{
    dsb_ishst, pt_index, tlbi_all, tlbi_va, HypAttributes, HypPte, HypTranslationConfig, PT_LEVELS,
};
use crate::error::{Error, Result};
use crate::layout::{ktohyp, HYP_VM_MAX_ADDRESS};
use crate::mm::{KernelPhysLookup, PageTableAlloc, Prot};

/// Page base of the last byte of `[addr, addr + len)`, `None` for an empty range.
fn last_page(addr: u64, len: u64) -> Result<Option<u64>> {
    match len {
        0 => Ok(None),
        _ => addr
            .checked_add(len - 1)
            .map(|last| Some(last & !PAGE_MASK_4KB))
            .ok_or(Error::AddressOutOfRange(addr)),
    }
}

/// Page-aligned pages covering `[addr, addr + len)`.
fn page_range(addr: u64, len: u64) -> Result<impl Iterator<Item = u64>> {
    let start = addr & !PAGE_MASK_4KB;
    let last = last_page(addr, len)?;
    Ok(last
        .into_iter()
        .flat_map(move |last| (start..=last).step_by(PAGE_SIZE_4KB as usize)))
}

/// Reject ranges that reach past the top of the EL2 address space.
fn check_hyp_range(addr: u64, len: u64) -> Result<()> {
    let last = match len {
        0 => addr,
        _ => addr
            .checked_add(len - 1)
            .ok_or(Error::AddressOutOfRange(addr))?,
    };
    if last > HYP_VM_MAX_ADDRESS {
        return Err(Error::AddressOutOfRange(last));
    }
    Ok(())
}

/// Translation tables of one hypervisor instance.
///
/// Mutating operations take `&mut self`, so there is never more than one
/// structural writer. The handle starts out empty; [`HypMap::init`]
/// allocates the root.
pub struct HypMap<A: PageTableAlloc> {
    alloc: A,
    /// Physical address of the L0 table
    root: Option<u64>,
    table_pages: usize,
}

impl<A: PageTableAlloc> HypMap<A> {
    /// Create an empty handle drawing table pages from `alloc`.
    pub fn new(alloc: A) -> Self {
        Self {
            alloc,
            root: None,
            table_pages: 0,
        }
    }

    /// Allocate the root table.
    pub fn init(&mut self) -> Result<()> {
        if let Some(root) = self.root {
            warn!("hypmap: root already live at {:#x}", root);
            return Ok(());
        }

        let root = self.alloc_table()?;
        self.root = Some(root);
        debug!("hypmap: root table at {:#x}", root);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.root.is_some()
    }

    /// Physical address of the L0 table, the TTBR0_EL2 base.
    pub fn root_phys(&self) -> Option<u64> {
        self.root
    }

    /// Translation register values for switching to this address space.
    pub fn translation_config(&self) -> Option<HypTranslationConfig> {
        self.root.map(HypTranslationConfig::new)
    }

    /// Number of table pages currently held, root included
    pub fn table_pages(&self) -> usize {
        self.table_pages
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Map host kernel addresses `[kva, kva + len)` at their [`ktohyp`]
    /// address, backed by the physical pages `lookup` reports for them.
    pub fn map<K>(&mut self, lookup: &K, kva: u64, len: u64, prot: Prot) -> Result<()>
    where
        K: KernelPhysLookup + ?Sized,
    {
        self.require_root()?;
        let attrs = HypAttributes::from_prot(prot);
        for page in page_range(kva, len)? {
            let pa = lookup.kva_to_phys(page).ok_or(Error::Unbacked(page))? & !PAGE_MASK_4KB;
            check_hyp_range(pa, PAGE_SIZE_4KB)?;
            self.install_page(ktohyp(page), pa, attrs)?;
        }
        dsb_ishst();
        debug!("hypmap: kva {:#x}+{:#x} -> hyp {:#x}", kva, len, ktohyp(kva));
        Ok(())
    }

    /// Map `[addr, addr + len)` onto itself.
    pub fn map_identity(&mut self, addr: u64, len: u64, prot: Prot) -> Result<()> {
        self.require_root()?;
        check_hyp_range(addr, len)?;
        let attrs = HypAttributes::from_prot(prot);
        for page in page_range(addr, len)? {
            self.install_page(page, page, attrs)?;
        }
        dsb_ishst();
        debug!("hypmap: identity {:#x}+{:#x}", addr, len);
        Ok(())
    }

    /// Identity map the physical pages backing host kernel range
    /// `[kva, kva + len)`, so code at those addresses keeps running while
    /// the EL2 MMU is switched.
    pub fn map_identity_kva<K>(&mut self, lookup: &K, kva: u64, len: u64, prot: Prot) -> Result<()>
    where
        K: KernelPhysLookup + ?Sized,
    {
        self.require_root()?;
        let attrs = HypAttributes::from_prot(prot);
        for page in page_range(kva, len)? {
            let pa = lookup.kva_to_phys(page).ok_or(Error::Unbacked(page))? & !PAGE_MASK_4KB;
            check_hyp_range(pa, PAGE_SIZE_4KB)?;
            self.install_page(pa, pa, attrs)?;
        }
        dsb_ishst();
        debug!("hypmap: identity for kva {:#x}+{:#x}", kva, len);
        Ok(())
    }

    /// Map `[va, va + len)` to `[pa, pa + len)`. Both ranges must lie
    /// below 2^48.
    pub fn set(&mut self, va: u64, pa: u64, len: u64, prot: Prot) -> Result<()> {
        self.require_root()?;
        check_hyp_range(va, len)?;
        let attrs = HypAttributes::from_prot(prot);
        let va_base = va & !PAGE_MASK_4KB;
        let pa_base = pa & !PAGE_MASK_4KB;
        // The output pages span as many pages as the input range
        if let Some(last) = last_page(va, len)? {
            check_hyp_range(pa_base, last - va_base + PAGE_SIZE_4KB)?;
        }
        for page in page_range(va, len)? {
            self.install_page(page, pa_base + (page - va_base), attrs)?;
        }
        dsb_ishst();
        debug!("hypmap: {:#x}+{:#x} -> pa {:#x}", va, len, pa);
        Ok(())
    }

    /// Remove the leaf entries covering `[va, va + len)`. Table pages stay
    /// allocated until [`HypMap::cleanup`].
    pub fn unmap(&mut self, va: u64, len: u64) -> Result<()> {
        self.require_root()?;
        check_hyp_range(va, len)?;
        for page in page_range(va, len)? {
            if let Some(slot) = self.leaf_slot(page) {
                unsafe {
                    if HypPte::from_raw(read_volatile(slot)).is_valid() {
                        write_volatile(slot, HypPte::invalid().raw());
                        tlbi_va(page);
                    }
                }
            }
        }
        Ok(())
    }

    /// Physical address mapped at EL2 address `va`, or `None` if unmapped.
    pub fn get(&self, va: u64) -> Option<u64> {
        if va > HYP_VM_MAX_ADDRESS {
            return None;
        }
        let slot = self.leaf_slot(va)?;
        let pte = HypPte::from_raw(unsafe { read_volatile(slot) });
        if !pte.is_table() {
            return None;
        }
        Some(pte.addr() | (va & PAGE_OFFSET_MASK))
    }

    /// Release every table page, root included. Safe on a handle that was
    /// never initialized, partially built, or already cleaned up.
    pub fn cleanup(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };
        self.free_table(root, 0);
        tlbi_all();
        debug!("hypmap: released root {:#x}, {} pages still held", root, self.table_pages);
    }

    fn require_root(&self) -> Result<u64> {
        self.root.ok_or(Error::NotInitialized)
    }

    fn alloc_table(&mut self) -> Result<u64> {
        let page = self.alloc.alloc_table_page().ok_or(Error::OutOfMemory)?;
        self.table_pages += 1;
        trace!("hypmap: table page {:#x}", page);
        Ok(page)
    }

    fn free_table(&mut self, table: u64, level: usize) {
        if level < PT_LEVELS - 1 {
            let base = self.alloc.table_ptr(table);
            for i in 0..PT_ENTRIES {
                let entry = HypPte::from_raw(unsafe { read_volatile(base.add(i)) });
                if entry.is_table() {
                    self.free_table(entry.addr(), level + 1);
                }
            }
        }
        self.alloc.free_table_page(table);
        self.table_pages -= 1;
    }

    /// Walk to the L3 slot for `va` without allocating.
    fn leaf_slot(&self, va: u64) -> Option<*mut u64> {
        let mut table = self.root?;
        for level in 0..PT_LEVELS - 1 {
            let slot = unsafe { self.alloc.table_ptr(table).add(pt_index(va, level)) };
            let entry = HypPte::from_raw(unsafe { read_volatile(slot) });
            if !entry.is_table() {
                return None;
            }
            table = entry.addr();
        }
        Some(unsafe { self.alloc.table_ptr(table).add(pt_index(va, PT_LEVELS - 1)) })
    }

    /// Walk to the L3 slot for `va`, allocating missing tables.
    fn leaf_slot_alloc(&mut self, va: u64) -> Result<*mut u64> {
        let mut table = self.require_root()?;
        for level in 0..PT_LEVELS - 1 {
            let slot = unsafe { self.alloc.table_ptr(table).add(pt_index(va, level)) };
            let entry = HypPte::from_raw(unsafe { read_volatile(slot) });
            table = if entry.is_table() {
                entry.addr()
            } else {
                debug_assert!(!entry.is_valid(), "block entry in hyp tables");
                let next = self.alloc_table()?;
                unsafe { write_volatile(slot, HypPte::table(next).raw()) };
                next
            };
        }
        Ok(unsafe { self.alloc.table_ptr(table).add(pt_index(va, PT_LEVELS - 1)) })
    }

    fn install_page(&mut self, va: u64, pa: u64, attrs: HypAttributes) -> Result<()> {
        let slot = self.leaf_slot_alloc(va)?;
        let new = HypPte::page(pa, attrs);
        unsafe {
            let old = HypPte::from_raw(read_volatile(slot));
            if old == new {
                return Ok(());
            }
            if old.is_valid() {
                // Break-before-make
                write_volatile(slot, HypPte::invalid().raw());
                tlbi_va(va);
            }
            write_volatile(slot, new.raw());
        }
        trace!("hypmap: {:#x} -> {:#x}", va, pa);
        Ok(())
    }
}

impl<A: PageTableAlloc> Drop for HypMap<A> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
