//! EL2 Stage-1 Translation
//!
//! Descriptor encoding for the hypervisor's own translation tables
//! (TTBR0_EL2 regime, no VHE).
//!
//! Page Table Levels (for 4KB granule, 48-bit VA):
//! - Level 0: 512GB regions (entry covers bits [47:39])
//! - Level 1: 1GB regions (entry covers bits [38:30])
//! - Level 2: 2MB regions (entry covers bits [29:21])
//! - Level 3: 4KB pages (entry covers bits [20:12])

use crate::arch::aarch64::defs::*;
use crate::mm::Prot;

/// Number of table levels walked for a 48-bit address
pub const PT_LEVELS: usize = 4;

/// Index into the table at `level` (0..=3) for address `va`.
#[inline]
pub const fn pt_index(va: u64, level: usize) -> usize {
    let shift = PAGE_SHIFT + 9 * (3 - level as u64);
    ((va >> shift) & PT_INDEX_MASK) as usize
}

/// EL2 stage-1 page table entry
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HypPte(u64);

impl HypPte {
    /// Create an invalid entry
    pub const fn invalid() -> Self {
        Self(0)
    }

    /// Create a page entry (Level 3)
    pub const fn page(addr: u64, attrs: HypAttributes) -> Self {
        Self((addr & PTE_ADDR_MASK) | PTE_VALID | PTE_TABLE | attrs.bits())
    }

    /// Create a table entry (points to next level)
    pub const fn table(next_level_addr: u64) -> Self {
        Self((next_level_addr & PTE_ADDR_MASK) | PTE_VALID | PTE_TABLE)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn is_valid(&self) -> bool {
        (self.0 & PTE_VALID) != 0
    }

    /// Table descriptor at L0-L2, page descriptor at L3
    pub fn is_table(&self) -> bool {
        (self.0 & (PTE_VALID | PTE_TABLE)) == (PTE_VALID | PTE_TABLE)
    }

    /// Output address bits [47:12]
    pub fn addr(&self) -> u64 {
        self.0 & PTE_ADDR_MASK
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Lower and upper attribute bits of an EL2 page descriptor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HypAttributes {
    bits: u64,
}

impl HypAttributes {
    // bits [4:2]  = AttrIndx (MAIR_EL2 slot)
    // bit  [6]    = AP[1], RES1 at EL2
    // bit  [7]    = AP[2] (1 = read-only)
    // bits [9:8]  = SH[1:0] (11 = Inner shareable)
    // bit  [10]   = AF
    // bit  [54]   = XN

    /// Normal write-back memory with the access rights in `prot`.
    pub const fn from_prot(prot: Prot) -> Self {
        let mut bits = (MAIR_IDX_NORMAL << PTE_ATTR_INDX_SHIFT) | PTE_AP_RES1 | PTE_SH_INNER | PTE_AF;
        if !prot.contains(Prot::WRITE) {
            bits |= PTE_AP_RO;
        }
        if !prot.contains(Prot::EXECUTE) {
            bits |= PTE_XN;
        }
        Self { bits }
    }

    pub const fn bits(&self) -> u64 {
        self.bits
    }
}

/// EL2 translation register values for a hyp table root
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HypTranslationConfig {
    pub ttbr0_el2: u64,
    pub tcr_el2: u64,
    pub mair_el2: u64,
}

impl HypTranslationConfig {
    pub fn new(root_table_addr: u64) -> Self {
        let tcr = TCR_EL2_RES1
            | TCR_T0SZ_48BIT
            | TCR_IRGN0_WB
            | TCR_ORGN0_WB
            | TCR_SH0_INNER
            | TCR_TG0_4KB
            | TCR_PS_48BIT;

        Self {
            ttbr0_el2: root_table_addr & PTE_ADDR_MASK,
            tcr_el2: tcr,
            mair_el2: MAIR_EL2_VALUE,
        }
    }

    /// Program MAIR_EL2, TCR_EL2 and TTBR0_EL2. Does not touch SCTLR_EL2.M.
    #[cfg(all(target_arch = "aarch64", target_os = "none"))]
    pub fn install(&self) {
        unsafe {
            core::arch::asm!(
                "msr mair_el2, {mair}",
                "msr tcr_el2, {tcr}",
                "msr ttbr0_el2, {ttbr}",
                "isb",
                mair = in(reg) self.mair_el2,
                tcr = in(reg) self.tcr_el2,
                ttbr = in(reg) self.ttbr0_el2,
                options(nostack),
            );
        }
        tlbi_all();
    }
}

/// Make descriptor writes visible to the table walker.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub fn dsb_ishst() {
    unsafe {
        core::arch::asm!("dsb ishst", options(nostack));
    }
}

/// Invalidate all EL2 TLB entries.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub fn tlbi_all() {
    unsafe {
        core::arch::asm!(
            "dsb ishst",
            "tlbi alle2is",
            "dsb ish",
            "isb",
            options(nostack),
        );
    }
}

/// Invalidate a single EL2 VA.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub fn tlbi_va(va: u64) {
    let va_shifted = (va >> PAGE_SHIFT) & 0x0000_0FFF_FFFF_FFFF;
    unsafe {
        core::arch::asm!(
            "dsb ishst",
            "tlbi vae2is, {va}",
            "dsb ish",
            "isb",
            va = in(reg) va_shifted,
            options(nostack),
        );
    }
}

// Hosted builds have no EL2 TLB to maintain.
#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
pub fn dsb_ishst() {}

#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
pub fn tlbi_all() {}

#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
pub fn tlbi_va(_va: u64) {}
