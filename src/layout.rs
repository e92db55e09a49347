//! Hyp Address Space Layout
//!
//! When running at EL2 the translation table base register is TTBR0_EL2,
//! so every address the CPU generates must have its top 16 bits clear:
//!
//! ```text
//!   0x0000ffffffffffff  end of hyp address space
//!   0x0000800000000000  start of translated kernel region
//!   0x00007fffffffffff  end of identity region
//!   0x0000000000000000  start of hyp address space
//! ```
//!
//! Kernel virtual addresses are moved into the upper half of this space
//! with [`ktohyp`]; the lower half holds the identity map (VA == PA) used
//! while the EL2 MMU is switched on or off. Each half spans 47 bits, so
//! the two never clash for physical memory up to 128 TiB.

// ── Address space bounds ─────────────────────────────────────────────
pub const HYP_VM_MIN_ADDRESS: u64 = 0x0000_0000_0000_0000;
pub const HYP_VM_MAX_ADDRESS: u64 = 0x0000_ffff_ffff_ffff;

// ── Translated kernel region ─────────────────────────────────────────
pub const HYP_KVA_OFFSET: u64 = 0x0000_8000_0000_0000;
pub const HYP_KVA_MASK: u64 = 0x0000_ffff_ffff_ffff;

/// Convert a kernel virtual address to the address it has at EL2.
#[inline]
pub const fn ktohyp(kva: u64) -> u64 {
    (kva & HYP_KVA_MASK) | HYP_KVA_OFFSET
}

/// Which half of the hyp address space an address falls in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HypRegion {
    /// `[0, 2^47)`: identity mappings
    Identity,
    /// `[2^47, 2^48)`: translated kernel mappings
    KernelVa,
}

impl HypRegion {
    /// Classify an EL2 address, or `None` if it is not a valid EL2 address.
    pub const fn of(addr: u64) -> Option<Self> {
        if addr > HYP_VM_MAX_ADDRESS {
            None
        } else if addr >= HYP_KVA_OFFSET {
            Some(HypRegion::KernelVa)
        } else {
            Some(HypRegion::Identity)
        }
    }
}
