//! ARM64 Architecture Constants
//!
//! Named flag sets for the system registers programmed at vCPU reset,
//! EL2 stage-1 descriptor bits, and translation control fields.
//! Eliminates magic numbers throughout the codebase.

use bitflags::bitflags;

// ── HCR_EL2 (Hypervisor Configuration Register) ─────────────────────
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Hcr: u64 {
        /// Stage-2 translation enabled
        const VM = 1 << 0;
        /// Set/way invalidate becomes set/way clean and invalidate
        const SWIO = 1 << 1;
        /// Physical FIQ routed to EL2
        const FMO = 1 << 3;
        /// Physical IRQ routed to EL2
        const IMO = 1 << 4;
        /// Physical SError routed to EL2
        const AMO = 1 << 5;
        /// Broadcast TLB and I-cache maintenance
        const FB = 1 << 9;
        /// Barrier shareability upgrade: inner shareable
        const BSU_IS = 1 << 10;
        /// EL1 is AArch64
        const RW = 1 << 31;
    }
}

// ── SCTLR_EL1 (System Control Register, EL1) ─────────────────────────
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Sctlr: u64 {
        /// Stage-1 MMU enable
        const M = 1 << 0;
        const EOS = 1 << 11;
        const TSCXT = 1 << 20;
        const EIS = 1 << 22;
        const SPAN = 1 << 23;
        const NTLSMD = 1 << 28;
        const LSMAOE = 1 << 29;

        /// Bits that are RES1 in ARMv8.0
        const RES1 = Self::EOS.bits()
            | Self::TSCXT.bits()
            | Self::EIS.bits()
            | Self::SPAN.bits()
            | Self::NTLSMD.bits()
            | Self::LSMAOE.bits();
    }
}

// ── CPACR_EL1 (Architectural Feature Access Control) ─────────────────
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Cpacr: u64 {
        /// SVE at EL1/EL0 not trapped
        const ZEN = 0b11 << 16;
        /// FP and Advanced SIMD at EL1/EL0 not trapped
        const FPEN = 0b11 << 20;
        const TTA = 1 << 28;

        const TRAP_NONE = Self::ZEN.bits() | Self::FPEN.bits();
    }
}

// ── CPTR_EL2 (Architectural Feature Trap Register, E2H == 0) ─────────
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Cptr: u64 {
        const TZ = 1 << 8;
        const TFP = 1 << 10;
        const TSM = 1 << 12;
        const TTA = 1 << 20;
        const TCPAC = 1 << 31;

        /// RES1 on every implementation: bits [13], [9] and [7:0]
        const RES1 = (1 << 13) | (1 << 9) | 0xff;
    }
}

// ── MPIDR_EL1 / VMPIDR_EL2 ───────────────────────────────────────────
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Mpidr: u64 {
        /// Lowest affinity level is made of multithreaded PEs
        const MT = 1 << 24;
        /// Uniprocessor system
        const U = 1 << 30;

        // Affinity fields are carried through untouched.
        const _ = !0;
    }
}

// ── SPSR_EL2 ─────────────────────────────────────────────────────────
bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Spsr: u64 {
        /// EL1 using SP_EL1
        const M_EL1H = 0b0101;
        const F = 1 << 6;
        const I = 1 << 7;
        const A = 1 << 8;
        const D = 1 << 9;

        const DAIF = Self::D.bits() | Self::A.bits() | Self::I.bits() | Self::F.bits();
    }
}

pub const SPSR_MODE_MASK: u64 = 0b1111;

impl Spsr {
    /// Mode field M[3:0]
    pub const fn mode(self) -> u64 {
        self.bits() & SPSR_MODE_MASK
    }
}

// ── Page table constants ─────────────────────────────────────────────
pub const PTE_VALID: u64 = 1 << 0;
pub const PTE_TABLE: u64 = 1 << 1;
pub const PTE_ATTR_INDX_SHIFT: u64 = 2;
/// AP[1]: RES1 in the EL2 translation regime
pub const PTE_AP_RES1: u64 = 1 << 6;
/// AP[2]: read-only
pub const PTE_AP_RO: u64 = 1 << 7;
pub const PTE_SH_INNER: u64 = 0b11 << 8;
pub const PTE_AF: u64 = 1 << 10;
/// Execute-never (EL2 regime)
pub const PTE_XN: u64 = 1 << 54;
pub const PTE_ADDR_MASK: u64 = 0x0000_FFFF_FFFF_F000;
pub const PAGE_OFFSET_MASK: u64 = 0xFFF;
pub const PT_INDEX_MASK: u64 = 0x1FF;
pub const PT_ENTRIES: usize = 512;
pub const PAGE_SHIFT: u64 = 12;
pub const PAGE_SIZE_4KB: u64 = 4096;
pub const PAGE_MASK_4KB: u64 = PAGE_SIZE_4KB - 1;

// ── MAIR_EL2 ─────────────────────────────────────────────────────────
pub const MAIR_ATTR_NORMAL_WB: u64 = 0xff;
pub const MAIR_ATTR_DEVICE_NGNRNE: u64 = 0x00;
pub const MAIR_IDX_NORMAL: u64 = 0;
pub const MAIR_IDX_DEVICE: u64 = 1;
pub const MAIR_EL2_VALUE: u64 =
    (MAIR_ATTR_NORMAL_WB << (8 * MAIR_IDX_NORMAL)) | (MAIR_ATTR_DEVICE_NGNRNE << (8 * MAIR_IDX_DEVICE));

// ── TCR_EL2 fields (4KB granule, 48-bit VA) ──────────────────────────
pub const TCR_T0SZ_48BIT: u64 = 16;
pub const TCR_IRGN0_WB: u64 = 0b01 << 8;
pub const TCR_ORGN0_WB: u64 = 0b01 << 10;
pub const TCR_SH0_INNER: u64 = 0b11 << 12;
pub const TCR_TG0_4KB: u64 = 0b00 << 14;
pub const TCR_PS_48BIT: u64 = 0b101 << 16;
pub const TCR_EL2_RES1: u64 = (1 << 31) | (1 << 23);
