//! Per-vCPU system register state programmed at reset.
//!
//! Shadow copies of the guest's EL1 control registers and of the EL2
//! registers that control the guest. The world switch loads these into
//! hardware before entering the guest.

use super::defs::{Cpacr, Cptr, Hcr, Mpidr, Sctlr, Spsr};

/// Per-vCPU reset state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VcpuContext {
    // EL1 system registers
    pub sctlr_el1: Sctlr,
    pub mair_el1: u64,
    pub cpacr_el1: Cpacr,

    // EL2 control of the guest
    pub hcr_el2: Hcr,
    pub vmpidr_el2: Mpidr,
    pub vpidr_el2: u64,
    pub cptr_el2: Cptr,
    pub spsr_el2: Spsr,
}

impl VcpuContext {
    /// Create a new zeroed state
    pub const fn new() -> Self {
        Self {
            sctlr_el1: Sctlr::empty(),
            mair_el1: 0,
            cpacr_el1: Cpacr::empty(),
            hcr_el2: Hcr::empty(),
            vmpidr_el2: Mpidr::empty(),
            vpidr_el2: 0,
            cptr_el2: Cptr::empty(),
            spsr_el2: Spsr::empty(),
        }
    }
}

impl Default for VcpuContext {
    fn default() -> Self {
        Self::new()
    }
}
