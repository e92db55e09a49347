//! vCPU register reset
//!
//! Architectural reset values for a guest vCPU's system registers. Both
//! routines overwrite every field they own, so calling them again on an
//! already running context yields the same state as at creation.
//!
//! Values copied from the host come from the physical CPU the caller is
//! running on; callers keep migration disabled until the vCPU is entered.

use log::debug;

use crate::arch::aarch64::defs::{Cpacr, Cptr, Hcr, Mpidr, Sctlr, Spsr};
use crate::arch::aarch64::{HostCpuInfo, VcpuContext};

/// HCR_EL2 value a guest runs with.
///
/// - RW: EL1 is AArch64
/// - BSU_IS: barriers apply to the inner shareable domain
/// - SWIO: set/way invalidate is upgraded to clean and invalidate
/// - FB: maintenance operations are broadcast
/// - AMO/IMO/FMO: physical SError, IRQ and FIQ are taken to EL2
/// - VM: stage-2 translation
pub const GUEST_HCR_EL2: Hcr = Hcr::RW
    .union(Hcr::BSU_IS)
    .union(Hcr::SWIO)
    .union(Hcr::FB)
    .union(Hcr::VM)
    .union(Hcr::AMO)
    .union(Hcr::IMO)
    .union(Hcr::FMO);

/// SPSR_EL2 for the first guest entry: DAIF masked, EL1h.
pub const GUEST_SPSR_EL2: Spsr = Spsr::DAIF.union(Spsr::M_EL1H);

/// Reset the guest's own EL1 registers.
pub fn reset_guest_el1_view<H: HostCpuInfo + ?Sized>(ctx: &mut VcpuContext, host: &H) {
    // Guest boots with its MMU off
    ctx.sctlr_el1 = Sctlr::RES1.difference(Sctlr::M);
    // Same memory attribute encoding as the host
    ctx.mair_el1 = host.current_host_memory_attributes();
    // SVE, Advanced SIMD and FP are not trapped to EL1
    ctx.cpacr_el1 = Cpacr::TRAP_NONE;
}

/// Reset the EL2 registers that control the guest.
pub fn reset_elevated_view<H: HostCpuInfo + ?Sized>(ctx: &mut VcpuContext, host: &H) {
    ctx.hcr_el2 = GUEST_HCR_EL2;

    // The guest sees a single-core, single-threaded CPU
    let mut vmpidr = Mpidr::from_bits_retain(host.current_cpu_affinity());
    vmpidr.insert(Mpidr::U);
    vmpidr.remove(Mpidr::MT);
    ctx.vmpidr_el2 = vmpidr;

    // Same implementer, part and revision as the host
    ctx.vpidr_el2 = host.current_cpu_identification();

    // CPACR_EL1, trace, SVE, Advanced SIMD and FP are not trapped to EL2
    ctx.cptr_el2 = Cptr::RES1;

    // Interrupts stay masked until the guest OS enables them; exceptions
    // to EL1 use SP_EL1.
    ctx.spsr_el2 = GUEST_SPSR_EL2;
}

/// Full architectural reset of a vCPU's system registers.
pub fn reset_vcpu<H: HostCpuInfo + ?Sized>(ctx: &mut VcpuContext, host: &H) {
    reset_guest_el1_view(ctx, host);
    reset_elevated_view(ctx, host);
    debug!(
        "vcpu reset: hcr={:#x} vmpidr={:#x} vpidr={:#x}",
        ctx.hcr_el2.bits(),
        ctx.vmpidr_el2.bits(),
        ctx.vpidr_el2
    );
}

impl VcpuContext {
    /// Context with every reset register set for the current host CPU.
    pub fn reset<H: HostCpuInfo + ?Sized>(host: &H) -> Self {
        let mut ctx = Self::new();
        reset_vcpu(&mut ctx, host);
        ctx
    }
}
