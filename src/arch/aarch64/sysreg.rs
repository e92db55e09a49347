//! Host CPU identification
//!
//! The vCPU reset code mirrors a few of the running CPU's identification
//! registers into the guest. They are read through [`HostCpuInfo`] so the
//! reset logic does not depend on executing at EL2.

/// Live identification state of the physical CPU executing the caller.
///
/// Values are per physical CPU: callers must not migrate between reading
/// them and running the vCPU they were read for.
pub trait HostCpuInfo {
    /// MPIDR_EL1
    fn current_cpu_affinity(&self) -> u64;
    /// MIDR_EL1
    fn current_cpu_identification(&self) -> u64;
    /// MAIR_EL1
    fn current_host_memory_attributes(&self) -> u64;
}

/// Reads the identification registers of the current CPU.
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct SysRegCpuInfo;

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
impl HostCpuInfo for SysRegCpuInfo {
    fn current_cpu_affinity(&self) -> u64 {
        let mpidr: u64;
        unsafe {
            core::arch::asm!("mrs {}, mpidr_el1", out(reg) mpidr, options(nostack, nomem));
        }
        mpidr
    }

    fn current_cpu_identification(&self) -> u64 {
        let midr: u64;
        unsafe {
            core::arch::asm!("mrs {}, midr_el1", out(reg) midr, options(nostack, nomem));
        }
        midr
    }

    fn current_host_memory_attributes(&self) -> u64 {
        let mair: u64;
        unsafe {
            core::arch::asm!("mrs {}, mair_el1", out(reg) mair, options(nostack, nomem));
        }
        mair
    }
}
