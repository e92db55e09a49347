#![cfg_attr(not(test), no_std)]

//! EL2 bootstrap core of an ARM64 hypervisor: the hypervisor's own
//! translation tables and the reset state of guest vCPU system registers.

pub mod arch;
pub mod error;
pub mod hyp_map;
pub mod layout;
pub mod mm;
pub mod vcpu_reset;

pub use arch::aarch64::{HostCpuInfo, VcpuContext};
pub use error::{Error, Result};
pub use hyp_map::HypMap;
pub use layout::{ktohyp, HypRegion};
pub use mm::{KernelPhysLookup, PagePool, PageTableAlloc, Prot};
pub use vcpu_reset::{reset_elevated_view, reset_guest_el1_view, reset_vcpu};
