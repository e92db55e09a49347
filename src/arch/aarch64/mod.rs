//! ARM64/AArch64 architecture support
//!
//! This module contains ARM64-specific virtualization support including:
//! - System register flag definitions
//! - EL2 stage-1 descriptor encoding
//! - Host CPU identification
//! - Per-vCPU reset state

pub mod defs;
pub mod mm;
pub mod sysreg;
pub mod vcpu_context;

pub use sysreg::HostCpuInfo;
pub use vcpu_context::VcpuContext;
