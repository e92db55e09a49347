//! Memory Management for ARM64
//!
//! This module handles:
//! - EL2 stage-1 descriptor encoding
//! - EL2 translation register configuration
//! - TLB maintenance

pub mod mmu;

pub use mmu::*;
