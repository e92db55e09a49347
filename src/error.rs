//! Errors returned by the hyp address space manager

use core::fmt;

/// Errors returned by creating or modifying hypervisor mappings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// No page could be allocated for a translation table.
    OutOfMemory,
    /// The table root has not been allocated (or was cleaned up).
    NotInitialized,
    /// Address lies outside the 48-bit hyp address space, or the range wraps.
    AddressOutOfRange(u64),
    /// Kernel virtual address has no physical backing.
    Unbacked(u64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfMemory => write!(f, "out of translation table pages"),
            Error::NotInitialized => write!(f, "hyp table root not initialized"),
            Error::AddressOutOfRange(addr) => {
                write!(f, "address {:#x} outside hyp address space", addr)
            }
            Error::Unbacked(kva) => write!(f, "kernel address {:#x} is not backed", kva),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
