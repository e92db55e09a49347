//! Memory management subsystem
//!
//! Interfaces to the collaborators that own physical memory: the
//! allocator handing out translation table pages and the host kernel's
//! own virtual to physical association.

pub mod allocator;

pub use allocator::{PagePool, PageTableAlloc};

use bitflags::bitflags;

bitflags! {
    /// Access rights requested for a hyp mapping
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Prot: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;

        const RW = Self::READ.bits() | Self::WRITE.bits();
        const RX = Self::READ.bits() | Self::EXECUTE.bits();
        const RWX = Self::RW.bits() | Self::EXECUTE.bits();
    }
}

/// Lookup of the physical page backing a host kernel virtual address.
pub trait KernelPhysLookup {
    /// Physical address backing `kva`, or `None` if it is not mapped.
    fn kva_to_phys(&self, kva: u64) -> Option<u64>;
}

impl<F> KernelPhysLookup for F
where
    F: Fn(u64) -> Option<u64>,
{
    fn kva_to_phys(&self, kva: u64) -> Option<u64> {
        self(kva)
    }
}
