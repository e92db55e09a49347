//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::alloc::{alloc_zeroed, dealloc, Layout};

use hypcore::{HostCpuInfo, KernelPhysLookup, PagePool};

/// Page-aligned heap region standing in for the hypervisor's table heap.
pub struct Arena {
    ptr: *mut u8,
    layout: Layout,
}

impl Arena {
    pub fn new(pages: usize) -> Self {
        let layout = Layout::from_size_align(pages * 4096, 4096).unwrap();
        let ptr = unsafe { alloc_zeroed(layout) };
        assert!(!ptr.is_null());
        Self { ptr, layout }
    }

    pub fn pool(&self) -> PagePool {
        unsafe { PagePool::new(self.ptr as u64, self.layout.size() as u64) }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) }
    }
}

/// Host kernel mapping one contiguous image.
pub struct KernelImage {
    pub kva_base: u64,
    pub pa_base: u64,
    pub size: u64,
}

impl KernelPhysLookup for KernelImage {
    fn kva_to_phys(&self, kva: u64) -> Option<u64> {
        let off = kva.checked_sub(self.kva_base)?;
        (off < self.size).then(|| self.pa_base + off)
    }
}

pub const KERNEL: KernelImage = KernelImage {
    kva_base: 0xffff_0000_0000_0000,
    pa_base: 0x4020_0000,
    size: 0x100_0000,
};

/// Fixed identification registers instead of the running CPU's.
#[derive(Clone, Copy)]
pub struct FakeCpu {
    pub mpidr: u64,
    pub midr: u64,
    pub mair: u64,
}

impl HostCpuInfo for FakeCpu {
    fn current_cpu_affinity(&self) -> u64 {
        self.mpidr
    }

    fn current_cpu_identification(&self) -> u64 {
        self.midr
    }

    fn current_host_memory_attributes(&self) -> u64 {
        self.mair
    }
}

/// Core 1 of cluster 0 on a multithreaded part
pub const NEOVERSE_N1: FakeCpu = FakeCpu {
    mpidr: 0x8100_0100,
    midr: 0x414f_d0c1,
    mair: 0x0000_0044_ff04_0c00,
};
