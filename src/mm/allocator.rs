//! Page pool for translation table pages

use crate::arch::aarch64::defs::PAGE_SIZE_4KB;

/// Source of 4KB pages for translation tables.
///
/// Pages are identified by physical address. `table_ptr` gives the
/// address through which the hypervisor writes the page's descriptors.
pub trait PageTableAlloc {
    /// Allocate a zeroed page. `None` when memory is exhausted.
    fn alloc_table_page(&mut self) -> Option<u64>;

    /// Give back a page obtained from `alloc_table_page`.
    fn free_table_page(&mut self, pa: u64);

    /// Writable view of the table page at `pa`.
    fn table_ptr(&self, pa: u64) -> *mut u64;
}

impl<A: PageTableAlloc + ?Sized> PageTableAlloc for &mut A {
    fn alloc_table_page(&mut self) -> Option<u64> {
        (**self).alloc_table_page()
    }

    fn free_table_page(&mut self, pa: u64) {
        (**self).free_table_page(pa)
    }

    fn table_ptr(&self, pa: u64) -> *mut u64 {
        (**self).table_ptr(pa)
    }
}

/// Link stored in the last page of the free list. Never page aligned.
const FREE_LIST_END: u64 = u64::MAX;

/// Bump allocator with a free list, over an identity-mapped region.
pub struct PagePool {
    start: u64,
    next: u64,
    end: u64,
    /// Head of the list of returned pages; each free page stores the next link in its first word.
    free_head: Option<u64>,
    outstanding: usize,
}

impl PagePool {
    /// # Safety
    ///
    /// `[start, start + size)` must be memory owned by the pool for its
    /// whole lifetime, readable and writable at the same address.
    pub const unsafe fn new(start: u64, size: u64) -> Self {
        let aligned = (start + PAGE_SIZE_4KB - 1) & !(PAGE_SIZE_4KB - 1);
        Self {
            start: aligned,
            next: aligned,
            end: start + size,
            free_head: None,
            outstanding: 0,
        }
    }

    pub fn alloc_page(&mut self) -> Option<u64> {
        let page = if let Some(page) = self.free_head {
            let next = unsafe { *(page as *const u64) };
            self.free_head = (next != FREE_LIST_END).then_some(next);
            page
        } else {
            let new_next = self.next.checked_add(PAGE_SIZE_4KB)?;
            if new_next > self.end {
                return None;
            }
            let page = self.next;
            self.next = new_next;
            page
        };

        unsafe {
            core::ptr::write_bytes(page as *mut u8, 0, PAGE_SIZE_4KB as usize);
        }
        self.outstanding += 1;
        Some(page)
    }

    pub fn free_page(&mut self, page: u64) {
        debug_assert!(self.contains(page), "page {:#x} not from this pool", page);
        debug_assert!(page % PAGE_SIZE_4KB == 0);

        unsafe {
            *(page as *mut u64) = self.free_head.unwrap_or(FREE_LIST_END);
        }
        self.free_head = Some(page);
        self.outstanding -= 1;
    }

    pub fn contains(&self, page: u64) -> bool {
        page >= self.start && page < self.next
    }

    /// Pages handed out and not yet returned
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Bytes never yet handed out (excludes the free list)
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next)
    }
}

impl PageTableAlloc for PagePool {
    fn alloc_table_page(&mut self) -> Option<u64> {
        self.alloc_page()
    }

    fn free_table_page(&mut self, pa: u64) {
        self.free_page(pa)
    }

    fn table_ptr(&self, pa: u64) -> *mut u64 {
        pa as *mut u64
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::alloc::{alloc_zeroed, dealloc, Layout};

    const PAGES: usize = 4;

    pub(crate) struct Arena {
        ptr: *mut u8,
        layout: Layout,
    }

    impl Arena {
        pub(crate) fn new(pages: usize) -> Self {
            let layout = Layout::from_size_align(pages * 4096, 4096).unwrap();
            let ptr = unsafe { alloc_zeroed(layout) };
            assert!(!ptr.is_null());
            Self { ptr, layout }
        }

        pub(crate) fn pool(&self) -> PagePool {
            unsafe { PagePool::new(self.ptr as u64, self.layout.size() as u64) }
        }
    }

    impl Drop for Arena {
        fn drop(&mut self) {
            unsafe { dealloc(self.ptr, self.layout) }
        }
    }

    #[test]
    fn pages_are_aligned_and_sequential() {
        let arena = Arena::new(PAGES);
        let mut pool = arena.pool();

        let p1 = pool.alloc_page().unwrap();
        let p2 = pool.alloc_page().unwrap();
        assert_eq!(p1 % 4096, 0);
        assert_eq!(p2, p1 + 4096);
        assert_eq!(pool.outstanding(), 2);
    }

    #[test]
    fn exhaustion_returns_none() {
        let arena = Arena::new(PAGES);
        let mut pool = arena.pool();

        for _ in 0..PAGES {
            assert!(pool.alloc_page().is_some());
        }
        assert_eq!(pool.alloc_page(), None);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn freed_pages_are_reused_and_zeroed() {
        let arena = Arena::new(PAGES);
        let mut pool = arena.pool();

        let page = pool.alloc_page().unwrap();
        unsafe { *(page as *mut u64).add(7) = 0xdead_beef };
        pool.free_page(page);
        assert_eq!(pool.outstanding(), 0);

        let again = pool.alloc_page().unwrap();
        assert_eq!(again, page);
        let words = unsafe { core::slice::from_raw_parts(again as *const u64, 512) };
        assert!(words.iter().all(|&w| w == 0));
    }

    #[test]
    fn free_list_end_falls_back_to_bump() {
        let arena = Arena::new(PAGES);
        let mut pool = arena.pool();

        let a = pool.alloc_page().unwrap();
        let b = pool.alloc_page().unwrap();
        pool.free_page(a);
        pool.free_page(b);

        // LIFO, then the list is exhausted and fresh pages follow
        assert_eq!(pool.alloc_page(), Some(b));
        assert_eq!(pool.alloc_page(), Some(a));
        assert_eq!(pool.alloc_page(), Some(b + 4096));
        assert_eq!(pool.outstanding(), 3);
    }
}
