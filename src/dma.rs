//! DMA-coherent memory and streaming mappings

use memory_addr::{PhysAddr, VirtAddr};

use crate::constants::PAGE_SIZE;
use crate::error::{IgbError, IgbResult};
use crate::{KernelFunc, UseKernelFunc};

/// A run of DMA-coherent pages, released on drop.
#[derive(Debug)]
pub struct DmaRegion {
    vaddr: usize,
    paddr: usize,
    pages: usize,
}

impl DmaRegion {
    /// Allocate enough zeroed pages for `size` bytes.
    pub fn alloc(size: usize) -> IgbResult<Self> {
        let pages = size.div_ceil(PAGE_SIZE).max(1);
        let (vaddr, paddr) = UseKernelFunc::dma_alloc_coherent(pages);
        if vaddr == 0 {
            return Err(IgbError::NoMemory);
        }
        unsafe { core::ptr::write_bytes(vaddr as *mut u8, 0, pages * PAGE_SIZE) };
        Ok(Self { vaddr, paddr, pages })
    }

    #[inline]
    pub fn vaddr(&self) -> usize {
        self.vaddr
    }

    #[inline]
    pub fn paddr(&self) -> u64 {
        self.paddr as u64
    }

    pub fn size(&self) -> usize {
        self.pages * PAGE_SIZE
    }

    /// Make CPU writes in `[offset, offset + len)` visible to the device.
    pub fn sync_for_device(&self, offset: usize, len: usize) {
        UseKernelFunc::clean_dcache_range(self.vaddr + offset, len);
    }

    /// Drop stale cache lines before the CPU reads device-written data.
    pub fn sync_for_cpu(&self, offset: usize, len: usize) {
        UseKernelFunc::invalidate_dcache_range(self.vaddr + offset, len);
    }

    pub fn as_slice(&self, offset: usize, len: usize) -> &[u8] {
        assert!(offset + len <= self.size());
        unsafe { core::slice::from_raw_parts((self.vaddr + offset) as *const u8, len) }
    }
}

impl Drop for DmaRegion {
    fn drop(&mut self) {
        UseKernelFunc::dma_free_coherent(self.vaddr, self.pages);
    }
}

/// Map a CPU buffer for a device read: flush it and return its bus address.
pub fn map_to_device(buf: &[u8]) -> u64 {
    let vaddr = buf.as_ptr() as usize;
    UseKernelFunc::clean_dcache_range(vaddr, buf.len());
    UseKernelFunc::virt_to_phys(VirtAddr::from(vaddr)).as_usize() as u64
}

pub fn is_local(paddr: u64) -> bool {
    UseKernelFunc::is_local_page(PhysAddr::from(paddr as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn test_region_is_zeroed_and_freed() {
        let before = mock::live_dma_pages();
        {
            let region = DmaRegion::alloc(PAGE_SIZE + 1).unwrap();
            assert_eq!(region.size(), 2 * PAGE_SIZE);
            assert!(region.as_slice(0, region.size()).iter().all(|b| *b == 0));
            assert_eq!(mock::live_dma_pages(), before + 2);
        }
        assert_eq!(mock::live_dma_pages(), before);
    }

    #[test]
    fn test_alloc_failure() {
        mock::fail_dma_allocs(1);
        assert_eq!(DmaRegion::alloc(64).unwrap_err(), IgbError::NoMemory);
        assert!(DmaRegion::alloc(64).is_ok());
    }
}
