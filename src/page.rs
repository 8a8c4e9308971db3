//! RX page recycling
//!
//! Each RX slot owns one 4K DMA page split into two 2K halves. Hardware fills
//! the half at `page_offset`; once the frame is consumed the slot flips to the
//! other half as long as nobody upstream still holds a fragment of the page.

use alloc::sync::Arc;

use crate::constants::{PAGE_SIZE, RX_BUFSZ};
use crate::dma::{self, DmaRegion};
use crate::error::IgbResult;

/// Shared handle on one RX page. Fragments handed upstream hold clones.
#[derive(Debug, Clone)]
pub struct RxPage(Arc<DmaRegion>);

impl RxPage {
    pub fn alloc() -> IgbResult<Self> {
        Ok(Self(Arc::new(DmaRegion::alloc(PAGE_SIZE)?)))
    }

    #[inline]
    pub fn dma(&self) -> u64 {
        self.0.paddr()
    }

    /// No fragment of this page is alive outside the ring.
    #[inline]
    pub fn is_exclusive(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    pub fn data(&self, offset: usize, len: usize) -> &[u8] {
        self.0.as_slice(offset, len)
    }

    pub fn sync_for_cpu(&self, offset: usize, len: usize) {
        self.0.sync_for_cpu(offset, len);
    }

    pub fn sync_for_device(&self, offset: usize, len: usize) {
        self.0.sync_for_device(offset, len);
    }
}

/// Software record of one RX slot.
#[derive(Debug, Default)]
pub struct RxBuffer {
    pub page: Option<RxPage>,
    pub page_offset: usize,
}

impl RxBuffer {
    /// Bus address of the half currently exposed to hardware.
    pub fn dma_addr(&self) -> Option<u64> {
        self.page
            .as_ref()
            .map(|page| page.dma() + self.page_offset as u64)
    }
}

/// Page allocation and reuse policy for one RX ring.
#[derive(Debug, Default)]
pub struct PageRecycler {
    pub alloc_failed: u64,
    pub reused: u64,
    pub released: u64,
}

impl PageRecycler {
    /// Make sure `buffer` holds a mapped page.
    ///
    /// Keeps an existing page untouched; otherwise allocates a fresh one and
    /// starts at its first half. Failures are counted and reported, the caller
    /// retries on its next refill pass.
    pub fn acquire_page(&mut self, buffer: &mut RxBuffer) -> IgbResult {
        if buffer.page.is_some() {
            return Ok(());
        }
        match RxPage::alloc() {
            Ok(page) => {
                buffer.page = Some(page);
                buffer.page_offset = 0;
                Ok(())
            }
            Err(e) => {
                self.alloc_failed += 1;
                Err(e)
            }
        }
    }

    /// Decide whether the page of `buffer` can go straight back to hardware
    /// after its current half is handed upstream.
    ///
    /// Must be called before the caller clones the page into a fragment. On
    /// success the buffer is flipped to the other half and synced for the
    /// device; the caller then takes a clone for the fragment at the old
    /// offset. On failure the buffer is left untouched and the caller moves
    /// the page out with [`PageRecycler::release`].
    pub fn try_reuse(&mut self, buffer: &mut RxBuffer) -> bool {
        let Some(page) = buffer.page.as_ref() else {
            return false;
        };
        if !dma::is_local(page.dma()) || !page.is_exclusive() {
            return false;
        }
        buffer.page_offset ^= RX_BUFSZ;
        page.sync_for_device(buffer.page_offset, RX_BUFSZ);
        self.reused += 1;
        true
    }

    /// Whether a page whose frame was fully copied out can stay as it is.
    pub fn keep_after_copy(&mut self, buffer: &RxBuffer) -> bool {
        match buffer.page.as_ref() {
            Some(page) if dma::is_local(page.dma()) => {
                page.sync_for_device(buffer.page_offset, RX_BUFSZ);
                self.reused += 1;
                true
            }
            _ => false,
        }
    }

    /// Detach the page from the ring. It is freed once the last fragment drops.
    pub fn release(&mut self, buffer: &mut RxBuffer) -> Option<RxPage> {
        let page = buffer.page.take();
        if page.is_some() {
            self.released += 1;
        }
        buffer.page_offset = 0;
        page
    }
}
