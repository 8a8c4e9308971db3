//! Descriptor ring storage and index arithmetic

use core::marker::PhantomData;
use core::sync::atomic::{fence, Ordering};

use crate::constants::{DESC_SIZE, PAGE_SIZE};
use crate::dma::DmaRegion;
use crate::error::{IgbError, IgbResult};
use crate::types::Descriptor;

/// A power-of-two array of descriptors in coherent memory.
///
/// `next_to_use` is the producer index (software fills), `next_to_clean` the
/// consumer index (software expects hardware done), `next_to_alloc` the RX
/// refill cursor. One slot always stays empty, so `next_to_use == next_to_clean`
/// means the ring is empty.
pub struct DescRing<D: Descriptor> {
    region: DmaRegion,
    count: usize,
    pub next_to_use: usize,
    pub next_to_clean: usize,
    pub next_to_alloc: usize,
    _marker: PhantomData<D>,
}

impl<D: Descriptor> DescRing<D> {
    pub fn new(count: usize) -> IgbResult<Self> {
        if !count.is_power_of_two() {
            return Err(IgbError::InvalidDescriptorCount(count));
        }
        let region = DmaRegion::alloc((count * DESC_SIZE).next_multiple_of(PAGE_SIZE))?;
        Ok(Self {
            region,
            count,
            next_to_use: 0,
            next_to_clean: 0,
            next_to_alloc: 0,
            _marker: PhantomData,
        })
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Ring length in bytes, as programmed into xDLEN.
    pub fn byte_len(&self) -> usize {
        self.count * DESC_SIZE
    }

    pub fn dma(&self) -> u64 {
        self.region.paddr()
    }

    /// The slot after `i`.
    #[inline]
    pub fn next(&self, i: usize) -> usize {
        (i + 1) & (self.count - 1)
    }

    #[inline]
    pub fn wrap(&self, i: usize) -> usize {
        i & (self.count - 1)
    }

    pub fn advance_producer(&mut self, n: usize) {
        self.next_to_use = self.wrap(self.next_to_use + n);
    }

    pub fn advance_consumer(&mut self, n: usize) {
        self.next_to_clean = self.wrap(self.next_to_clean + n);
    }

    /// Slots owned by hardware or awaiting cleanup.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.wrap(self.next_to_use + self.count - self.next_to_clean)
    }

    /// Free slots, one kept in reserve.
    #[inline]
    pub fn slots_available_for_use(&self) -> usize {
        self.count - 1 - self.in_flight()
    }

    #[inline]
    pub fn desc(&self, i: usize) -> &D {
        debug_assert!(i < self.count);
        unsafe { &*((self.region.vaddr() + i * DESC_SIZE) as *const D) }
    }

    #[inline]
    pub fn desc_mut(&mut self, i: usize) -> &mut D {
        debug_assert!(i < self.count);
        unsafe { &mut *((self.region.vaddr() + i * DESC_SIZE) as *mut D) }
    }

    /// Whether hardware has written slot `i` back.
    ///
    /// On `true` the other writeback fields of the slot may be read.
    pub fn is_slot_complete(&self, i: usize) -> bool {
        self.region.sync_for_cpu(i * DESC_SIZE, DESC_SIZE);
        if !self.desc(i).is_done() {
            return false;
        }
        fence(Ordering::Acquire);
        true
    }

    /// Publish descriptor writes ahead of a tail pointer update.
    pub fn sync_for_device(&self) {
        self.region.sync_for_device(0, self.byte_len());
        fence(Ordering::Release);
    }

    /// Zero every descriptor and rewind the indices.
    pub fn reset(&mut self) {
        for i in 0..self.count {
            self.desc_mut(i).raw_mut().clear();
        }
        self.next_to_use = 0;
        self.next_to_clean = 0;
        self.next_to_alloc = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdvTxDesc;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(matches!(
            DescRing::<AdvTxDesc>::new(100),
            Err(IgbError::InvalidDescriptorCount(100))
        ));
    }

    #[test]
    fn test_empty_ring_keeps_one_slot() {
        let ring = DescRing::<AdvTxDesc>::new(64).unwrap();
        assert_eq!(ring.in_flight(), 0);
        assert_eq!(ring.slots_available_for_use(), 63);
        assert_eq!(ring.byte_len(), 1024);
    }

    #[test]
    fn test_wraparound() {
        let mut ring = DescRing::<AdvTxDesc>::new(64).unwrap();
        assert_eq!(ring.next(63), 0);
        ring.advance_producer(60);
        ring.advance_consumer(58);
        ring.advance_producer(10);
        assert_eq!(ring.next_to_use, 6);
        assert_eq!(ring.in_flight(), 12);
        assert_eq!(ring.slots_available_for_use(), 51);
    }

    #[test]
    fn test_index_invariant_holds_over_random_walk() {
        let mut ring = DescRing::<AdvTxDesc>::new(64).unwrap();
        let mut seed = 0x2545_F491u32;
        for _ in 0..10_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let n = (seed % 8) as usize;
            if seed & 0x100 != 0 {
                let n = n.min(ring.slots_available_for_use());
                ring.advance_producer(n);
            } else {
                let n = n.min(ring.in_flight());
                ring.advance_consumer(n);
            }
            assert!(ring.in_flight() <= ring.count() - 1);
            assert_eq!(ring.in_flight() + ring.slots_available_for_use(), 63);
        }
    }

    #[test]
    fn test_slot_completion() {
        let mut ring = DescRing::<AdvTxDesc>::new(64).unwrap();
        assert!(!ring.is_slot_complete(5));
        ring.desc_mut(5).complete();
        assert!(ring.is_slot_complete(5));
        ring.reset();
        assert!(!ring.is_slot_complete(5));
    }
}
