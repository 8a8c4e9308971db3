//! Receive ring: frame harvesting, reassembly, metadata and refill

use alloc::vec::Vec;
use core::mem;

use crate::config::{MacType, OffloadCaps};
use crate::constants::*;
use crate::error::{IgbError, IgbResult};
use crate::hw::Hw;
use crate::offload;
use crate::packet::{RxChecksum, RxFrag, RxPacket};
use crate::page::{PageRecycler, RxBuffer};
use crate::regs::{self, desc_bits::*, register_bits::*};
use crate::ring::DescRing;
use crate::types::AdvRxDesc;
use crate::HostStack;

#[derive(Debug, Default, Clone, Copy)]
pub struct RxRingStats {
    pub packets: u64,
    pub bytes: u64,
    pub csum_err: u64,
    /// Header buffer allocations refused by the host.
    pub alloc_failed: u64,
    /// Frames dropped for CRC, symbol, sequence or length errors.
    pub input_errors: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RxPollResult {
    pub packets: usize,
    pub bytes: usize,
    /// Fewer frames than the budget were found.
    pub complete: bool,
}

/// Writeback fields of a completed descriptor, read once after DD.
#[derive(Debug, Clone, Copy)]
struct RxWriteback {
    length: usize,
    status_error: u32,
    vlan: u16,
    rss_hash: u32,
}

impl RxWriteback {
    #[inline]
    fn test(&self, bits: u32) -> bool {
        self.status_error & bits != 0
    }
}

pub struct RxRing {
    ring: DescRing<AdvRxDesc>,
    buffers: Vec<RxBuffer>,
    pool: PageRecycler,
    queue_index: usize,
    reg_idx: usize,
    /// Frame still waiting for its end-of-packet descriptor.
    skb: Option<RxPacket>,
    sctp_csum_errata: bool,
    lb_vlan_bswap: bool,
    rx_buffer_write: usize,
    pub stats: RxRingStats,
}

impl RxRing {
    pub fn new(
        queue_index: usize,
        count: usize,
        mac_type: MacType,
        rx_buffer_write: usize,
    ) -> IgbResult<Self> {
        let ring = DescRing::new(count)?;
        let mut buffers = Vec::new();
        buffers
            .try_reserve_exact(count)
            .map_err(|_| IgbError::NoMemory)?;
        buffers.resize_with(count, RxBuffer::default);
        Ok(Self {
            ring,
            buffers,
            pool: PageRecycler::default(),
            queue_index,
            reg_idx: queue_index,
            skb: None,
            sctp_csum_errata: mac_type.rx_sctp_csum_errata(),
            lb_vlan_bswap: mac_type.rx_lb_vlan_bswap(),
            rx_buffer_write,
            stats: RxRingStats::default(),
        })
    }

    pub fn queue_index(&self) -> usize {
        self.queue_index
    }

    pub fn next_to_use(&self) -> usize {
        self.ring.next_to_use
    }

    pub fn next_to_clean(&self) -> usize {
        self.ring.next_to_clean
    }

    pub fn slots_available_for_use(&self) -> usize {
        self.ring.slots_available_for_use()
    }

    pub fn pool(&self) -> &PageRecycler {
        &self.pool
    }

    /// Header and page allocation failures together.
    pub fn alloc_failed(&self) -> u64 {
        self.stats.alloc_failed + self.pool.alloc_failed
    }

    /// Program the ring registers, enable the queue and post buffers.
    pub fn configure(&mut self, hw: &Hw, drop_en: bool) {
        let reg = self.reg_idx;
        let dma = self.ring.dma();
        hw.write32(regs::rxdctl(reg), 0);

        hw.write32(regs::rdbal(reg), dma as u32);
        hw.write32(regs::rdbah(reg), (dma >> 32) as u32);
        hw.write32(regs::rdlen(reg), self.ring.byte_len() as u32);
        hw.write32(regs::rdh(reg), 0);
        hw.write32(regs::rdt(reg), 0);

        let mut srrctl = (RX_HDR_LEN as u32) << SRRCTL_BSIZEHDRSIZE_SHIFT
            | (RX_BUFSZ as u32) >> SRRCTL_BSIZEPKT_SHIFT
            | SRRCTL_DESCTYPE_ADV_ONEBUF;
        if drop_en {
            srrctl |= SRRCTL_DROP_EN;
        }
        hw.write32(regs::srrctl(reg), srrctl);

        let rxdctl = RX_PTHRESH | RX_HTHRESH << 8 | RX_WTHRESH << 16 | RXDCTL_QUEUE_ENABLE;
        hw.write32(regs::rxdctl(reg), rxdctl);

        let unused = self.ring.slots_available_for_use();
        self.alloc_rx_buffers(hw, unused);
        debug!(
            "igb: rx queue {} configured, {} buffers posted",
            self.queue_index,
            self.ring.in_flight()
        );
    }

    /// Post up to `cleaned_count` buffers starting at `next_to_use`.
    ///
    /// Stops early when a page cannot be allocated; the remaining slots are
    /// retried on the next pass. The tail register is only written when at
    /// least one descriptor was posted.
    pub fn alloc_rx_buffers(&mut self, hw: &Hw, cleaned_count: usize) {
        let mut i = self.ring.next_to_use;
        for _ in 0..cleaned_count {
            if self.pool.acquire_page(&mut self.buffers[i]).is_err() {
                debug!("igb: rx queue {} page allocation failed", self.queue_index);
                break;
            }
            let Some(dma) = self.buffers[i].dma_addr() else {
                break;
            };
            self.ring
                .desc_mut(i)
                .read()
                .set_pkt_addr(dma)
                .set_hdr_addr(0);
            i = self.ring.next(i);
        }

        if self.ring.next_to_use != i {
            // the slot past the tail may still hold an old writeback
            self.ring.desc_mut(i).read().set_hdr_addr(0);
            self.ring.next_to_use = i;
            self.ring.next_to_alloc = i;
            self.ring.sync_for_device();
            hw.write32(regs::rdt(self.reg_idx), i as u32);
        }
    }

    /// Harvest up to `budget` completed frames and hand them to `stack`.
    pub fn poll<S: HostStack>(
        &mut self,
        hw: &Hw,
        budget: usize,
        caps: OffloadCaps,
        stack: &mut S,
    ) -> RxPollResult {
        let mut result = RxPollResult::default();
        let mut skb = self.skb.take();
        let mut cleaned_count = self.ring.slots_available_for_use();

        while result.packets < budget {
            if cleaned_count >= self.rx_buffer_write {
                self.alloc_rx_buffers(hw, cleaned_count);
                cleaned_count = 0;
            }

            let ntc = self.ring.next_to_clean;
            if !self.ring.is_slot_complete(ntc) {
                break;
            }
            let wb = {
                let desc = self.ring.desc(ntc).wb();
                RxWriteback {
                    length: desc.length() as usize,
                    status_error: desc.status_error(),
                    vlan: desc.vlan_raw(),
                    rss_hash: desc.rss_hash(),
                }
            };

            let mut packet = match skb.take() {
                Some(packet) => packet,
                None => match stack.alloc_rx_buffer(RX_HDR_LEN) {
                    Some(head) => RxPacket::new(head),
                    None => {
                        self.stats.alloc_failed += 1;
                        break;
                    }
                },
            };
            if !self.fetch_rx_buffer(ntc, wb.length, &mut packet) {
                if !packet.is_empty() {
                    skb = Some(packet);
                }
                break;
            }
            cleaned_count += 1;
            self.ring.advance_consumer(1);

            if !wb.test(RXD_STAT_EOP) {
                skb = Some(packet);
                continue;
            }

            if self.cleanup_headers(&wb, &mut packet) {
                continue;
            }

            result.bytes += packet.len();
            self.process_skb_fields(&wb, &mut packet, caps);
            stack.deliver(packet);
            result.packets += 1;
        }

        self.skb = skb;
        self.stats.packets += result.packets as u64;
        self.stats.bytes += result.bytes as u64;

        if cleaned_count > 0 {
            self.alloc_rx_buffers(hw, cleaned_count);
        }
        result.complete = result.packets < budget;
        result
    }

    /// Move the data of slot `ntc` into `packet`, recycling the page if possible.
    ///
    /// Returns false, leaving the slot alone, when no buffer was ever posted there.
    fn fetch_rx_buffer(&mut self, ntc: usize, size: usize, packet: &mut RxPacket) -> bool {
        if self.buffers[ntc].page.is_none() {
            warn!("igb: rx queue {} slot {} completed without a buffer", self.queue_index, ntc);
            return false;
        }
        let mut buffer = mem::take(&mut self.buffers[ntc]);
        let offset = buffer.page_offset;
        let Some(page) = buffer.page.as_ref() else {
            return false;
        };
        let size = size.min(RX_BUFSZ);
        page.sync_for_cpu(offset, RX_BUFSZ);

        let keep = if packet.frags().is_empty() && size <= RX_HDR_LEN {
            packet.head_mut().extend_from_slice(page.data(offset, size));
            self.pool.keep_after_copy(&buffer)
        } else {
            let pull = if packet.frags().is_empty() {
                let pull = offload::header_len(page.data(offset, size), RX_HDR_LEN);
                packet.head_mut().extend_from_slice(page.data(offset, pull));
                pull
            } else {
                0
            };
            let reused = self.pool.try_reuse(&mut buffer);
            let frag_page = if reused {
                buffer.page.clone()
            } else {
                self.pool.release(&mut buffer)
            };
            if let Some(frag_page) = frag_page {
                if size > pull {
                    packet.push_frag(RxFrag::new(frag_page, offset + pull, size - pull));
                }
            }
            reused
        };

        if keep {
            self.reuse_rx_page(buffer);
        } else {
            self.pool.release(&mut buffer);
        }
        true
    }

    /// Hand a recycled buffer back at `next_to_alloc`.
    fn reuse_rx_page(&mut self, buffer: RxBuffer) {
        let nta = self.ring.next_to_alloc;
        self.buffers[nta] = buffer;
        self.ring.next_to_alloc = self.ring.next(nta);
    }

    /// Drop errored frames and pad runts. Returns true if the frame was dropped.
    fn cleanup_headers(&mut self, wb: &RxWriteback, packet: &mut RxPacket) -> bool {
        if wb.test(RXDEXT_ERR_FRAME_ERR_MASK) {
            self.stats.input_errors += 1;
            return true;
        }
        if packet.len() < ETH_ZLEN && packet.frags().is_empty() {
            packet.head_mut().resize(ETH_ZLEN, 0);
        }
        false
    }

    fn process_skb_fields(&mut self, wb: &RxWriteback, packet: &mut RxPacket, caps: OffloadCaps) {
        if caps.contains(OffloadCaps::RX_HASH) {
            packet.meta.rss_hash = Some(wb.rss_hash);
        }
        packet.meta.checksum = self.rx_checksum(wb, packet.len(), caps);
        if caps.contains(OffloadCaps::VLAN_RX) && wb.test(RXD_STAT_VP) {
            let vid = if wb.test(RXDEXT_STATERR_LB) && self.lb_vlan_bswap {
                wb.vlan.swap_bytes()
            } else {
                wb.vlan
            };
            packet.meta.vlan_tag = Some(vid);
        }
    }

    fn rx_checksum(&mut self, wb: &RxWriteback, len: usize, caps: OffloadCaps) -> RxChecksum {
        if wb.test(RXD_STAT_IXSM) || !caps.contains(OffloadCaps::RX_CSUM) {
            return RxChecksum::empty();
        }
        if wb.test(RXDEXT_STATERR_TCPE | RXDEXT_STATERR_IPE) {
            // Hardware errata: 60-byte SCTP frames get a bogus L4 error
            // flagged. Leave those to the stack without counting them.
            if !(len == ETH_ZLEN && self.sctp_csum_errata) {
                self.stats.csum_err += 1;
            }
            return RxChecksum::empty();
        }
        let mut checksum = RxChecksum::empty();
        if wb.test(RXD_STAT_IPCS) {
            checksum |= RxChecksum::IP_OK;
        }
        if wb.test(RXD_STAT_TCPCS) {
            checksum |= RxChecksum::TCP_OK;
        }
        if wb.test(RXD_STAT_UDPCS) {
            checksum |= RxChecksum::UDP_OK;
        }
        checksum
    }

    /// Release every buffer and any partial frame, then rewind the ring.
    pub fn clean(&mut self) {
        self.skb = None;
        for buffer in self.buffers.iter_mut() {
            self.pool.release(buffer);
        }
        self.ring.reset();
    }
}

#[cfg(test)]
impl RxRing {
    /// Hardware side: DMA `data` into slot `slot` and write it back.
    pub(crate) fn hw_write(&mut self, slot: usize, data: &[u8], status_error: u32, vlan: u16, rss: u32) {
        let addr = self.ring.desc_mut(slot).read().pkt_addr();
        assert_ne!(addr, 0, "slot {slot} not posted");
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len()) };
        self.ring
            .desc_mut(slot)
            .write_back(data.len() as u16, status_error | RXD_STAT_DD, vlan, rss);
    }

    /// Hardware side: receive `frame` starting at `*head`, split over as many
    /// buffers as needed. Returns the descriptors used.
    pub(crate) fn hw_receive(&mut self, head: &mut usize, frame: &[u8], status_error: u32) -> usize {
        let chunks: Vec<&[u8]> = frame.chunks(RX_BUFSZ).collect();
        let n = chunks.len();
        for (k, chunk) in chunks.into_iter().enumerate() {
            let status = if k + 1 == n { status_error | RXD_STAT_EOP } else { 0 };
            self.hw_write(*head, chunk, status, 0, 0);
            *head = self.ring.next(*head);
        }
        n
    }

    pub(crate) fn posted_addr(&mut self, slot: usize) -> u64 {
        self.ring.desc_mut(slot).read().pkt_addr()
    }
}
