//! Transmit ring: descriptor mapping, offload contexts and completion reclaim

use alloc::vec::Vec;
use core::time::Duration;

use crate::config::{MacType, OffloadCaps};
use crate::constants::*;
use crate::dma;
use crate::error::{IgbError, IgbResult};
use crate::hw::Hw;
use crate::offload::{self, OffloadPlan, TxFlags};
use crate::packet::{TxPacket, TxRejected};
use crate::regs::{self, desc_bits::*, register_bits::*, IgbRegisters};
use crate::ring::DescRing;
use crate::types::AdvTxDesc;
use crate::{HostStack, KernelFunc, UseKernelFunc};

/// Software record of one TX slot.
///
/// Only the first slot of a packet carries the packet, its accounting and
/// `next_to_watch`, the index of the descriptor whose DD bit completes it.
#[derive(Debug, Default)]
struct TxBuffer {
    packet: Option<TxPacket>,
    next_to_watch: Option<usize>,
    time_stamp: Duration,
    bytecount: usize,
    gso_segs: u16,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TxRingStats {
    pub packets: u64,
    pub bytes: u64,
    pub restart_queue: u64,
    pub tx_busy: u64,
    pub hangs: u64,
}

/// Adapter state a reclaim pass needs.
#[derive(Debug, Clone, Copy)]
pub struct TxCleanContext {
    pub now: Duration,
    /// Speed-scaled hang timeout.
    pub timeout: Duration,
    pub link_up: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TxCleanResult {
    pub packets: usize,
    pub bytes: usize,
    /// The work limit was not exhausted.
    pub complete: bool,
    /// A hardware hang was detected; the adapter needs a reset.
    pub hang: bool,
}

pub struct TxRing {
    ring: DescRing<AdvTxDesc>,
    buffers: Vec<TxBuffer>,
    queue_index: usize,
    reg_idx: usize,
    ctx_idx: Option<u32>,
    detect_hang: bool,
    stopped: bool,
    pub stats: TxRingStats,
}

/// Data descriptors needed for `len` bytes.
#[inline]
fn txd_use_count(len: usize) -> usize {
    len.div_ceil(MAX_DATA_PER_TXD)
}

fn tx_cmd_type(flags: TxFlags) -> u32 {
    let mut cmd_type = ADVTXD_DTYP_DATA | ADVTXD_DCMD_IFCS | ADVTXD_DCMD_DEXT;
    if flags.contains(TxFlags::VLAN) {
        cmd_type |= ADVTXD_DCMD_VLE;
    }
    if flags.contains(TxFlags::TSO) {
        cmd_type |= ADVTXD_DCMD_TSE;
    }
    cmd_type
}

fn tx_olinfo_status(plan: &OffloadPlan, paylen: usize, ctx_idx: Option<u32>) -> u32 {
    let mut olinfo = (paylen as u32) << ADVTXD_PAYLEN_SHIFT;
    if plan.flags.contains(TxFlags::CSUM) {
        olinfo |= TXD_POPTS_TXSM << 8;
    }
    if plan.flags.contains(TxFlags::IPV4) {
        olinfo |= TXD_POPTS_IXSM << 8;
    }
    if let Some(idx) = ctx_idx {
        if plan.flags.intersects(TxFlags::CSUM | TxFlags::VLAN) {
            olinfo |= idx << ADVTXD_IDX_SHIFT;
        }
    }
    olinfo
}

impl TxRing {
    pub fn new(queue_index: usize, count: usize, mac_type: MacType) -> IgbResult<Self> {
        let ring = DescRing::new(count)?;
        let mut buffers = Vec::new();
        buffers
            .try_reserve_exact(count)
            .map_err(|_| IgbError::NoMemory)?;
        buffers.resize_with(count, TxBuffer::default);
        Ok(Self {
            ring,
            buffers,
            queue_index,
            reg_idx: queue_index,
            ctx_idx: mac_type.tx_ctx_idx().then_some(queue_index as u32),
            detect_hang: false,
            stopped: false,
            stats: TxRingStats::default(),
        })
    }

    pub fn queue_index(&self) -> usize {
        self.queue_index
    }

    pub fn count(&self) -> usize {
        self.ring.count()
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

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Ask the next reclaim pass to check for a stalled queue.
    pub fn arm_hang_check(&mut self) {
        self.detect_hang = true;
    }

    /// Packets handed to hardware and not yet reclaimed.
    pub fn pending(&self) -> bool {
        self.ring.in_flight() != 0
    }

    /// Program the ring base, length and thresholds, then enable the queue.
    pub fn configure(&mut self, hw: &Hw) {
        let reg = self.reg_idx;
        let dma = self.ring.dma();
        hw.write32(regs::txdctl(reg), 0);
        hw.flush();
        UseKernelFunc::busy_wait(Duration::from_millis(10));

        hw.write32(regs::tdlen(reg), self.ring.byte_len() as u32);
        hw.write32(regs::tdbal(reg), dma as u32);
        hw.write32(regs::tdbah(reg), (dma >> 32) as u32);
        hw.write32(regs::tdh(reg), 0);
        hw.write32(regs::tdt(reg), 0);

        let txdctl =
            TX_PTHRESH | TX_HTHRESH << 8 | TX_WTHRESH << 16 | TXDCTL_QUEUE_ENABLE;
        hw.write32(regs::txdctl(reg), txdctl);
        debug!(
            "igb: tx queue {} configured, {} descriptors at {:#x}",
            self.queue_index,
            self.ring.count(),
            dma
        );
    }

    /// Queue `packet` for transmission.
    ///
    /// Needs one slot per data descriptor plus [`TX_HEADROOM`]; otherwise the
    /// queue is marked stopped and the packet comes back with
    /// [`IgbError::Busy`]. The host is woken through
    /// [`HostStack::wake_queue`] once reclaim frees enough room.
    pub fn submit(
        &mut self,
        hw: &Hw,
        mut packet: TxPacket,
        caps: OffloadCaps,
    ) -> Result<(), TxRejected> {
        let reject = |error, packet| Err(TxRejected { error, packet });

        let segments = packet.segments().iter().filter(|s| !s.is_empty()).count();
        if segments == 0 {
            return reject(IgbError::MalformedPacket, packet);
        }
        if segments > MAX_SKB_FRAGS + 1 {
            return reject(IgbError::TooManySegments(segments), packet);
        }
        let count: usize = packet.segments().iter().map(|s| txd_use_count(s.len())).sum();
        if self.ring.slots_available_for_use() < count + TX_HEADROOM {
            self.stopped = true;
            self.stats.tx_busy += 1;
            debug!(
                "igb: tx queue {} busy, need {} have {}",
                self.queue_index,
                count + TX_HEADROOM,
                self.ring.slots_available_for_use()
            );
            return reject(IgbError::Busy, packet);
        }

        let plan = match offload::plan(&mut packet, caps, self.ctx_idx) {
            Ok(plan) => plan,
            Err(error) => return reject(error, packet),
        };

        let first = self.ring.next_to_use;
        let mut i = first;
        if let Some(ctx) = plan.context {
            self.ring
                .desc_mut(i)
                .context()
                .set(ctx.vlan_macip_lens, ctx.type_tucmd_mlhl, ctx.mss_l4len_idx);
            i = self.ring.next(i);
        }

        let cmd_type = tx_cmd_type(plan.flags);
        let mut olinfo = tx_olinfo_status(&plan, plan.paylen(packet.len()), self.ctx_idx);
        let mut remaining = count;
        for seg in packet.segments().iter().filter(|s| !s.is_empty()) {
            let mut dma = dma::map_to_device(seg);
            let mut size = seg.len();
            loop {
                let chunk = size.min(MAX_DATA_PER_TXD);
                remaining -= 1;
                let mut cmd = cmd_type | chunk as u32;
                if remaining == 0 {
                    cmd |= TXD_DCMD;
                }
                self.ring
                    .desc_mut(i)
                    .read()
                    .set_buffer_addr(dma)
                    .set_cmd_type_len(cmd)
                    .set_olinfo_status(olinfo);
                olinfo = 0;
                size -= chunk;
                dma += chunk as u64;
                if remaining == 0 {
                    break;
                }
                i = self.ring.next(i);
                if size == 0 {
                    break;
                }
            }
        }
        let last = i;

        let first_buffer = &mut self.buffers[first];
        first_buffer.time_stamp = UseKernelFunc::monotonic_time();
        first_buffer.bytecount = plan.bytecount;
        first_buffer.gso_segs = plan.gso_segs;
        first_buffer.packet = Some(packet);

        // Descriptors must be visible before the tail moves.
        self.ring.sync_for_device();
        first_buffer.next_to_watch = Some(last);
        self.ring.next_to_use = self.ring.next(last);
        hw.write32(regs::tdt(self.reg_idx), self.ring.next_to_use as u32);
        Ok(())
    }

    /// Release packets hardware has finished with, up to `budget` of them.
    pub fn reclaim_completed<S: HostStack>(
        &mut self,
        hw: &Hw,
        budget: usize,
        ctx: &TxCleanContext,
        stack: &mut S,
    ) -> TxCleanResult {
        let mut result = TxCleanResult {
            complete: true,
            ..Default::default()
        };

        let mut i = self.ring.next_to_clean;
        let mut budget = budget;
        while budget > 0 {
            let Some(eop) = self.buffers[i].next_to_watch else {
                break;
            };
            if !self.ring.is_slot_complete(eop) {
                break;
            }
            let buffer = &mut self.buffers[i];
            buffer.next_to_watch = None;
            result.bytes += buffer.bytecount;
            result.packets += buffer.gso_segs as usize;
            if let Some(packet) = buffer.packet.take() {
                stack.packet_sent(packet);
            }
            i = self.ring.next(eop);
            budget -= 1;
        }
        self.ring.next_to_clean = i;
        self.stats.bytes += result.bytes as u64;
        self.stats.packets += result.packets as u64;
        result.complete = budget > 0;

        if self.detect_hang {
            self.detect_hang = false;
            let buffer = &self.buffers[i];
            if buffer.next_to_watch.is_some()
                && ctx.link_up
                && ctx.now > buffer.time_stamp + ctx.timeout
                && hw.read(IgbRegisters::Status) & STATUS_TXOFF == 0
            {
                error!(
                    "igb: detected Tx unit hang on queue {}: TDH {:#x} TDT {:#x} ntu {} ntc {}",
                    self.queue_index,
                    hw.read32(regs::tdh(self.reg_idx)),
                    hw.read32(regs::tdt(self.reg_idx)),
                    self.ring.next_to_use,
                    self.ring.next_to_clean
                );
                self.stats.hangs += 1;
                self.stopped = true;
                stack.stop_queue(self.queue_index);
                result.hang = true;
                result.complete = true;
                return result;
            }
        }

        if result.packets > 0
            && ctx.link_up
            && self.stopped
            && self.ring.slots_available_for_use() >= TX_WAKE_THRESHOLD
        {
            self.stopped = false;
            self.stats.restart_queue += 1;
            stack.wake_queue(self.queue_index);
        }
        result
    }

    /// Drop every in-flight packet and rewind the ring.
    pub fn clean(&mut self) {
        let mut dropped = 0;
        for buffer in self.buffers.iter_mut() {
            if buffer.packet.take().is_some() {
                dropped += 1;
            }
            *buffer = TxBuffer::default();
        }
        self.ring.reset();
        self.stopped = false;
        self.detect_hang = false;
        if dropped > 0 {
            debug!("igb: tx queue {} dropped {} pending packets", self.queue_index, dropped);
        }
    }
}

#[cfg(test)]
impl TxRing {
    /// Hardware side: write back every packet handed over so far.
    pub(crate) fn complete_all(&mut self) {
        let mut i = self.ring.next_to_clean;
        while i != self.ring.next_to_use {
            if let Some(eop) = self.buffers[i].next_to_watch {
                self.ring.desc_mut(eop).complete();
                i = eop;
            }
            i = self.ring.next(i);
        }
    }

    fn desc(&mut self, i: usize) -> &mut AdvTxDesc {
        self.ring.desc_mut(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, ipv4_tcp_frame, FakeRegs, TestStack};
    use crate::packet::{ChecksumDemand, TxOffload};

    const CAPS: OffloadCaps = OffloadCaps::TX_CSUM.union(OffloadCaps::TSO);

    fn ring(count: usize) -> (FakeRegs, Hw, TxRing) {
        let regs = FakeRegs::new();
        let hw = Hw::new(regs.base());
        let ring = TxRing::new(0, count, MacType::I350).unwrap();
        (regs, hw, ring)
    }

    fn ctx() -> TxCleanContext {
        TxCleanContext {
            now: UseKernelFunc::monotonic_time(),
            timeout: TX_HANG_TIMEOUT,
            link_up: true,
        }
    }

    #[test]
    fn test_plain_packet_single_descriptor() {
        let (regs, hw, mut tx) = ring(64);
        tx.submit(&hw, TxPacket::new(vec![0xAA; 64]), CAPS).unwrap();
        assert_eq!(tx.next_to_use(), 1);
        assert_eq!(regs.get(regs::tdt(0)), 1);
        let desc = tx.desc(0);
        let read = desc.read();
        assert_eq!(
            read.cmd_type_len(),
            ADVTXD_DTYP_DATA | ADVTXD_DCMD_IFCS | ADVTXD_DCMD_DEXT | TXD_DCMD | 64
        );
        assert_eq!(read.olinfo_status(), 64 << ADVTXD_PAYLEN_SHIFT);
        assert_eq!(tx.buffers[0].next_to_watch, Some(0));
    }

    #[test]
    fn test_tso_context_and_data_descriptors() {
        let (_regs, hw, mut tx) = ring(64);
        let frame = ipv4_tcp_frame(9000);
        let head = frame[..54].to_vec();
        let body = frame[54..].to_vec();
        let packet = TxPacket::from_segments(vec![head, body]).with_offload(TxOffload {
            tso_mss: Some(1460),
            ..Default::default()
        });
        tx.submit(&hw, packet, CAPS).unwrap();
        // context + header + payload
        assert_eq!(tx.next_to_use(), 3);
        assert_eq!(tx.desc(0).context().mss_l4len_idx() >> ADVTXD_MSS_SHIFT, 1460);
        let mut total = 0;
        for i in 1..3 {
            let cmd = tx.desc(i).read().cmd_type_len();
            assert_ne!(cmd & ADVTXD_DCMD_TSE, 0);
            total += (cmd & ADVTXD_LEN_MASK) as usize;
        }
        assert_eq!(total, 9054);
        let olinfo = tx.desc(1).read().olinfo_status();
        assert_eq!(olinfo >> ADVTXD_PAYLEN_SHIFT, 9000);
        assert_ne!(olinfo & (TXD_POPTS_TXSM << 8), 0);
        assert_ne!(tx.desc(2).read().cmd_type_len() & ADVTXD_DCMD_EOP, 0);
        assert_eq!(tx.buffers[0].gso_segs, 7);
        assert_eq!(tx.buffers[0].bytecount, 9054 + 6 * 54);
        assert_eq!(tx.buffers[0].next_to_watch, Some(2));
    }

    #[test]
    fn test_unsegmentable_tso_comes_back_untouched() {
        let (regs, hw, mut tx) = ring(64);
        let mut frame = ipv4_tcp_frame(5000);
        frame[46] = 0x40;
        let head = frame[..50].to_vec();
        let packet = TxPacket::from_segments(vec![head.clone(), frame[50..].to_vec()])
            .with_offload(TxOffload {
                tso_mss: Some(1460),
                ..Default::default()
            });
        let rejected = tx.submit(&hw, packet, CAPS).unwrap_err();
        assert_eq!(rejected.error, IgbError::MalformedPacket);
        assert_eq!(rejected.packet.segments()[0], head);
        assert_eq!(tx.next_to_use(), 0);
        assert_eq!(regs.get(regs::tdt(0)), 0);
        assert!(!tx.stopped);
    }

    #[test]
    fn test_large_segment_is_split() {
        let (_regs, hw, mut tx) = ring(64);
        let packet = TxPacket::new(vec![0; MAX_DATA_PER_TXD * 2 + 100]);
        tx.submit(&hw, packet, CAPS).unwrap();
        assert_eq!(tx.next_to_use(), 3);
        let base = tx.desc(0).read().buffer_addr();
        assert_eq!(tx.desc(1).read().buffer_addr(), base + MAX_DATA_PER_TXD as u64);
        assert_eq!(tx.desc(2).read().buffer_addr(), base + 2 * MAX_DATA_PER_TXD as u64);
        assert_eq!(tx.desc(2).read().cmd_type_len() & ADVTXD_LEN_MASK, 100);
        assert_eq!(tx.desc(1).read().cmd_type_len() & ADVTXD_DCMD_EOP, 0);
        assert_eq!(tx.desc(1).read().olinfo_status(), 0);
    }

    #[test]
    fn test_checksum_only_emits_context() {
        let (_regs, hw, mut tx) = ring(64);
        let packet = TxPacket::new(ipv4_tcp_frame(100)).with_offload(TxOffload {
            checksum: ChecksumDemand::TCP,
            ..Default::default()
        });
        tx.submit(&hw, packet, CAPS).unwrap();
        assert_eq!(tx.next_to_use(), 2);
        assert_eq!(tx.desc(1).read().cmd_type_len() & ADVTXD_DCMD_TSE, 0);
    }

    #[test]
    fn test_busy_only_when_really_full() {
        let (_regs, hw, mut tx) = ring(64);
        let mut sent = 0;
        loop {
            let room = tx.slots_available_for_use();
            match tx.submit(&hw, TxPacket::new(vec![1; 60]), CAPS) {
                Ok(()) => {
                    assert!(room >= 1 + TX_HEADROOM);
                    sent += 1;
                }
                Err(rejected) => {
                    assert_eq!(rejected.error, IgbError::Busy);
                    assert!(room < 1 + TX_HEADROOM);
                    assert_eq!(rejected.packet.len(), 60);
                    break;
                }
            }
        }
        assert_eq!(sent, 60);
        assert!(tx.is_stopped());
        assert_eq!(tx.stats.tx_busy, 1);
    }

    #[test]
    fn test_every_packet_reclaimed_once() {
        let (_regs, hw, mut tx) = ring(64);
        let mut stack = TestStack::default();
        for round in 0..10u8 {
            for n in 0..5u8 {
                let packet = TxPacket::from_segments(vec![vec![round; 30], vec![n; 40]]);
                tx.submit(&hw, packet, CAPS).unwrap();
            }
            tx.complete_all();
            let result = tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack);
            assert_eq!(result.packets, 5);
            assert_eq!(result.bytes, 5 * 70);
            assert!(!tx.pending());
        }
        assert_eq!(stack.sent.len(), 50);
        assert_eq!(tx.stats.packets, 50);
        assert_eq!(tx.stats.bytes, 50 * 70);
    }

    #[test]
    fn test_reclaim_without_completions_is_idempotent() {
        let (_regs, hw, mut tx) = ring(64);
        let mut stack = TestStack::default();
        tx.submit(&hw, TxPacket::new(vec![1; 100]), CAPS).unwrap();
        let before = (tx.next_to_use(), tx.next_to_clean(), tx.stats.packets, tx.stats.bytes);
        for _ in 0..3 {
            let result = tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack);
            assert_eq!(result.packets, 0);
            assert!(result.complete);
        }
        let after = (tx.next_to_use(), tx.next_to_clean(), tx.stats.packets, tx.stats.bytes);
        assert_eq!(before, after);
        assert!(stack.sent.is_empty());
    }

    #[test]
    fn test_reclaim_respects_budget() {
        let (_regs, hw, mut tx) = ring(64);
        let mut stack = TestStack::default();
        for _ in 0..4 {
            tx.submit(&hw, TxPacket::new(vec![1; 100]), CAPS).unwrap();
        }
        tx.complete_all();
        let result = tx.reclaim_completed(&hw, 3, &ctx(), &mut stack);
        assert_eq!(result.packets, 3);
        assert!(!result.complete);
        let result = tx.reclaim_completed(&hw, 3, &ctx(), &mut stack);
        assert_eq!(result.packets, 1);
        assert!(result.complete);
    }

    #[test]
    fn test_wake_after_busy() {
        let (_regs, hw, mut tx) = ring(64);
        let mut stack = TestStack::default();
        while tx.submit(&hw, TxPacket::new(vec![1; 60]), CAPS).is_ok() {}
        assert!(tx.is_stopped());
        tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack);
        // a full ring is not a hang
        assert!(stack.stopped.is_empty());
        tx.complete_all();
        tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack);
        assert!(!tx.is_stopped());
        assert_eq!(stack.woken, vec![0]);
        assert_eq!(tx.stats.restart_queue, 1);
    }

    #[test]
    fn test_hang_detection() {
        let (regs, hw, mut tx) = ring(64);
        let mut stack = TestStack::default();
        tx.submit(&hw, TxPacket::new(vec![1; 100]), CAPS).unwrap();

        // not armed: no check even when overdue
        mock::advance_time(Duration::from_secs(5));
        assert!(!tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack).hang);

        // armed, but hardware paused by flow control
        regs.set(IgbRegisters::Status.offset(), STATUS_TXOFF);
        tx.arm_hang_check();
        assert!(!tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack).hang);

        regs.set(IgbRegisters::Status.offset(), STATUS_LU);
        tx.arm_hang_check();
        let result = tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack);
        assert!(result.hang);
        assert_eq!(stack.stopped, vec![0]);
        assert_eq!(tx.stats.hangs, 1);

        // the flag is consumed by the check
        assert!(!tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack).hang);
    }

    #[test]
    fn test_no_hang_within_timeout_or_link_down() {
        let (_regs, hw, mut tx) = ring(64);
        let mut stack = TestStack::default();
        tx.submit(&hw, TxPacket::new(vec![1; 100]), CAPS).unwrap();
        mock::advance_time(Duration::from_millis(500));
        tx.arm_hang_check();
        assert!(!tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &ctx(), &mut stack).hang);
        mock::advance_time(Duration::from_secs(2));
        tx.arm_hang_check();
        let link_down = TxCleanContext {
            link_up: false,
            ..ctx()
        };
        assert!(!tx.reclaim_completed(&hw, DEFAULT_TX_WORK, &link_down, &mut stack).hang);
    }

    #[test]
    fn test_clean_drops_pending() {
        let (_regs, hw, mut tx) = ring(64);
        tx.submit(&hw, TxPacket::new(vec![1; 100]), CAPS).unwrap();
        tx.clean();
        assert_eq!(tx.next_to_use(), 0);
        assert!(!tx.pending());
        assert!(tx.buffers.iter().all(|b| b.packet.is_none()));
    }

    #[test]
    fn test_configure_programs_ring() {
        let (regs, hw, mut tx) = ring(128);
        tx.configure(&hw);
        assert_eq!(regs.get(regs::tdlen(0)), 128 * 16);
        assert_eq!(regs.get(regs::tdbal(0)), tx.ring.dma() as u32);
        assert_ne!(regs.get(regs::txdctl(0)) & TXDCTL_QUEUE_ENABLE, 0);
    }

    #[test]
    fn test_82575_context_index() {
        let regs = FakeRegs::new();
        let hw = Hw::new(regs.base());
        let mut tx = TxRing::new(1, 64, MacType::I82575).unwrap();
        let packet = TxPacket::new(ipv4_tcp_frame(100)).with_offload(TxOffload {
            checksum: ChecksumDemand::TCP,
            ..Default::default()
        });
        tx.submit(&hw, packet, CAPS).unwrap();
        assert_eq!(tx.desc(0).context().mss_l4len_idx() & 0xF0, 1 << 4);
        assert_eq!(tx.desc(1).read().olinfo_status() & 0xF0, 1 << 4);
    }
}
