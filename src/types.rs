//! Advanced descriptor layouts
//!
//! Every descriptor is one 16-byte slot that software fills in "read" format
//! and hardware overwrites in "writeback" format. Each format is exposed as a
//! view borrowing the raw slot, with fields addressed by explicit byte offset:
//!
//! ```text
//! TX read      | buffer_addr (0..8)  | cmd_type_len (8..12)   | olinfo_status (12..16)
//! TX context   | vlan_macip_lens (0..4) | seqnum_seed (4..8) | type_tucmd_mlhl (8..12) | mss_l4len_idx (12..16)
//! TX writeback | reserved (0..8)     | nxtseq_seed (8..12)    | status (12..16)
//! RX read      | pkt_addr (0..8)     | hdr_addr (8..16)
//! RX writeback | pkt_info (0..2) | hdr_info (2..4) | rss_hash (4..8) | status_error (8..12) | length (12..14) | vlan (14..16)
//! ```

use core::ptr::{read_volatile, write_volatile};

use crate::constants::DESC_SIZE;
use crate::regs::desc_bits::{RXD_STAT_DD, TXD_STAT_DD};

/// One raw hardware descriptor slot.
#[repr(C, align(16))]
pub struct RawDesc {
    bytes: [u8; DESC_SIZE],
}

const _: () = assert!(core::mem::size_of::<RawDesc>() == DESC_SIZE);
const _: () = assert!(core::mem::align_of::<RawDesc>() == DESC_SIZE);

impl RawDesc {
    #[inline]
    fn read_u16(&self, off: usize) -> u16 {
        debug_assert!(off % 2 == 0 && off + 2 <= DESC_SIZE);
        u16::from_le(unsafe { read_volatile(self.bytes.as_ptr().add(off) as *const u16) })
    }

    #[inline]
    fn read_u32(&self, off: usize) -> u32 {
        debug_assert!(off % 4 == 0 && off + 4 <= DESC_SIZE);
        u32::from_le(unsafe { read_volatile(self.bytes.as_ptr().add(off) as *const u32) })
    }

    #[inline]
    fn read_u64(&self, off: usize) -> u64 {
        debug_assert!(off % 8 == 0 && off + 8 <= DESC_SIZE);
        u64::from_le(unsafe { read_volatile(self.bytes.as_ptr().add(off) as *const u64) })
    }

    #[inline]
    fn write_u16(&mut self, off: usize, val: u16) {
        debug_assert!(off % 2 == 0 && off + 2 <= DESC_SIZE);
        unsafe { write_volatile(self.bytes.as_mut_ptr().add(off) as *mut u16, val.to_le()) }
    }

    #[inline]
    fn write_u32(&mut self, off: usize, val: u32) {
        debug_assert!(off % 4 == 0 && off + 4 <= DESC_SIZE);
        unsafe { write_volatile(self.bytes.as_mut_ptr().add(off) as *mut u32, val.to_le()) }
    }

    #[inline]
    fn write_u64(&mut self, off: usize, val: u64) {
        debug_assert!(off % 8 == 0 && off + 8 <= DESC_SIZE);
        unsafe { write_volatile(self.bytes.as_mut_ptr().add(off) as *mut u64, val.to_le()) }
    }

    pub fn clear(&mut self) {
        self.write_u64(0, 0);
        self.write_u64(8, 0);
    }
}

/// A descriptor layout living in a ring.
pub trait Descriptor {
    /// Hardware has written this slot back.
    fn is_done(&self) -> bool;

    fn raw(&self) -> &RawDesc;

    fn raw_mut(&mut self) -> &mut RawDesc;
}

/// Advanced transmit descriptor.
#[repr(transparent)]
pub struct AdvTxDesc(RawDesc);

const _: () = assert!(core::mem::size_of::<AdvTxDesc>() == DESC_SIZE);

impl Descriptor for AdvTxDesc {
    #[inline]
    fn is_done(&self) -> bool {
        self.wb().status() & TXD_STAT_DD != 0
    }

    fn raw(&self) -> &RawDesc {
        &self.0
    }

    fn raw_mut(&mut self) -> &mut RawDesc {
        &mut self.0
    }
}

impl AdvTxDesc {
    pub fn read(&mut self) -> TxReadView<'_> {
        TxReadView(&mut self.0)
    }

    pub fn context(&mut self) -> TxContextView<'_> {
        TxContextView(&mut self.0)
    }

    pub fn wb(&self) -> TxWritebackView<'_> {
        TxWritebackView(&self.0)
    }
}

/// Data descriptor as written by software.
pub struct TxReadView<'a>(&'a mut RawDesc);

impl TxReadView<'_> {
    const BUFFER_ADDR: usize = 0;
    const CMD_TYPE_LEN: usize = 8;
    const OLINFO_STATUS: usize = 12;

    pub fn set_buffer_addr(&mut self, addr: u64) -> &mut Self {
        self.0.write_u64(Self::BUFFER_ADDR, addr);
        self
    }

    pub fn set_cmd_type_len(&mut self, val: u32) -> &mut Self {
        self.0.write_u32(Self::CMD_TYPE_LEN, val);
        self
    }

    pub fn set_olinfo_status(&mut self, val: u32) -> &mut Self {
        self.0.write_u32(Self::OLINFO_STATUS, val);
        self
    }

    pub fn buffer_addr(&self) -> u64 {
        self.0.read_u64(Self::BUFFER_ADDR)
    }

    pub fn cmd_type_len(&self) -> u32 {
        self.0.read_u32(Self::CMD_TYPE_LEN)
    }

    pub fn olinfo_status(&self) -> u32 {
        self.0.read_u32(Self::OLINFO_STATUS)
    }
}

/// Context descriptor carrying offload parameters.
pub struct TxContextView<'a>(&'a mut RawDesc);

impl TxContextView<'_> {
    const VLAN_MACIP_LENS: usize = 0;
    const SEQNUM_SEED: usize = 4;
    const TYPE_TUCMD_MLHL: usize = 8;
    const MSS_L4LEN_IDX: usize = 12;

    pub fn set(&mut self, vlan_macip_lens: u32, type_tucmd_mlhl: u32, mss_l4len_idx: u32) {
        self.0.write_u32(Self::VLAN_MACIP_LENS, vlan_macip_lens);
        self.0.write_u32(Self::SEQNUM_SEED, 0);
        self.0.write_u32(Self::TYPE_TUCMD_MLHL, type_tucmd_mlhl);
        self.0.write_u32(Self::MSS_L4LEN_IDX, mss_l4len_idx);
    }

    pub fn vlan_macip_lens(&self) -> u32 {
        self.0.read_u32(Self::VLAN_MACIP_LENS)
    }

    pub fn type_tucmd_mlhl(&self) -> u32 {
        self.0.read_u32(Self::TYPE_TUCMD_MLHL)
    }

    pub fn mss_l4len_idx(&self) -> u32 {
        self.0.read_u32(Self::MSS_L4LEN_IDX)
    }
}

/// Completion status written by hardware.
pub struct TxWritebackView<'a>(&'a RawDesc);

impl TxWritebackView<'_> {
    const NXTSEQ_SEED: usize = 8;
    const STATUS: usize = 12;

    pub fn status(&self) -> u32 {
        self.0.read_u32(Self::STATUS)
    }

    pub fn nxtseq_seed(&self) -> u32 {
        self.0.read_u32(Self::NXTSEQ_SEED)
    }
}

#[cfg(test)]
impl AdvTxDesc {
    /// Hardware side of a TX completion.
    pub(crate) fn complete(&mut self) {
        self.0.write_u32(TxWritebackView::STATUS, TXD_STAT_DD);
    }
}

/// Advanced receive descriptor.
#[repr(transparent)]
pub struct AdvRxDesc(RawDesc);

const _: () = assert!(core::mem::size_of::<AdvRxDesc>() == DESC_SIZE);

impl Descriptor for AdvRxDesc {
    #[inline]
    fn is_done(&self) -> bool {
        self.wb().status_error() & RXD_STAT_DD != 0
    }

    fn raw(&self) -> &RawDesc {
        &self.0
    }

    fn raw_mut(&mut self) -> &mut RawDesc {
        &mut self.0
    }
}

impl AdvRxDesc {
    pub fn read(&mut self) -> RxReadView<'_> {
        RxReadView(&mut self.0)
    }

    pub fn wb(&self) -> RxWritebackView<'_> {
        RxWritebackView(&self.0)
    }
}

/// Buffer addresses handed to hardware.
pub struct RxReadView<'a>(&'a mut RawDesc);

impl RxReadView<'_> {
    const PKT_ADDR: usize = 0;
    const HDR_ADDR: usize = 8;

    pub fn set_pkt_addr(&mut self, addr: u64) -> &mut Self {
        self.0.write_u64(Self::PKT_ADDR, addr);
        self
    }

    /// Also clears the writeback status dword, so DD reads back as zero.
    pub fn set_hdr_addr(&mut self, addr: u64) -> &mut Self {
        self.0.write_u64(Self::HDR_ADDR, addr);
        self
    }

    pub fn pkt_addr(&self) -> u64 {
        self.0.read_u64(Self::PKT_ADDR)
    }

    pub fn hdr_addr(&self) -> u64 {
        self.0.read_u64(Self::HDR_ADDR)
    }
}

/// Receive status written by hardware.
pub struct RxWritebackView<'a>(&'a RawDesc);

impl RxWritebackView<'_> {
    const PKT_INFO: usize = 0;
    const HDR_INFO: usize = 2;
    const RSS_HASH: usize = 4;
    const STATUS_ERROR: usize = 8;
    const LENGTH: usize = 12;
    const VLAN: usize = 14;

    pub fn pkt_info(&self) -> u16 {
        self.0.read_u16(Self::PKT_INFO)
    }

    pub fn hdr_info(&self) -> u16 {
        self.0.read_u16(Self::HDR_INFO)
    }

    pub fn rss_hash(&self) -> u32 {
        self.0.read_u32(Self::RSS_HASH)
    }

    pub fn status_error(&self) -> u32 {
        self.0.read_u32(Self::STATUS_ERROR)
    }

    pub fn length(&self) -> u16 {
        self.0.read_u16(Self::LENGTH)
    }

    /// Raw little-endian VLAN field.
    pub fn vlan_raw(&self) -> u16 {
        self.0.read_u16(Self::VLAN)
    }
}

#[cfg(test)]
impl AdvRxDesc {
    /// Hardware side of an RX completion.
    pub(crate) fn write_back(&mut self, length: u16, status_error: u32, vlan: u16, rss_hash: u32) {
        self.0.write_u16(RxWritebackView::PKT_INFO, 0);
        self.0.write_u16(RxWritebackView::HDR_INFO, 0);
        self.0.write_u32(RxWritebackView::RSS_HASH, rss_hash);
        self.0.write_u32(RxWritebackView::STATUS_ERROR, status_error);
        self.0.write_u16(RxWritebackView::LENGTH, length);
        self.0.write_u16(RxWritebackView::VLAN, vlan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawDesc {
        RawDesc { bytes: [0; DESC_SIZE] }
    }

    #[test]
    fn test_tx_views_share_storage() {
        let mut desc = AdvTxDesc(raw());
        desc.read()
            .set_buffer_addr(0x1122_3344_5566_7788)
            .set_cmd_type_len(0xAABB_CCDD)
            .set_olinfo_status(0x0000_0001);
        assert_eq!(desc.0.bytes[0], 0x88);
        assert_eq!(desc.0.bytes[8], 0xDD);
        // olinfo_status and writeback status overlay the same dword
        assert_eq!(desc.wb().status(), 1);
        assert!(desc.is_done());
        desc.0.clear();
        assert!(!desc.is_done());
    }

    #[test]
    fn test_context_layout() {
        let mut desc = AdvTxDesc(raw());
        desc.context().set(0x0000_1C0E, 0x2020_0C00, 0x05B4_1400);
        assert_eq!(desc.0.read_u32(0), 0x0000_1C0E);
        assert_eq!(desc.0.read_u32(4), 0);
        assert_eq!(desc.context().type_tucmd_mlhl(), 0x2020_0C00);
        assert_eq!(desc.context().mss_l4len_idx(), 0x05B4_1400);
    }

    #[test]
    fn test_rx_read_then_writeback() {
        let mut desc = AdvRxDesc(raw());
        desc.read().set_pkt_addr(0x8000).set_hdr_addr(0);
        assert!(!desc.is_done());
        desc.write_back(1514, RXD_STAT_DD | 0x02, 0x0064, 0xDEAD_BEEF);
        let wb = desc.wb();
        assert_eq!(wb.length(), 1514);
        assert_eq!(wb.vlan_raw(), 100);
        assert_eq!(wb.rss_hash(), 0xDEAD_BEEF);
        assert!(desc.is_done());
    }
}
