//! Packets exchanged with the host stack

use alloc::vec::Vec;

use bitflags::bitflags;

use crate::error::IgbError;
use crate::page::RxPage;

bitflags! {
    /// Checksums the host wants hardware to fill in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChecksumDemand: u8 {
        const IPV4 = 1 << 0;
        const TCP = 1 << 1;
        const UDP = 1 << 2;
        const SCTP = 1 << 3;
    }
}

bitflags! {
    /// Checksums hardware verified on a received frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RxChecksum: u8 {
        const IP_OK = 1 << 0;
        const TCP_OK = 1 << 1;
        const UDP_OK = 1 << 2;
    }
}

/// Offload requests attached to an outgoing packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOffload {
    pub checksum: ChecksumDemand,
    /// Segment the TCP payload into frames of this MSS.
    pub tso_mss: Option<u16>,
    /// Insert this 802.1Q tag.
    pub vlan: Option<u16>,
}

/// Outgoing frame, one or more CPU buffers laid out back to back on the wire.
///
/// With checksum or segmentation offload the first segment must hold the
/// complete L2-L4 headers.
#[derive(Debug, Default)]
pub struct TxPacket {
    segments: Vec<Vec<u8>>,
    pub offload: TxOffload,
}

impl TxPacket {
    pub fn new(data: Vec<u8>) -> Self {
        Self::from_segments(alloc::vec![data])
    }

    pub fn from_segments(segments: Vec<Vec<u8>>) -> Self {
        Self {
            segments,
            offload: TxOffload::default(),
        }
    }

    pub fn with_offload(mut self, offload: TxOffload) -> Self {
        self.offload = offload;
        self
    }

    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    pub(crate) fn headers_mut(&mut self) -> Option<&mut [u8]> {
        self.segments.first_mut().map(Vec::as_mut_slice)
    }
}

/// A packet `submit` refused, handed back with the reason.
#[derive(Debug)]
pub struct TxRejected {
    pub error: IgbError,
    pub packet: TxPacket,
}

/// Offload results for a received frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxMetadata {
    pub checksum: RxChecksum,
    pub vlan_tag: Option<u16>,
    pub rss_hash: Option<u32>,
}

/// Zero-copy slice of an RX page.
#[derive(Debug)]
pub struct RxFrag {
    page: RxPage,
    offset: usize,
    len: usize,
}

impl RxFrag {
    pub(crate) fn new(page: RxPage, offset: usize, len: usize) -> Self {
        Self { page, offset, len }
    }

    pub fn data(&self) -> &[u8] {
        self.page.data(self.offset, self.len)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dma_addr(&self) -> u64 {
        self.page.dma() + self.offset as u64
    }

    pub(crate) fn trim_front(&mut self, n: usize) {
        let n = n.min(self.len);
        self.offset += n;
        self.len -= n;
    }
}

/// Received frame: a copied head plus page fragments.
#[derive(Debug, Default)]
pub struct RxPacket {
    head: Vec<u8>,
    frags: Vec<RxFrag>,
    pub meta: RxMetadata,
}

impl RxPacket {
    pub(crate) fn new(head: Vec<u8>) -> Self {
        Self {
            head,
            frags: Vec::new(),
            meta: RxMetadata::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.head.len() + self.frags.iter().map(RxFrag::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub fn frags(&self) -> &[RxFrag] {
        &self.frags
    }

    pub(crate) fn head_mut(&mut self) -> &mut Vec<u8> {
        &mut self.head
    }

    pub(crate) fn frags_mut(&mut self) -> &mut Vec<RxFrag> {
        &mut self.frags
    }

    pub(crate) fn push_frag(&mut self, frag: RxFrag) {
        self.frags.push(frag);
    }

    /// Copy the whole frame into one buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.head);
        for frag in &self.frags {
            out.extend_from_slice(frag.data());
        }
        out
    }
}
