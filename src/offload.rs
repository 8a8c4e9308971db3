//! Checksum and segmentation offload planning
//!
//! Works out whether a packet needs a context descriptor, fills in the fields
//! of that descriptor and, for TSO, rewrites the IP length/checksum and seeds
//! the TCP checksum with the length-less pseudo-header sum, as the hardware
//! expects before it cuts the payload into segments.

use bitflags::bitflags;

use crate::config::OffloadCaps;
use crate::constants::*;
use crate::error::{IgbError, IgbResult};
use crate::packet::{ChecksumDemand, TxPacket};
use crate::regs::desc_bits::*;

bitflags! {
    /// Per-packet flags that shape the data descriptors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TxFlags: u32 {
        const VLAN = 1 << 0;
        const TSO = 1 << 1;
        const CSUM = 1 << 2;
        const IPV4 = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L3Proto {
    Ipv4,
    Ipv6,
}

/// Offsets of the headers at the front of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    pub mac_len: usize,
    pub ip_len: usize,
    pub l4_len: usize,
    pub l3: L3Proto,
    pub l4_proto: u8,
}

impl HeaderLayout {
    pub fn l4_offset(&self) -> usize {
        self.mac_len + self.ip_len
    }

    pub fn total(&self) -> usize {
        self.l4_offset() + self.l4_len
    }
}

fn be16(buf: &[u8], off: usize) -> IgbResult<u16> {
    buf.get(off..off + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(IgbError::MalformedPacket)
}

fn byte(buf: &[u8], off: usize) -> IgbResult<u8> {
    buf.get(off).copied().ok_or(IgbError::MalformedPacket)
}

/// Parse Ethernet (optionally 802.1Q tagged), IPv4/IPv6 and TCP/UDP/SCTP headers.
pub fn parse_headers(frame: &[u8]) -> IgbResult<HeaderLayout> {
    let mut mac_len = ETH_HLEN;
    let mut ethertype = be16(frame, 12)?;
    if ethertype == ETH_P_8021Q {
        mac_len += VLAN_HLEN;
        ethertype = be16(frame, 16)?;
    }
    let (l3, ip_len, l4_proto) = match ethertype {
        ETH_P_IP => {
            let ihl = (byte(frame, mac_len)? & 0x0F) as usize * 4;
            if ihl < 20 {
                return Err(IgbError::MalformedPacket);
            }
            (L3Proto::Ipv4, ihl, byte(frame, mac_len + 9)?)
        }
        ETH_P_IPV6 => (L3Proto::Ipv6, 40, byte(frame, mac_len + 6)?),
        _ => return Err(IgbError::MalformedPacket),
    };
    let l4 = mac_len + ip_len;
    let l4_len = match l4_proto {
        IPPROTO_TCP => {
            let doff = (byte(frame, l4 + 12)? >> 4) as usize * 4;
            if doff < 20 {
                return Err(IgbError::MalformedPacket);
            }
            doff
        }
        IPPROTO_UDP => 8,
        IPPROTO_SCTP => 12,
        _ => 0,
    };
    if frame.len() < l4 + l4_len {
        return Err(IgbError::MalformedPacket);
    }
    Ok(HeaderLayout {
        mac_len,
        ip_len,
        l4_len,
        l3,
        l4_proto,
    })
}

/// Length of the L2-L4 headers, bounded by `max`. Falls back to the Ethernet
/// header when the frame is not IP.
pub fn header_len(frame: &[u8], max: usize) -> usize {
    let len = match parse_headers(frame) {
        Ok(layout) => layout.total(),
        Err(_) => ETH_HLEN,
    };
    len.min(max).min(frame.len())
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

fn sum_words(bytes: &[u8]) -> u32 {
    bytes
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], *c.get(1).unwrap_or(&0)]) as u32)
        .sum()
}

/// Pseudo-header sum with a zero length, not complemented.
fn pseudo_header_seed(frame: &[u8], layout: &HeaderLayout) -> u16 {
    let ip = layout.mac_len;
    let addrs = match layout.l3 {
        L3Proto::Ipv4 => &frame[ip + 12..ip + 20],
        L3Proto::Ipv6 => &frame[ip + 8..ip + 40],
    };
    fold(sum_words(addrs) + layout.l4_proto as u32)
}

/// Context descriptor contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFields {
    pub vlan_macip_lens: u32,
    pub type_tucmd_mlhl: u32,
    pub mss_l4len_idx: u32,
}

/// Everything the TX path needs to emit a packet's descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadPlan {
    pub context: Option<ContextFields>,
    pub flags: TxFlags,
    pub vlan: u16,
    /// Header bytes replicated in front of every TSO segment.
    pub hdr_len: usize,
    pub gso_segs: u16,
    /// Bytes that will hit the wire, headers of every segment included.
    pub bytecount: usize,
}

impl OffloadPlan {
    /// PAYLEN field of the first data descriptor.
    pub fn paylen(&self, packet_len: usize) -> usize {
        if self.flags.contains(TxFlags::TSO) {
            packet_len - self.hdr_len
        } else {
            packet_len
        }
    }
}

fn context(
    layout: &HeaderLayout,
    vlan: u16,
    mut type_tucmd: u32,
    mut mss_l4len_idx: u32,
    ctx_idx: Option<u32>,
) -> ContextFields {
    type_tucmd |= ADVTXD_DCMD_DEXT | ADVTXD_DTYP_CTXT;
    if let Some(idx) = ctx_idx {
        mss_l4len_idx |= idx << ADVTXD_IDX_SHIFT;
    }
    ContextFields {
        vlan_macip_lens: layout.ip_len as u32
            | (layout.mac_len as u32) << ADVTXD_MACLEN_SHIFT
            | (vlan as u32) << ADVTXD_VLAN_SHIFT,
        type_tucmd_mlhl: type_tucmd,
        mss_l4len_idx,
    }
}

/// Decide the offload treatment of `packet`, rewriting its headers for TSO.
///
/// `ctx_idx` is the queue's register index on controllers that tag every
/// context with it (82575).
pub fn plan(packet: &mut TxPacket, caps: OffloadCaps, ctx_idx: Option<u32>) -> IgbResult<OffloadPlan> {
    let len = packet.len();
    let offload = packet.offload;
    let mut flags = TxFlags::empty();
    let vlan = offload.vlan.unwrap_or(0);
    if offload.vlan.is_some() {
        flags |= TxFlags::VLAN;
    }
    let mut plan = OffloadPlan {
        context: None,
        flags,
        vlan,
        hdr_len: 0,
        gso_segs: 1,
        bytecount: len,
    };

    if offload.tso_mss.is_none() && len > MAX_TXD_PAYLEN {
        return Err(IgbError::MalformedPacket);
    }

    let mut demand = if caps.contains(OffloadCaps::TX_CSUM) {
        offload.checksum
    } else {
        ChecksumDemand::empty()
    };

    if let Some(mss) = offload.tso_mss {
        let headers = packet.headers_mut().ok_or(IgbError::MalformedPacket)?;
        let layout = parse_headers(headers)?;
        if layout.l4_proto != IPPROTO_TCP || mss == 0 {
            return Err(IgbError::MalformedPacket);
        }
        let hdr_len = layout.total();
        let payload = len - hdr_len;
        if payload > mss as usize {
            if !caps.contains(OffloadCaps::TSO) {
                return Err(IgbError::MalformedPacket);
            }
            return tso(headers, &layout, plan, mss, len, ctx_idx);
        }
        demand |= ChecksumDemand::TCP;
        if layout.l3 == L3Proto::Ipv4 {
            demand |= ChecksumDemand::IPV4;
        }
    }

    if demand.is_empty() {
        if plan.flags.contains(TxFlags::VLAN) {
            let layout = packet
                .headers_mut()
                .and_then(|h| parse_headers(h).ok())
                .unwrap_or(HeaderLayout {
                    mac_len: ETH_HLEN,
                    ip_len: 0,
                    l4_len: 0,
                    l3: L3Proto::Ipv4,
                    l4_proto: 0,
                });
            plan.context = Some(context(&layout, vlan, 0, 0, ctx_idx));
        }
        return Ok(plan);
    }

    let headers = packet.headers_mut().ok_or(IgbError::MalformedPacket)?;
    let layout = parse_headers(headers)?;
    let mut type_tucmd = 0;
    let mut mss_l4len_idx = 0;
    if demand.intersects(ChecksumDemand::TCP | ChecksumDemand::UDP | ChecksumDemand::SCTP) {
        match layout.l4_proto {
            IPPROTO_TCP => type_tucmd |= ADVTXD_TUCMD_L4T_TCP,
            IPPROTO_UDP => type_tucmd |= ADVTXD_TUCMD_L4T_UDP,
            IPPROTO_SCTP => type_tucmd |= ADVTXD_TUCMD_L4T_SCTP,
            _ => return Err(IgbError::MalformedPacket),
        }
        mss_l4len_idx = (layout.l4_len as u32) << ADVTXD_L4LEN_SHIFT;
        plan.flags |= TxFlags::CSUM;
    }
    if layout.l3 == L3Proto::Ipv4 {
        type_tucmd |= ADVTXD_TUCMD_IPV4;
        if demand.contains(ChecksumDemand::IPV4) {
            plan.flags |= TxFlags::IPV4;
        }
    }
    plan.context = Some(context(&layout, vlan, type_tucmd, mss_l4len_idx, ctx_idx));
    Ok(plan)
}

fn tso(
    headers: &mut [u8],
    layout: &HeaderLayout,
    mut plan: OffloadPlan,
    mss: u16,
    len: usize,
    ctx_idx: Option<u32>,
) -> IgbResult<OffloadPlan> {
    let ip = layout.mac_len;
    let th = layout.l4_offset();
    let hdr_len = layout.total();
    let payload = len - hdr_len;
    let gso_segs = payload.div_ceil(mss as usize);
    // PAYLEN is an 18-bit field and the segment count is kept in 16 bits
    if payload > MAX_TXD_PAYLEN || gso_segs > u16::MAX as usize || th + 18 > headers.len() {
        return Err(IgbError::MalformedPacket);
    }

    let mut type_tucmd = ADVTXD_TUCMD_L4T_TCP;
    match layout.l3 {
        L3Proto::Ipv4 => {
            headers[ip + 2..ip + 4].fill(0);
            headers[ip + 10..ip + 12].fill(0);
            type_tucmd |= ADVTXD_TUCMD_IPV4;
            plan.flags |= TxFlags::IPV4;
        }
        L3Proto::Ipv6 => headers[ip + 4..ip + 6].fill(0),
    }
    let seed = pseudo_header_seed(headers, layout);
    headers[th + 16..th + 18].copy_from_slice(&seed.to_be_bytes());

    plan.flags |= TxFlags::TSO | TxFlags::CSUM;
    plan.hdr_len = hdr_len;
    plan.gso_segs = gso_segs as u16;
    plan.bytecount = len + (gso_segs - 1) * hdr_len;
    let mss_l4len_idx =
        (layout.l4_len as u32) << ADVTXD_L4LEN_SHIFT | (mss as u32) << ADVTXD_MSS_SHIFT;
    plan.context = Some(context(layout, plan.vlan, type_tucmd, mss_l4len_idx, ctx_idx));
    Ok(plan)
}
