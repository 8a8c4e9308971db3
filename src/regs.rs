//! igb register map and bit definitions

/// Global registers, as byte offsets from the MMIO base
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum IgbRegisters {
    Ctrl = 0x00000,
    Status = 0x00008,
    Eecd = 0x00010,
    CtrlExt = 0x00018,
    Icr = 0x000C0,
    Itr = 0x000C4,
    Ics = 0x000C8,
    Ims = 0x000D0,
    Imc = 0x000D8,
    Iam = 0x000E0,
    Rctl = 0x00100,
    Tctl = 0x00400,
    Rxcsum = 0x05000,
    Rlpml = 0x05004,
    Gpie = 0x01514,
    Eics = 0x01520,
    Eims = 0x01524,
    Eimc = 0x01528,
    Eiac = 0x0152C,
    Eiam = 0x01530,
    Eicr = 0x01580,
    IvarMisc = 0x01740,
}

impl IgbRegisters {
    #[inline]
    pub const fn offset(self) -> usize {
        self as usize
    }
}

/// Interrupt throttle register of vector `n`
#[inline]
pub const fn eitr(n: usize) -> usize {
    0x01680 + n * 4
}

/// MSI-X bitmap of vector `n` (82575 only)
#[inline]
pub const fn msixbm(n: usize) -> usize {
    0x01600 + n * 4
}

/// Interrupt vector allocation register holding queues `2n` and `2n + 1`
#[inline]
pub const fn ivar(n: usize) -> usize {
    0x01700 + n * 4
}

/// Queues 0-3 live in the legacy bank, 4-7 in the extended bank
const fn queue_reg(base_lo: usize, base_hi: usize, n: usize) -> usize {
    if n < 4 {
        base_lo + n * 0x100
    } else {
        base_hi + n * 0x40
    }
}

pub const fn rdbal(n: usize) -> usize {
    queue_reg(0x02800, 0x0C000, n)
}

pub const fn rdbah(n: usize) -> usize {
    queue_reg(0x02804, 0x0C004, n)
}

pub const fn rdlen(n: usize) -> usize {
    queue_reg(0x02808, 0x0C008, n)
}

pub const fn srrctl(n: usize) -> usize {
    queue_reg(0x0280C, 0x0C00C, n)
}

pub const fn rdh(n: usize) -> usize {
    queue_reg(0x02810, 0x0C010, n)
}

pub const fn rdt(n: usize) -> usize {
    queue_reg(0x02818, 0x0C018, n)
}

pub const fn rxdctl(n: usize) -> usize {
    queue_reg(0x02828, 0x0C028, n)
}

pub const fn tdbal(n: usize) -> usize {
    queue_reg(0x03800, 0x0E000, n)
}

pub const fn tdbah(n: usize) -> usize {
    queue_reg(0x03804, 0x0E004, n)
}

pub const fn tdlen(n: usize) -> usize {
    queue_reg(0x03808, 0x0E008, n)
}

pub const fn tdh(n: usize) -> usize {
    queue_reg(0x03810, 0x0E010, n)
}

pub const fn tdt(n: usize) -> usize {
    queue_reg(0x03818, 0x0E018, n)
}

pub const fn txdctl(n: usize) -> usize {
    queue_reg(0x03828, 0x0E028, n)
}

/// Register content bit definitions
#[allow(dead_code)]
pub mod register_bits {
    // CTRL
    pub const CTRL_RST: u32 = 1 << 26;

    // CTRL_EXT
    pub const CTRL_EXT_IRCA: u32 = 0x0000_0001;
    pub const CTRL_EXT_EIAME: u32 = 0x0100_0000;
    pub const CTRL_EXT_PBA_CLR: u32 = 0x8000_0000;

    // EECD
    pub const EECD_AUTO_RD: u32 = 0x0000_0200;

    // STATUS
    pub const STATUS_FD: u32 = 0x0000_0001;
    pub const STATUS_LU: u32 = 0x0000_0002;
    pub const STATUS_TXOFF: u32 = 0x0000_0010;
    pub const STATUS_SPEED_MASK: u32 = 0x0000_00C0;
    pub const STATUS_SPEED_10: u32 = 0x0000_0000;
    pub const STATUS_SPEED_100: u32 = 0x0000_0040;
    pub const STATUS_SPEED_1000: u32 = 0x0000_0080;

    // ICR / ICS / IMS / IMC
    pub const ICR_TXDW: u32 = 0x0000_0001;
    pub const ICR_LSC: u32 = 0x0000_0004;
    pub const ICR_RXSEQ: u32 = 0x0000_0008;
    pub const ICR_RXDMT0: u32 = 0x0000_0010;
    pub const ICR_RXT0: u32 = 0x0000_0080;
    pub const ICR_VMMB: u32 = 0x0000_0100;
    pub const ICR_DOUTSYNC: u32 = 0x1000_0000;
    pub const ICR_DRSTA: u32 = 0x4000_0000;
    pub const ICR_INT_ASSERTED: u32 = 0x8000_0000;

    /// Causes serviced by the legacy/MSI handler
    pub const IMS_ENABLE_MASK: u32 =
        ICR_TXDW | ICR_LSC | ICR_RXSEQ | ICR_RXDMT0 | ICR_RXT0 | ICR_DOUTSYNC | ICR_DRSTA;

    /// Causes routed to the MSI-X "other" vector
    pub const IMS_OTHER_MASK: u32 = ICR_LSC | ICR_DOUTSYNC | ICR_DRSTA | ICR_VMMB;

    // RCTL
    pub const RCTL_EN: u32 = 0x0000_0002;
    pub const RCTL_LPE: u32 = 0x0000_0020;
    pub const RCTL_BAM: u32 = 0x0000_8000;
    pub const RCTL_SECRC: u32 = 0x0400_0000;

    // TCTL
    pub const TCTL_EN: u32 = 0x0000_0002;
    pub const TCTL_PSP: u32 = 0x0000_0008;
    pub const TCTL_CT: u32 = 0x0000_0ff0;
    pub const TCTL_RTLC: u32 = 0x0100_0000;
    pub const CT_SHIFT: u32 = 4;
    pub const COLLISION_THRESHOLD: u32 = 15;

    // RXCSUM
    pub const RXCSUM_IPOFL: u32 = 0x0000_0100;
    pub const RXCSUM_TUOFL: u32 = 0x0000_0200;
    pub const RXCSUM_CRCOFL: u32 = 0x0000_0800;
    pub const RXCSUM_PCSD: u32 = 0x0000_2000;

    // TXDCTL / RXDCTL
    pub const TXDCTL_QUEUE_ENABLE: u32 = 0x0200_0000;
    pub const RXDCTL_QUEUE_ENABLE: u32 = 0x0200_0000;
    pub const TX_PTHRESH: u32 = 8;
    pub const TX_HTHRESH: u32 = 1;
    pub const TX_WTHRESH: u32 = 16;
    pub const RX_PTHRESH: u32 = 8;
    pub const RX_HTHRESH: u32 = 8;
    pub const RX_WTHRESH: u32 = 4;

    // SRRCTL
    pub const SRRCTL_BSIZEPKT_SHIFT: u32 = 10;
    pub const SRRCTL_BSIZEHDRSIZE_SHIFT: u32 = 2;
    pub const SRRCTL_DESCTYPE_ADV_ONEBUF: u32 = 0x0200_0000;
    pub const SRRCTL_DROP_EN: u32 = 0x8000_0000;

    // EICR / EIMS
    pub const EICR_RX_QUEUE0: u32 = 0x0000_0001;
    pub const EICR_TX_QUEUE0: u32 = 0x0000_0100;
    /// 82575 "other" cause bit; later parts use the vector's own bit
    pub const EIMS_OTHER_82575: u32 = 0x8000_0000;

    // EITR
    pub const EITR_INTERVAL_MASK: u32 = 0x7FFC;
    pub const EITR_CNT_IGNR: u32 = 0x8000_0000;

    // GPIE
    pub const GPIE_NSICR: u32 = 0x0000_0001;
    pub const GPIE_MSIX_MODE: u32 = 0x0000_0010;
    pub const GPIE_EIAME: u32 = 0x4000_0000;
    pub const GPIE_PBA: u32 = 0x8000_0000;

    // IVAR
    pub const IVAR_VALID: u32 = 0x80;
}

/// Advanced descriptor bit definitions
#[allow(dead_code)]
pub mod desc_bits {
    // TX cmd_type_len
    pub const ADVTXD_DTYP_CTXT: u32 = 0x0020_0000;
    pub const ADVTXD_DTYP_DATA: u32 = 0x0030_0000;
    pub const ADVTXD_DCMD_EOP: u32 = 0x0100_0000;
    pub const ADVTXD_DCMD_IFCS: u32 = 0x0200_0000;
    pub const ADVTXD_DCMD_RS: u32 = 0x0800_0000;
    pub const ADVTXD_DCMD_DEXT: u32 = 0x2000_0000;
    pub const ADVTXD_DCMD_VLE: u32 = 0x4000_0000;
    pub const ADVTXD_DCMD_TSE: u32 = 0x8000_0000;
    pub const ADVTXD_LEN_MASK: u32 = 0x0000_FFFF;
    /// End of packet plus report status, set on the last data descriptor
    pub const TXD_DCMD: u32 = ADVTXD_DCMD_EOP | ADVTXD_DCMD_RS;

    // TX olinfo_status
    pub const ADVTXD_PAYLEN_SHIFT: u32 = 14;
    pub const ADVTXD_IDX_SHIFT: u32 = 4;
    pub const TXD_POPTS_IXSM: u32 = 0x01;
    pub const TXD_POPTS_TXSM: u32 = 0x02;

    // TX context descriptor
    pub const ADVTXD_MACLEN_SHIFT: u32 = 9;
    pub const ADVTXD_VLAN_SHIFT: u32 = 16;
    pub const ADVTXD_TUCMD_IPV4: u32 = 0x0000_0400;
    pub const ADVTXD_TUCMD_L4T_UDP: u32 = 0x0000_0000;
    pub const ADVTXD_TUCMD_L4T_TCP: u32 = 0x0000_0800;
    pub const ADVTXD_TUCMD_L4T_SCTP: u32 = 0x0000_1000;
    pub const ADVTXD_L4LEN_SHIFT: u32 = 8;
    pub const ADVTXD_MSS_SHIFT: u32 = 16;

    // TX writeback status
    pub const TXD_STAT_DD: u32 = 0x0000_0001;

    // RX writeback status (low byte of status_error)
    pub const RXD_STAT_DD: u32 = 0x01;
    pub const RXD_STAT_EOP: u32 = 0x02;
    pub const RXD_STAT_IXSM: u32 = 0x04;
    pub const RXD_STAT_VP: u32 = 0x08;
    pub const RXD_STAT_UDPCS: u32 = 0x10;
    pub const RXD_STAT_TCPCS: u32 = 0x20;
    pub const RXD_STAT_IPCS: u32 = 0x40;
    pub const RXDEXT_STATERR_LB: u32 = 0x0004_0000;

    // RX writeback errors (high byte of status_error)
    pub const RXDEXT_STATERR_CE: u32 = 0x0100_0000;
    pub const RXDEXT_STATERR_SE: u32 = 0x0200_0000;
    pub const RXDEXT_STATERR_SEQ: u32 = 0x0400_0000;
    pub const RXDEXT_STATERR_CXE: u32 = 0x1000_0000;
    pub const RXDEXT_STATERR_TCPE: u32 = 0x2000_0000;
    pub const RXDEXT_STATERR_IPE: u32 = 0x4000_0000;
    pub const RXDEXT_STATERR_RXE: u32 = 0x8000_0000;
    pub const RXDEXT_ERR_FRAME_ERR_MASK: u32 = RXDEXT_STATERR_CE
        | RXDEXT_STATERR_SE
        | RXDEXT_STATERR_SEQ
        | RXDEXT_STATERR_CXE
        | RXDEXT_STATERR_RXE;
}
