//! Driver-wide sizing and tuning constants
//!
//! Ring sizes, buffer geometry, TX headroom accounting and interrupt throttle
//! values shared by the ring, TX, RX and ITR modules.

use core::time::Duration;

/// Ethernet header length
pub const ETH_HLEN: usize = 14;

/// 802.1Q tag length
pub const VLAN_HLEN: usize = 4;

/// Frame check sequence length
pub const ETH_FCS_LEN: usize = 4;

/// Minimum ethernet frame size (without FCS)
pub const ETH_ZLEN: usize = 60;

/// Standard maximum frame size: 1500 byte MTU plus header and FCS
pub const MAX_STD_FRAME_SIZE: usize = 1518;

/// Largest frame the controller accepts
pub const MAX_JUMBO_FRAME_SIZE: usize = 9216;

/// Smallest MTU accepted by `set_mtu`
pub const MIN_MTU: usize = 68;

/// Default MTU
pub const DEFAULT_MTU: usize = 1500;

/// Ethernet protocol type: IPv4
pub const ETH_P_IP: u16 = 0x0800;

/// Ethernet protocol type: IPv6
pub const ETH_P_IPV6: u16 = 0x86DD;

/// Ethernet protocol type: 802.1Q
pub const ETH_P_8021Q: u16 = 0x8100;

pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_SCTP: u8 = 132;

/// Page size of DMA allocations
pub const PAGE_SIZE: usize = 4096;

/// Descriptor size (in bytes), TX and RX alike
pub const DESC_SIZE: usize = 16;

pub const MIN_DESC: usize = 64;
pub const MAX_DESC: usize = 4096;
pub const DEFAULT_TXD: usize = 256;
pub const DEFAULT_RXD: usize = 256;

/// Queue pairs the controller family supports
pub const MAX_QUEUES: usize = 8;

/// RX buffer size: one half of a 4K page
pub const RX_BUFSZ: usize = 2048;

/// Frames up to this size are copied whole; larger frames copy this much header at most
pub const RX_HDR_LEN: usize = 256;

/// Refill the RX ring once this many slots are free
pub const RX_BUFFER_WRITE: usize = 16;

/// Largest data length of one TX data descriptor
pub const MAX_DATA_PER_TXD: usize = 1 << 14;

/// Largest payload the 18-bit PAYLEN descriptor field can carry
pub const MAX_TXD_PAYLEN: usize = (1 << 18) - 1;

/// Segments a single outgoing packet may carry
pub const MAX_SKB_FRAGS: usize = 17;

/// Worst-case descriptors for one packet: segments plus context plus the 2-slot gap
pub const DESC_NEEDED: usize = MAX_SKB_FRAGS + 4;

/// Free descriptors needed before a stopped queue is woken
pub const TX_WAKE_THRESHOLD: usize = DESC_NEEDED * 2;

/// Slots kept back on top of data descriptors: one context plus the tail gap
pub const TX_HEADROOM: usize = 3;

/// Completed packets reclaimed per poll pass
pub const DEFAULT_TX_WORK: usize = 128;

/// Default NAPI-style poll budget
pub const POLL_BUDGET: usize = 64;

/// Base TX hang timeout, scaled by the speed-dependent factor
pub const TX_HANG_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout factor at 10Mbps half/full duplex
pub const TX_TIMEOUT_FACTOR_10M: u32 = 14;

/// Interval between watchdog runs
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(1);

// Interrupt throttle interval values, in EITR units (~0.25 us)
pub const ITR_START: u32 = 648;
/// ~4000 interrupts per second (bulk)
pub const ITR_4K: u32 = 980;
/// ~20000 interrupts per second (low latency)
pub const ITR_20K: u32 = 196;
/// ~70000 interrupts per second (lowest latency)
pub const ITR_70K: u32 = 56;

/// Smallest interval written to EITR
pub const ITR_FIXED_MIN: u32 = 4;

/// Reset guard polling: sleep between attempts
pub const RESET_WAIT_STEP: Duration = Duration::from_millis(1);

/// Reset guard polling: attempts before giving up
pub const RESET_WAIT_ATTEMPTS: usize = 2000;

/// Quiesce delay after disabling the DMA engines
pub const DOWN_QUIESCE: Duration = Duration::from_millis(10);

/// 1ms polls for the NVM auto-read after a device reset
pub const RESET_POLL_ATTEMPTS: usize = 10;
