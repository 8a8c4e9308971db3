//! Driver error type

use core::fmt;

/// Errors surfaced by the igb ring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgbError {
    /// Descriptor count is not a power of two inside the supported range.
    InvalidDescriptorCount(usize),
    /// Queue count is zero or above what the controller supports.
    InvalidQueueCount(usize),
    /// The interrupt mode cannot serve the requested queues.
    InsufficientVectors { needed: usize, available: usize },
    /// MTU outside the supported frame sizes.
    InvalidMtu(usize),
    /// DMA or heap allocation failed.
    NoMemory,
    /// The TX ring lacks free descriptors for this packet.
    Busy,
    /// The adapter is down or in the middle of a reset.
    NotReady,
    /// The link is down; nothing can be transmitted.
    LinkDown,
    /// The packet has more segments than one submission may carry.
    TooManySegments(usize),
    /// The packet headers cannot be parsed for the requested offload.
    MalformedPacket,
    /// Another context held the reset guard for too long.
    ResetTimeout,
    /// Register reads return all-ones; the device is gone.
    Detached,
    /// The queue or vector index does not exist.
    InvalidQueue(usize),
}

/// Result type for igb driver functions.
pub type IgbResult<T = ()> = Result<T, IgbError>;

impl fmt::Display for IgbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDescriptorCount(n) => write!(f, "invalid descriptor count {n}"),
            Self::InvalidQueueCount(n) => write!(f, "invalid queue count {n}"),
            Self::InsufficientVectors { needed, available } => {
                write!(f, "need {needed} interrupt vectors, {available} available")
            }
            Self::InvalidMtu(mtu) => write!(f, "invalid MTU {mtu}"),
            Self::NoMemory => write!(f, "out of memory"),
            Self::Busy => write!(f, "transmit ring busy"),
            Self::NotReady => write!(f, "adapter not ready"),
            Self::LinkDown => write!(f, "link down"),
            Self::TooManySegments(n) => write!(f, "packet has {n} segments"),
            Self::MalformedPacket => write!(f, "malformed packet headers"),
            Self::ResetTimeout => write!(f, "timed out waiting for reset guard"),
            Self::Detached => write!(f, "device detached"),
            Self::InvalidQueue(n) => write!(f, "invalid queue {n}"),
        }
    }
}
