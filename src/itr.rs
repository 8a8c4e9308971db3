//! Adaptive interrupt throttling.
//!
//! The EITR interval is expressed in 256ns units. Two algorithms feed it:
//!
//! | Algorithm          | Used when                  | Input                      |
//! |--------------------|----------------------------|----------------------------|
//! | latency bands      | a single vector serves all | per-direction band history |
//! | average wire size  | one vector per queue       | mean frame size on the wire |
//!
//! Both pin the interval to [`ITR_4K`] when the link runs at 10 or 100 Mbps.
//! The computed value is only latched here; it reaches the register at the
//! start of the next interrupt so the running coalescing timer is not reset.

use crate::config::MacType;
use crate::constants::*;
use crate::regs::register_bits::{EITR_CNT_IGNR, EITR_INTERVAL_MASK};
use crate::LinkSpeed;

/// Coarse traffic classification of one direction of a vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LatencyBand {
    /// Few small frames. Interrupt as often as possible.
    Lowest = 0,
    #[default]
    Low = 1,
    /// Sustained large frames. Coalesce hard.
    Bulk = 2,
}

impl LatencyBand {
    /// EITR interval targeted by this band.
    pub fn interval(self) -> u32 {
        match self {
            LatencyBand::Lowest => ITR_70K,
            LatencyBand::Low => ITR_20K,
            LatencyBand::Bulk => ITR_4K,
        }
    }
}

/// Work done by one direction of a vector since the last ITR computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingContainer {
    pub total_bytes: usize,
    pub total_packets: usize,
    pub band: LatencyBand,
}

impl RingContainer {
    pub fn account(&mut self, packets: usize, bytes: usize) {
        self.total_packets += packets;
        self.total_bytes += bytes;
    }

    fn clear(&mut self) {
        self.total_bytes = 0;
        self.total_packets = 0;
    }

    /// Reclassify from the accumulated counters and clear them.
    fn update(&mut self) {
        self.band = update_itr(self.band, self.total_packets, self.total_bytes);
        self.clear();
    }

    fn avg_frame(&self) -> usize {
        self.total_bytes.checked_div(self.total_packets).unwrap_or(0)
    }
}

/// Next latency band given the traffic of the last interval.
///
/// Thresholds assume the interval the current band programs; a zero packet
/// count leaves the band as it is.
pub fn update_itr(band: LatencyBand, packets: usize, bytes: usize) -> LatencyBand {
    if packets == 0 {
        return band;
    }
    let avg = bytes / packets;
    match band {
        LatencyBand::Lowest => {
            // TSO and jumbo frames
            if avg > 8000 {
                LatencyBand::Bulk
            } else if packets < 5 && bytes > 512 {
                LatencyBand::Low
            } else {
                band
            }
        }
        LatencyBand::Low => {
            if bytes > 10000 {
                if avg > 8000 || packets < 10 || avg > 1200 {
                    LatencyBand::Bulk
                } else if packets > 35 {
                    LatencyBand::Lowest
                } else {
                    band
                }
            } else if avg > 2000 {
                LatencyBand::Bulk
            } else if packets <= 2 && bytes < 512 {
                LatencyBand::Lowest
            } else {
                band
            }
        }
        LatencyBand::Bulk => {
            if bytes > 25000 {
                if packets > 35 {
                    LatencyBand::Low
                } else {
                    band
                }
            } else if bytes < 1500 {
                LatencyBand::Low
            } else {
                band
            }
        }
    }
}

/// Smoothing applied between the current and the newly computed interval.
pub trait ItrPolicy {
    /// Interval to latch given the computed `new` one and the current `old` one.
    fn smooth(&self, new: u32, old: u32) -> u32;
}

/// Steps towards a shorter interval through an intermediate value, applies a
/// longer one at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultItrPolicy;

impl ItrPolicy for DefaultItrPolicy {
    fn smooth(&self, new: u32, old: u32) -> u32 {
        if new >= old {
            return new;
        }
        let blended = (new as u64 * old as u64) / (new as u64 + (old as u64 >> 2));
        (blended as u32).max(new)
    }
}

/// Throttling state of one queue vector.
#[derive(Debug, Clone, Copy)]
pub struct ItrState {
    /// Interval currently latched for the vector.
    pub val: u32,
    /// `val` still has to be written to EITR.
    pub dirty: bool,
    pub rx: RingContainer,
    pub tx: RingContainer,
}

fn pinned(speed: Option<LinkSpeed>) -> bool {
    matches!(speed, Some(LinkSpeed::Mbps10 | LinkSpeed::Mbps100))
}

impl ItrState {
    pub fn new(initial: u32) -> Self {
        Self {
            val: initial,
            dirty: false,
            rx: RingContainer::default(),
            tx: RingContainer::default(),
        }
    }

    fn latch(&mut self, val: u32) {
        if val != self.val {
            self.val = val;
            self.dirty = true;
        }
    }

    /// Latency-band update, used when one vector serves every ring.
    pub fn set_itr(&mut self, speed: Option<LinkSpeed>, conservative: bool, policy: &dyn ItrPolicy) {
        let new = if pinned(speed) {
            self.tx.clear();
            self.rx.clear();
            ITR_4K
        } else {
            self.tx.update();
            self.rx.update();
            let mut current = self.rx.band.max(self.tx.band);
            if conservative && current == LatencyBand::Lowest {
                current = LatencyBand::Low;
            }
            current.interval()
        };
        if new != self.val {
            let smoothed = policy.smooth(new, self.val);
            self.latch(smoothed);
        }
    }

    /// Average-wire-size update, used with one vector per queue.
    pub fn update_ring_itr(&mut self, speed: Option<LinkSpeed>, conservative: bool) {
        if pinned(speed) {
            self.latch(ITR_4K);
            self.rx.clear();
            self.tx.clear();
            return;
        }

        let avg_wire_size = self.rx.avg_frame().max(self.tx.avg_frame());
        self.rx.clear();
        self.tx.clear();
        if avg_wire_size == 0 {
            return;
        }

        // CRC, preamble and inter-frame gap; jumbo frames capped
        let avg_wire_size = (avg_wire_size + 24).min(3000);
        let mut new = if (301..1200).contains(&avg_wire_size) {
            avg_wire_size / 3
        } else {
            avg_wire_size / 2
        } as u32;
        if conservative && new < ITR_20K {
            new = ITR_20K;
        }
        self.latch(new);
    }

    /// Value to write to EITR if one is pending.
    pub fn take_pending(&mut self, mac_type: MacType) -> Option<u32> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(eitr_value(self.val, mac_type))
    }
}

/// EITR register encoding of interval `val`.
pub fn eitr_value(val: u32, mac_type: MacType) -> u32 {
    let mut itr = val & EITR_INTERVAL_MASK;
    if itr == 0 {
        itr = ITR_FIXED_MIN;
    }
    if mac_type == MacType::I82575 {
        itr | itr << 16
    } else {
        itr | EITR_CNT_IGNR
    }
}
