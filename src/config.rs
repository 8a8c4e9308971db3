//! Adapter configuration

use bitflags::bitflags;

use crate::constants::*;
use crate::error::{IgbError, IgbResult};

/// Controller revision. Several ring behaviours differ per revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MacType {
    I82575,
    I82576,
    I82580,
    I350,
    I354,
    I210,
    I211,
}

impl MacType {
    /// 82575 needs the context index in every TX descriptor.
    pub fn tx_ctx_idx(self) -> bool {
        self == MacType::I82575
    }

    /// Hardware flags a bogus L4 error on 60-byte SCTP frames.
    pub fn rx_sctp_csum_errata(self) -> bool {
        self >= MacType::I82576
    }

    /// Loopback frames carry the VLAN tag big-endian.
    pub fn rx_lb_vlan_bswap(self) -> bool {
        matches!(self, MacType::I350 | MacType::I354)
    }
}

bitflags! {
    /// Offloads the host stack asked for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OffloadCaps: u32 {
        const TX_CSUM = 1 << 0;
        const TSO = 1 << 1;
        const RX_CSUM = 1 << 2;
        const RX_HASH = 1 << 3;
        const VLAN_RX = 1 << 4;
    }
}

/// How the adapter's interrupts are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    Legacy,
    Msi,
    /// One vector per queue plus one for the other causes.
    MsiX { vectors: usize },
}

/// Interrupt throttling mode, mirroring the InterruptThrottleRate parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItrSetting {
    /// No throttling.
    Off,
    /// Adaptive, latency bands.
    Dynamic,
    /// Adaptive, but never below the `low` band.
    DynamicConservative,
    /// Fixed rate.
    Fixed { ints_per_sec: u32 },
}

impl ItrSetting {
    pub fn is_adaptive(self) -> bool {
        matches!(self, ItrSetting::Dynamic | ItrSetting::DynamicConservative)
    }

    /// EITR interval programmed when a vector is created.
    pub fn initial_interval(self) -> u32 {
        match self {
            ItrSetting::Off => 0,
            ItrSetting::Dynamic | ItrSetting::DynamicConservative => ITR_START,
            ItrSetting::Fixed { ints_per_sec } => {
                (1_000_000_000 / (ints_per_sec.max(1) as u64 * 256)) as u32
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IgbConfig {
    pub mac_type: MacType,
    pub num_queues: usize,
    pub tx_ring_count: usize,
    pub rx_ring_count: usize,
    pub interrupt_mode: InterruptMode,
    pub itr: ItrSetting,
    pub offloads: OffloadCaps,
    pub mtu: usize,
    /// Refill batch size for RX rings.
    pub rx_buffer_write: usize,
    /// Let a queue drop frames instead of stalling the shared packet buffer.
    pub rx_drop_en: bool,
}

impl Default for IgbConfig {
    fn default() -> Self {
        Self {
            mac_type: MacType::I350,
            num_queues: 1,
            tx_ring_count: DEFAULT_TXD,
            rx_ring_count: DEFAULT_RXD,
            interrupt_mode: InterruptMode::Msi,
            itr: ItrSetting::Dynamic,
            offloads: OffloadCaps::TX_CSUM
                | OffloadCaps::TSO
                | OffloadCaps::RX_CSUM
                | OffloadCaps::VLAN_RX,
            mtu: DEFAULT_MTU,
            rx_buffer_write: RX_BUFFER_WRITE,
            rx_drop_en: false,
        }
    }
}

impl IgbConfig {
    pub fn validate(&self) -> IgbResult {
        for count in [self.tx_ring_count, self.rx_ring_count] {
            if !count.is_power_of_two() || !(MIN_DESC..=MAX_DESC).contains(&count) {
                return Err(IgbError::InvalidDescriptorCount(count));
            }
        }
        if self.num_queues == 0 || self.num_queues > MAX_QUEUES {
            return Err(IgbError::InvalidQueueCount(self.num_queues));
        }
        let needed = self.vectors_needed();
        let available = match self.interrupt_mode {
            InterruptMode::Legacy | InterruptMode::Msi => 1,
            InterruptMode::MsiX { vectors } => vectors,
        };
        if available < needed {
            return Err(IgbError::InsufficientVectors { needed, available });
        }
        max_frame_for(self.mtu)?;
        if self.rx_buffer_write == 0 || self.rx_buffer_write >= self.rx_ring_count {
            return Err(IgbError::InvalidDescriptorCount(self.rx_buffer_write));
        }
        Ok(())
    }

    /// Queue vectors plus the MSI-X "other" vector.
    pub fn vectors_needed(&self) -> usize {
        match self.interrupt_mode {
            InterruptMode::Legacy | InterruptMode::Msi => self.num_queues,
            InterruptMode::MsiX { .. } => self.num_queues + 1,
        }
    }

    pub fn is_msix(&self) -> bool {
        matches!(self.interrupt_mode, InterruptMode::MsiX { .. })
    }
}

/// Largest frame for `mtu`, never below the standard Ethernet frame.
pub fn max_frame_for(mtu: usize) -> IgbResult<usize> {
    let max_frame = mtu + ETH_HLEN + ETH_FCS_LEN;
    if mtu < MIN_MTU || max_frame > MAX_JUMBO_FRAME_SIZE {
        return Err(IgbError::InvalidMtu(mtu));
    }
    Ok(max_frame.max(MAX_STD_FRAME_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(IgbConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_non_power_of_two_ring() {
        let config = IgbConfig {
            rx_ring_count: 300,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(IgbError::InvalidDescriptorCount(300)));
    }

    #[test]
    fn test_msi_cannot_serve_two_queues() {
        let config = IgbConfig {
            num_queues: 2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(IgbError::InsufficientVectors { needed: 2, available: 1 })
        );
    }

    #[test]
    fn test_msix_needs_other_vector() {
        let config = IgbConfig {
            num_queues: 4,
            interrupt_mode: InterruptMode::MsiX { vectors: 4 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = IgbConfig {
            interrupt_mode: InterruptMode::MsiX { vectors: 5 },
            ..config
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_max_frame() {
        assert_eq!(max_frame_for(1500), Ok(1518));
        assert_eq!(max_frame_for(576), Ok(1518));
        assert_eq!(max_frame_for(9000), Ok(9018));
        assert_eq!(max_frame_for(9500), Err(IgbError::InvalidMtu(9500)));
        assert_eq!(max_frame_for(10), Err(IgbError::InvalidMtu(10)));
    }

    #[test]
    fn test_revision_quirks() {
        assert!(MacType::I82575.tx_ctx_idx());
        assert!(!MacType::I82575.rx_sctp_csum_errata());
        assert!(MacType::I210.rx_sctp_csum_errata());
        assert!(MacType::I354.rx_lb_vlan_bswap());
        assert!(!MacType::I210.rx_lb_vlan_bswap());
    }

    #[test]
    fn test_fixed_itr_interval() {
        assert_eq!(ItrSetting::Fixed { ints_per_sec: 8000 }.initial_interval(), 488);
        assert_eq!(ItrSetting::Dynamic.initial_interval(), ITR_START);
    }
}
