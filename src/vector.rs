//! Queue vectors: one interrupt source paired with a TX and an RX ring

use crate::config::{IgbConfig, ItrSetting, MacType, OffloadCaps};
use crate::constants::DEFAULT_TX_WORK;
use crate::error::IgbResult;
use crate::hw::Hw;
use crate::itr::{ItrPolicy, ItrState};
use crate::regs::{self, register_bits::*, IgbRegisters};
use crate::rx::{RxPollResult, RxRing};
use crate::tx::{TxCleanContext, TxCleanResult, TxRing};
use crate::{HostStack, LinkSpeed};

/// Interrupt life cycle of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorState {
    /// Interrupt masked, nothing scheduled.
    Idle,
    /// Interrupt enabled, waiting for hardware.
    Armed,
    /// Interrupt taken, cause read, poll not started.
    Firing,
    /// Rings being serviced; stays here while the budget runs out.
    Polling,
}

/// Outcome of one pass over both rings of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorPoll {
    pub tx: TxCleanResult,
    pub rx: RxPollResult,
    /// Neither ring exhausted its budget.
    pub complete: bool,
}

pub struct QueueVector {
    index: usize,
    msix_vector: usize,
    pub(crate) tx: TxRing,
    pub(crate) rx: RxRing,
    pub(crate) itr: ItrState,
    state: VectorState,
    eims_value: u32,
    itr_register: usize,
}

impl QueueVector {
    pub fn new(index: usize, config: &IgbConfig) -> IgbResult<Self> {
        let tx = TxRing::new(index, config.tx_ring_count, config.mac_type)?;
        let rx = RxRing::new(
            index,
            config.rx_ring_count,
            config.mac_type,
            config.rx_buffer_write,
        )?;
        // MSI-X vector 0 serves the "other" causes
        let msix_vector = if config.is_msix() { index + 1 } else { 0 };
        Ok(Self {
            index,
            msix_vector,
            tx,
            rx,
            itr: ItrState::new(config.itr.initial_interval()),
            state: VectorState::Idle,
            eims_value: 0,
            itr_register: regs::eitr(msix_vector),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> VectorState {
        self.state
    }

    /// EIMS/EICS bit(s) of this vector.
    pub fn eims_value(&self) -> u32 {
        self.eims_value
    }

    pub fn itr_val(&self) -> u32 {
        self.itr.val
    }

    pub fn tx(&self) -> &TxRing {
        &self.tx
    }

    pub fn rx(&self) -> &RxRing {
        &self.rx
    }

    /// Route the rings' causes to this vector and schedule the first EITR write.
    pub(crate) fn assign(&mut self, hw: &Hw, mac_type: MacType, msix: bool) {
        let queue = self.index;
        let vector = self.msix_vector as u32;
        match mac_type {
            MacType::I82575 => {
                let mut msixbm = EICR_RX_QUEUE0 << queue | EICR_TX_QUEUE0 << queue;
                if !msix && vector == 0 {
                    msixbm |= EIMS_OTHER_82575;
                }
                hw.write32(regs::msixbm(self.msix_vector), msixbm);
                self.eims_value = msixbm;
            }
            MacType::I82576 => {
                let offset = ((queue & 0x8) << 1) as u32;
                set_ivar(hw, queue & 0x7, offset, vector);
                set_ivar(hw, queue & 0x7, offset + 8, vector);
                self.eims_value = 1 << vector;
            }
            _ => {
                let offset = ((queue & 0x1) << 4) as u32;
                set_ivar(hw, queue >> 1, offset, vector);
                set_ivar(hw, queue >> 1, offset + 8, vector);
                self.eims_value = 1 << vector;
            }
        }
        self.itr_register = regs::eitr(self.msix_vector);
        self.itr.dirty = true;
    }

    /// Write the interval computed after the previous poll, if it changed.
    pub(crate) fn write_itr(&mut self, hw: &Hw, mac_type: MacType) {
        if let Some(val) = self.itr.take_pending(mac_type) {
            hw.write32(self.itr_register, val);
        }
    }

    pub(crate) fn fire(&mut self) {
        self.state = VectorState::Firing;
    }

    pub(crate) fn set_idle(&mut self) {
        self.state = VectorState::Idle;
    }

    /// Reclaim TX, then harvest RX, feeding both into the ITR counters.
    pub(crate) fn clean_rings<S: HostStack>(
        &mut self,
        hw: &Hw,
        budget: usize,
        tx_ctx: &TxCleanContext,
        caps: OffloadCaps,
        stack: &mut S,
    ) -> VectorPoll {
        self.state = VectorState::Polling;
        let tx = self.tx.reclaim_completed(hw, DEFAULT_TX_WORK, tx_ctx, stack);
        self.itr.tx.account(tx.packets, tx.bytes);
        let rx = self.rx.poll(hw, budget, caps, stack);
        self.itr.rx.account(rx.packets, rx.bytes);
        VectorPoll {
            tx,
            rx,
            complete: tx.complete && rx.complete,
        }
    }

    /// Recompute the interval after a completed poll.
    pub(crate) fn update_itr(
        &mut self,
        setting: ItrSetting,
        speed: Option<LinkSpeed>,
        single_vector: bool,
        policy: &dyn ItrPolicy,
    ) {
        if !setting.is_adaptive() {
            return;
        }
        let conservative = setting == ItrSetting::DynamicConservative;
        if single_vector {
            self.itr.set_itr(speed, conservative, policy);
        } else {
            self.itr.update_ring_itr(speed, conservative);
        }
    }

    /// Re-enable this vector's interrupt.
    pub(crate) fn arm(&mut self, hw: &Hw, msix: bool) {
        if msix {
            hw.write(IgbRegisters::Eims, self.eims_value);
        } else {
            hw.write(IgbRegisters::Ims, IMS_ENABLE_MASK);
        }
        self.state = VectorState::Armed;
    }
}

/// Point one byte lane of IVAR `index` at `vector`.
fn set_ivar(hw: &Hw, index: usize, offset: u32, vector: u32) {
    let mut ivar = hw.read32(regs::ivar(index));
    ivar &= !(0xFF << offset);
    ivar |= (vector | IVAR_VALID) << offset;
    hw.write32(regs::ivar(index), ivar);
}
