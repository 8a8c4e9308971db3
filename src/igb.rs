//! Adapter: lifecycle, interrupt demultiplexing, watchdog and reset

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::time::Duration;

use crate::config::{max_frame_for, IgbConfig, InterruptMode, MacType, OffloadCaps};
use crate::constants::*;
use crate::error::{IgbError, IgbResult};
use crate::hw::Hw;
use crate::itr::{DefaultItrPolicy, ItrPolicy};
use crate::packet::{TxPacket, TxRejected};
use crate::regs::{register_bits::*, IgbRegisters};
use crate::rx::RxRing;
use crate::state::{AdapterState, StateCell};
use crate::stats::Stats;
use crate::tx::{TxCleanContext, TxRing};
use crate::vector::{QueueVector, VectorState};
use crate::{HostStack, KernelFunc, LinkSpeed, UseKernelFunc};

/// Result of a legacy/MSI interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// The shared line was raised by another device.
    NotOurs,
    /// Causes were serviced. With `complete == false` the budget ran out and
    /// [`Igb::poll`] should be called again before the interrupt is re-armed.
    Handled { complete: bool },
}

pub struct Igb {
    hw: Hw,
    config: IgbConfig,
    state: Arc<StateCell>,
    vectors: Vec<QueueVector>,
    itr_policy: Box<dyn ItrPolicy + Send>,
    max_frame: usize,
    carrier: bool,
    link_speed: Option<LinkSpeed>,
    tx_timeout_factor: u32,
    eims_other: u32,
    eims_enable_mask: u32,
    reset_pending: bool,
    detached: bool,
    /// Adapter counters plus the totals of rings already freed.
    stats: Stats,
}

impl Igb {
    pub fn new(mmio_base: usize, config: IgbConfig) -> IgbResult<Self> {
        config.validate()?;
        let max_frame = max_frame_for(config.mtu)?;
        info!(
            "igb: {:?} at {:#x}, {} queue(s), {:?}",
            config.mac_type, mmio_base, config.num_queues, config.interrupt_mode
        );
        Ok(Self {
            hw: Hw::new(mmio_base),
            config,
            state: StateCell::new(),
            vectors: Vec::new(),
            itr_policy: Box::new(DefaultItrPolicy),
            max_frame,
            carrier: false,
            link_speed: None,
            tx_timeout_factor: 1,
            eims_other: 0,
            eims_enable_mask: 0,
            reset_pending: false,
            detached: false,
            stats: Stats::default(),
        })
    }

    /// Replace the smoothing applied to adaptive ITR updates.
    pub fn with_itr_policy(mut self, policy: impl ItrPolicy + Send + 'static) -> Self {
        self.itr_policy = Box::new(policy);
        self
    }

    pub fn config(&self) -> &IgbConfig {
        &self.config
    }

    pub fn state(&self) -> AdapterState {
        self.state.get()
    }

    /// Shared run state, for contexts that only need to observe it.
    pub fn state_handle(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    pub fn is_link_up(&self) -> bool {
        self.carrier
    }

    pub fn link_speed(&self) -> Option<LinkSpeed> {
        self.link_speed
    }

    pub fn max_frame(&self) -> usize {
        self.max_frame
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn offload_capabilities(&self) -> OffloadCaps {
        self.config.offloads
    }

    /// Offloads apply from the next packet on.
    pub fn set_offload_capabilities(&mut self, caps: OffloadCaps) {
        debug!("igb: offloads {:?} -> {:?}", self.config.offloads, caps);
        self.config.offloads = caps;
    }

    pub fn tx_ring(&self, queue: usize) -> Option<&TxRing> {
        self.vectors.get(queue).map(QueueVector::tx)
    }

    pub fn rx_ring(&self, queue: usize) -> Option<&RxRing> {
        self.vectors.get(queue).map(QueueVector::rx)
    }

    pub fn vector_state(&self, vector: usize) -> Option<VectorState> {
        self.vectors.get(vector).map(QueueVector::state)
    }

    /// Allocate rings if needed, program the hardware and enable interrupts.
    pub fn up(&mut self) -> IgbResult {
        let state = Arc::clone(&self.state);
        let mut guard = state.wait_for_reset()?;
        if guard.prior() == AdapterState::Up {
            return Ok(());
        }
        self.bring_up()?;
        guard.finish(AdapterState::Up);
        Ok(())
    }

    /// Stop traffic, reset the device and release every in-flight buffer.
    pub fn down(&mut self) -> IgbResult {
        let state = Arc::clone(&self.state);
        let mut guard = state.wait_for_reset()?;
        self.bring_down();
        guard.finish(AdapterState::Down);
        Ok(())
    }

    /// [`Igb::down`] and free the ring memory.
    pub fn close(&mut self) -> IgbResult {
        let state = Arc::clone(&self.state);
        let mut guard = state.wait_for_reset()?;
        self.bring_down();
        self.free_rings();
        guard.finish(AdapterState::Down);
        info!("igb: closed");
        Ok(())
    }

    /// Reinitialise the adapter, bringing it back up if it was running.
    pub fn reset(&mut self) -> IgbResult {
        let state = Arc::clone(&self.state);
        let mut guard = state.wait_for_reset()?;
        let was_up = guard.prior() == AdapterState::Up;
        self.reset_pending = false;
        self.stats.resets += 1;
        warn!("igb: resetting adapter");

        self.bring_down();
        guard.finish(AdapterState::Down);
        if self.hw.is_detached() {
            return Err(IgbError::Detached);
        }
        if was_up {
            self.bring_up()?;
            guard.finish(AdapterState::Up);
        }
        Ok(())
    }

    /// Run a reset scheduled from interrupt, poll or watchdog context.
    ///
    /// Returns whether a reset was performed.
    pub fn service_pending_reset(&mut self) -> IgbResult<bool> {
        if !self.reset_pending {
            return Ok(false);
        }
        self.reset()?;
        Ok(true)
    }

    pub fn set_mtu(&mut self, mtu: usize) -> IgbResult {
        let max_frame = max_frame_for(mtu)?;
        let state = Arc::clone(&self.state);
        let mut guard = state.wait_for_reset()?;
        let was_up = guard.prior() == AdapterState::Up;
        if was_up {
            self.bring_down();
            guard.finish(AdapterState::Down);
        }
        info!("igb: changing MTU from {} to {}", self.config.mtu, mtu);
        self.config.mtu = mtu;
        self.max_frame = max_frame;
        if was_up {
            self.bring_up()?;
            guard.finish(AdapterState::Up);
        }
        Ok(())
    }

    /// Queue `packet` on TX queue `queue`.
    pub fn submit(&mut self, queue: usize, packet: TxPacket) -> Result<(), TxRejected> {
        let reject = |error, packet| Err(TxRejected { error, packet });
        if !self.state.is_up() {
            return reject(IgbError::NotReady, packet);
        }
        if !self.carrier {
            return reject(IgbError::LinkDown, packet);
        }
        let caps = self.config.offloads;
        match self.vectors.get_mut(queue) {
            Some(vector) => vector.tx.submit(&self.hw, packet, caps),
            None => reject(IgbError::InvalidQueue(queue), packet),
        }
    }

    /// Legacy INTx or MSI interrupt handler.
    pub fn handle_interrupt<S: HostStack>(&mut self, stack: &mut S) -> InterruptOutcome {
        let icr = self.hw.read(IgbRegisters::Icr);
        if self.check_detached(stack) {
            return InterruptOutcome::NotOurs;
        }
        // IMS does not auto-mask unless INT_ASSERTED is set
        if self.config.interrupt_mode == InterruptMode::Legacy
            && icr & ICR_INT_ASSERTED == 0
        {
            return InterruptOutcome::NotOurs;
        }

        let mac_type = self.config.mac_type;
        if let Some(vector) = self.vectors.first_mut() {
            vector.write_itr(&self.hw, mac_type);
            vector.fire();
        }
        self.handle_causes(icr, stack);

        let complete = self.poll_vector(0, POLL_BUDGET, stack);
        InterruptOutcome::Handled { complete }
    }

    /// MSI-X handler of a queue vector. Returns whether the poll completed.
    pub fn handle_ring_interrupt<S: HostStack>(
        &mut self,
        vector: usize,
        stack: &mut S,
    ) -> IgbResult<bool> {
        let mac_type = self.config.mac_type;
        let queue_vector = self
            .vectors
            .get_mut(vector)
            .ok_or(IgbError::InvalidQueue(vector))?;
        queue_vector.write_itr(&self.hw, mac_type);
        queue_vector.fire();
        Ok(self.poll_vector(vector, POLL_BUDGET, stack))
    }

    /// MSI-X handler of the "other" causes vector.
    pub fn handle_other_interrupt<S: HostStack>(&mut self, stack: &mut S) {
        let icr = self.hw.read(IgbRegisters::Icr);
        if self.check_detached(stack) {
            return;
        }
        self.handle_causes(icr, stack);
        if icr & ICR_VMMB != 0 {
            stack.mailbox_event();
        }
        self.hw.write(IgbRegisters::Eims, self.eims_other);
    }

    /// One poll pass over `vector`. Returns whether it completed within `budget`.
    pub fn poll<S: HostStack>(
        &mut self,
        vector: usize,
        budget: usize,
        stack: &mut S,
    ) -> IgbResult<bool> {
        if vector >= self.vectors.len() {
            return Err(IgbError::InvalidQueue(vector));
        }
        Ok(self.poll_vector(vector, budget, stack))
    }

    /// Periodic housekeeping: link state, hang detection arming and a nudge
    /// for RX rings that may have stalled waiting for an interrupt. Meant to
    /// run every [`WATCHDOG_INTERVAL`].
    pub fn watchdog<S: HostStack>(&mut self, stack: &mut S) {
        if self.check_detached(stack) {
            return;
        }
        self.check_link(stack);
        if !self.state.is_up() {
            return;
        }

        // DMA stops with the link; only a reset flushes the ring
        let stuck = self
            .vectors
            .iter()
            .find(|vector| !self.carrier && vector.tx.pending())
            .map(QueueVector::index);
        if let Some(queue) = stuck {
            warn!("igb: tx queue {queue} stuck with link down");
            self.stats.tx_timeout_count += 1;
            self.reset_pending_once("transmit timeout");
            return;
        }
        for vector in self.vectors.iter_mut() {
            vector.tx.arm_hang_check();
        }

        if self.config.is_msix() {
            let eics = self
                .vectors
                .iter()
                .fold(0, |eics, vector| eics | vector.eims_value());
            self.hw.write(IgbRegisters::Eics, eics);
        } else {
            self.hw.write(IgbRegisters::Ics, ICR_RXDMT0);
        }
    }

    /// Sample STATUS and report carrier transitions. Returns the link state.
    pub fn check_link<S: HostStack>(&mut self, stack: &mut S) -> bool {
        let status = self.hw.read(IgbRegisters::Status);
        if self.check_detached(stack) {
            return false;
        }
        let link = status & STATUS_LU != 0;
        if link && !self.carrier {
            let speed = match status & STATUS_SPEED_MASK {
                STATUS_SPEED_1000 => LinkSpeed::Mbps1000,
                STATUS_SPEED_100 => LinkSpeed::Mbps100,
                _ => LinkSpeed::Mbps10,
            };
            self.tx_timeout_factor = if speed == LinkSpeed::Mbps10 {
                TX_TIMEOUT_FACTOR_10M
            } else {
                1
            };
            info!(
                "igb: link is up {} Mbps {} duplex",
                speed.mbps(),
                if status & STATUS_FD != 0 { "full" } else { "half" }
            );
            self.carrier = true;
            self.link_speed = Some(speed);
            stack.link_state_changed(true, Some(speed));
        } else if !link && self.carrier {
            info!("igb: link is down");
            self.carrier = false;
            self.link_speed = None;
            stack.link_state_changed(false, None);
        }
        link
    }

    /// Counters summed across all rings.
    pub fn stats_counters(&self) -> Stats {
        let mut stats = self.stats;
        for vector in &self.vectors {
            stats.add_tx(&vector.tx.stats);
            stats.add_rx(
                &vector.rx.stats,
                vector.rx.alloc_failed(),
                vector.rx.pool().reused,
            );
        }
        stats
    }

    fn handle_causes<S: HostStack>(&mut self, icr: u32, stack: &mut S) {
        if icr & ICR_DRSTA != 0 {
            self.reset_pending_once("device reset asserted");
        }
        if icr & ICR_DOUTSYNC != 0 {
            self.stats.doosync += 1;
        }
        if icr & (ICR_RXSEQ | ICR_LSC) != 0 && self.state.is_up() {
            self.check_link(stack);
        }
    }

    fn poll_vector<S: HostStack>(&mut self, index: usize, budget: usize, stack: &mut S) -> bool {
        let up = self.state.is_up();
        let single_vector = self.vectors.len() == 1;
        let msix = self.config.is_msix();
        let Self {
            hw,
            config,
            vectors,
            itr_policy,
            link_speed,
            carrier,
            tx_timeout_factor,
            ..
        } = self;
        let Some(vector) = vectors.get_mut(index) else {
            return true;
        };
        if !up {
            vector.set_idle();
            return true;
        }

        let tx_ctx = TxCleanContext {
            now: UseKernelFunc::monotonic_time(),
            timeout: TX_HANG_TIMEOUT * *tx_timeout_factor,
            link_up: *carrier,
        };
        let result = vector.clean_rings(hw, budget, &tx_ctx, config.offloads, stack);
        if result.complete {
            vector.update_itr(config.itr, *link_speed, single_vector, &**itr_policy);
            vector.arm(hw, msix);
        }
        if result.tx.hang {
            self.reset_pending_once("transmit hang");
        }
        result.complete
    }

    fn reset_pending_once(&mut self, reason: &str) {
        if self.reset_pending {
            return;
        }
        error!("igb: scheduling reset: {reason}");
        self.reset_pending = true;
        self.stats.reset_requests += 1;
    }

    /// Handle a detach noticed by the register block. Returns true once detached.
    fn check_detached<S: HostStack>(&mut self, stack: &mut S) -> bool {
        if !self.hw.is_detached() {
            return false;
        }
        if !self.detached {
            self.detached = true;
            error!("igb: device removed from the bus");
            if self.carrier {
                self.carrier = false;
                self.link_speed = None;
                stack.link_state_changed(false, None);
            }
            self.reset_pending_once("device detached");
        }
        true
    }

    fn bring_up(&mut self) -> IgbResult {
        if self.hw.is_detached() {
            return Err(IgbError::Detached);
        }
        if self.vectors.is_empty() {
            let mut vectors = Vec::new();
            vectors
                .try_reserve_exact(self.config.num_queues)
                .map_err(|_| IgbError::NoMemory)?;
            for index in 0..self.config.num_queues {
                vectors.push(QueueVector::new(index, &self.config).inspect_err(|e| {
                    error!("igb: queue {index} setup failed: {e}");
                })?);
            }
            self.vectors = vectors;
        }

        self.configure_tx();
        self.configure_rx();
        self.configure_interrupts();

        // clear stale causes before enabling
        self.hw.read(IgbRegisters::Icr);
        self.irq_enable();
        let msix = self.config.is_msix();
        for vector in self.vectors.iter_mut() {
            vector.arm(&self.hw, msix);
        }
        info!(
            "igb: up, {} queue(s), max frame {}",
            self.vectors.len(),
            self.max_frame
        );
        Ok(())
    }

    fn configure_tx(&mut self) {
        let mut tctl = self.hw.read(IgbRegisters::Tctl);
        tctl &= !TCTL_CT;
        tctl |= TCTL_PSP | TCTL_RTLC | COLLISION_THRESHOLD << CT_SHIFT;
        self.hw.write(IgbRegisters::Tctl, tctl);
        for vector in self.vectors.iter_mut() {
            vector.tx.configure(&self.hw);
        }
        self.hw.write(IgbRegisters::Tctl, tctl | TCTL_EN);
    }

    fn configure_rx(&mut self) {
        let caps = self.config.offloads;
        let mut rxcsum = 0;
        if caps.contains(OffloadCaps::RX_CSUM) {
            rxcsum |= RXCSUM_IPOFL | RXCSUM_TUOFL;
            if self.config.mac_type != MacType::I82575 {
                rxcsum |= RXCSUM_CRCOFL;
            }
        }
        if caps.contains(OffloadCaps::RX_HASH) {
            rxcsum |= RXCSUM_PCSD;
        }
        self.hw.write(IgbRegisters::Rxcsum, rxcsum);
        self.hw.write(IgbRegisters::Rlpml, self.max_frame as u32);

        let drop_en = self.config.rx_drop_en && self.config.num_queues > 1;
        for vector in self.vectors.iter_mut() {
            vector.rx.configure(&self.hw, drop_en);
        }

        let mut rctl = RCTL_EN | RCTL_BAM | RCTL_SECRC;
        if self.max_frame > MAX_STD_FRAME_SIZE {
            rctl |= RCTL_LPE;
        }
        self.hw.write(IgbRegisters::Rctl, rctl);
    }

    fn configure_interrupts(&mut self) {
        let mac_type = self.config.mac_type;
        let msix = self.config.is_msix();
        self.eims_enable_mask = 0;
        if msix {
            if mac_type == MacType::I82575 {
                self.hw.set_bits(
                    IgbRegisters::CtrlExt,
                    CTRL_EXT_PBA_CLR | CTRL_EXT_EIAME | CTRL_EXT_IRCA,
                );
                self.hw.write32(crate::regs::msixbm(0), EIMS_OTHER_82575);
                self.eims_other = EIMS_OTHER_82575;
            } else {
                self.hw.write(
                    IgbRegisters::Gpie,
                    GPIE_MSIX_MODE | GPIE_PBA | GPIE_EIAME | GPIE_NSICR,
                );
                self.eims_other = 1;
                self.hw.write(IgbRegisters::IvarMisc, IVAR_VALID << 8);
            }
            self.eims_enable_mask |= self.eims_other;
        }
        for vector in self.vectors.iter_mut() {
            vector.assign(&self.hw, mac_type, msix);
            self.eims_enable_mask |= vector.eims_value();
        }
    }

    fn irq_enable(&self) {
        if self.config.is_msix() {
            let mask = self.eims_enable_mask;
            self.hw.set_bits(IgbRegisters::Eiac, mask);
            self.hw.set_bits(IgbRegisters::Eiam, mask);
            self.hw.write(IgbRegisters::Eims, mask);
            self.hw.write(IgbRegisters::Ims, IMS_OTHER_MASK);
        } else {
            self.hw.write(IgbRegisters::Ims, IMS_ENABLE_MASK);
            self.hw.write(IgbRegisters::Iam, IMS_ENABLE_MASK);
        }
    }

    fn irq_disable(&self) {
        if self.config.is_msix() {
            let mask = self.eims_enable_mask;
            self.hw.clear_bits(IgbRegisters::Eiam, mask);
            self.hw.write(IgbRegisters::Eimc, mask);
            self.hw.clear_bits(IgbRegisters::Eiac, mask);
        }
        self.hw.write(IgbRegisters::Iam, 0);
        self.hw.write(IgbRegisters::Imc, u32::MAX);
        self.hw.flush();
    }

    fn bring_down(&mut self) {
        self.hw.clear_bits(IgbRegisters::Rctl, RCTL_EN);
        self.hw.clear_bits(IgbRegisters::Tctl, TCTL_EN);
        self.hw.flush();
        UseKernelFunc::busy_wait(DOWN_QUIESCE);

        self.irq_disable();
        for vector in self.vectors.iter_mut() {
            vector.set_idle();
        }
        self.carrier = false;
        self.link_speed = None;

        self.device_reset();
        for vector in self.vectors.iter_mut() {
            vector.tx.clean();
            vector.rx.clean();
        }
        debug!("igb: down");
    }

    /// Global device reset, then wait for the NVM auto-read to finish.
    fn device_reset(&mut self) {
        if self.hw.is_detached() {
            return;
        }
        self.hw.write(IgbRegisters::Imc, u32::MAX);
        self.hw.write(IgbRegisters::Rctl, 0);
        self.hw.write(IgbRegisters::Tctl, TCTL_PSP);
        self.hw.flush();
        UseKernelFunc::busy_wait(DOWN_QUIESCE);

        self.hw.set_bits(IgbRegisters::Ctrl, CTRL_RST);
        UseKernelFunc::busy_wait(Duration::from_millis(1));
        let auto_read_done = (0..RESET_POLL_ATTEMPTS).any(|_| {
            if self.hw.read(IgbRegisters::Eecd) & EECD_AUTO_RD != 0 {
                return true;
            }
            UseKernelFunc::busy_wait(Duration::from_millis(1));
            false
        });
        if !auto_read_done {
            // Happens without an NVM; the part still works.
            debug!("igb: NVM auto read did not complete after reset");
        }
        self.hw.write(IgbRegisters::Imc, u32::MAX);
        self.hw.read(IgbRegisters::Icr);
    }

    fn free_rings(&mut self) {
        for vector in self.vectors.drain(..) {
            self.stats.add_tx(&vector.tx.stats);
            self.stats.add_rx(
                &vector.rx.stats,
                vector.rx.alloc_failed(),
                vector.rx.pool().reused,
            );
        }
        self.eims_enable_mask = 0;
    }
}

impl Drop for Igb {
    fn drop(&mut self) {
        if self.state.is_up() {
            self.bring_down();
        }
    }
}
