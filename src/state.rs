//! Adapter run state and the reset guard

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::constants::{RESET_WAIT_ATTEMPTS, RESET_WAIT_STEP};
use crate::error::{IgbError, IgbResult};
use crate::{KernelFunc, UseKernelFunc};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Down = 0,
    Up = 1,
    /// A reset or reconfiguration owns the hardware.
    Resetting = 2,
}

impl AdapterState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => AdapterState::Up,
            2 => AdapterState::Resetting,
            _ => AdapterState::Down,
        }
    }
}

/// Shared run state, observed by poll paths and claimed by reconfiguration.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(AtomicU8::new(AdapterState::Down as u8)))
    }

    #[inline]
    pub fn get(&self) -> AdapterState {
        AdapterState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.get() == AdapterState::Up
    }

    /// Claim the adapter for a reset. Fails while another guard is alive.
    pub fn try_begin_reset(self: &Arc<Self>) -> Option<ResetGuard> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current == AdapterState::Resetting as u8 {
                return None;
            }
            match self.0.compare_exchange_weak(
                current,
                AdapterState::Resetting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let prior = AdapterState::from_u8(current);
                    return Some(ResetGuard {
                        cell: Arc::clone(self),
                        prior,
                        next: prior,
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Claim the adapter, sleeping between attempts while another reset runs.
    pub fn wait_for_reset(self: &Arc<Self>) -> IgbResult<ResetGuard> {
        for _ in 0..RESET_WAIT_ATTEMPTS {
            if let Some(guard) = self.try_begin_reset() {
                return Ok(guard);
            }
            UseKernelFunc::busy_wait(RESET_WAIT_STEP);
        }
        warn!("igb: gave up waiting for a concurrent reset");
        Err(IgbError::ResetTimeout)
    }
}

/// Exclusive claim on the adapter. Dropping it publishes the final state.
#[derive(Debug)]
pub struct ResetGuard {
    cell: Arc<StateCell>,
    prior: AdapterState,
    next: AdapterState,
}

impl ResetGuard {
    /// State the adapter was in when the guard was taken.
    pub fn prior(&self) -> AdapterState {
        self.prior
    }

    /// State to publish when the guard is released. Defaults to the prior one.
    pub fn finish(&mut self, state: AdapterState) {
        self.next = state;
    }
}

impl Drop for ResetGuard {
    fn drop(&mut self) {
        self.cell.0.store(self.next as u8, Ordering::Release);
    }
}
