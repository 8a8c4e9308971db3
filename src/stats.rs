//! Software counters summed across the adapter's rings

use core::fmt;

use crate::rx::RxRingStats;
use crate::tx::TxRingStats;

/// Snapshot returned by [`crate::Igb::stats_counters`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    /// Frames dropped for CRC, symbol, sequence or length errors.
    pub rx_input_errors: u64,
    pub rx_csum_err: u64,
    /// Header buffer and page allocation failures.
    pub rx_alloc_failed: u64,
    pub rx_pages_reused: u64,
    pub tx_busy: u64,
    pub tx_restart_queue: u64,
    pub tx_hangs: u64,
    /// Link lost with transmit work still queued.
    pub tx_timeout_count: u64,
    /// DMA out-of-sync interrupts.
    pub doosync: u64,
    /// Resets scheduled by hangs, device reset interrupts or detach.
    pub reset_requests: u64,
    pub resets: u64,
}

impl Stats {
    pub(crate) fn add_tx(&mut self, tx: &TxRingStats) {
        self.tx_packets += tx.packets;
        self.tx_bytes += tx.bytes;
        self.tx_busy += tx.tx_busy;
        self.tx_restart_queue += tx.restart_queue;
        self.tx_hangs += tx.hangs;
    }

    pub(crate) fn add_rx(&mut self, rx: &RxRingStats, alloc_failed: u64, reused: u64) {
        self.rx_packets += rx.packets;
        self.rx_bytes += rx.bytes;
        self.rx_input_errors += rx.input_errors;
        self.rx_csum_err += rx.csum_err;
        self.rx_alloc_failed += alloc_failed;
        self.rx_pages_reused += reused;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx_pkts: {}, tx_pkts: {}, rx_bytes: {}, tx_bytes: {}, rx_errors: {}, \
             rx_csum_err: {}, alloc_failed: {}, tx_busy: {}, restart_queue: {}, \
             tx_hangs: {}, tx_timeouts: {}, doosync: {}, resets: {}",
            self.rx_packets,
            self.tx_packets,
            self.rx_bytes,
            self.tx_bytes,
            self.rx_input_errors,
            self.rx_csum_err,
            self.rx_alloc_failed,
            self.tx_busy,
            self.tx_restart_queue,
            self.tx_hangs,
            self.tx_timeout_count,
            self.doosync,
            self.resets
        )
    }
}
