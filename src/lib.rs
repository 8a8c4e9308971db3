//! Packet ring pipeline for Intel igb-family gigabit Ethernet controllers
//! (82575, 82576, 82580, I350, I354, I210, I211).
//!
//! The crate drives the advanced TX/RX descriptor rings, recycles half-page RX
//! buffers, builds checksum/TSO context descriptors and runs the adaptive
//! interrupt throttling feedback loop. PCI enumeration, PHY management and the
//! OS network stack attachment live outside: the platform plugs in through
//! [`KernelFunc`] and the network stack through [`HostStack`].
#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

#[macro_use]
extern crate log;

pub mod config;
pub mod constants;
pub mod dma;
pub mod error;
pub mod hw;
pub mod igb;
pub mod itr;
pub mod offload;
pub mod packet;
pub mod page;
pub mod regs;
pub mod ring;
pub mod rx;
pub mod state;
pub mod stats;
pub mod tx;
pub mod types;
pub mod vector;

#[cfg(test)]
mod mock;

pub use config::{IgbConfig, InterruptMode, ItrSetting, MacType, OffloadCaps};
pub use error::{IgbError, IgbResult};
pub use igb::{Igb, InterruptOutcome};
pub use packet::{ChecksumDemand, RxChecksum, RxMetadata, RxPacket, TxOffload, TxPacket, TxRejected};
pub use stats::Stats;

use alloc::vec::Vec;
use memory_addr::{PhysAddr, VirtAddr};

/// Kernel function interface that must be implemented by the platform
///
/// This trait provides the necessary kernel-level operations for the driver,
/// including address translation, DMA memory management, timing, and cache operations.
#[crate_interface::def_interface]
pub trait KernelFunc {
    /// Convert virtual address to physical address
    fn virt_to_phys(addr: VirtAddr) -> PhysAddr;

    /// Convert physical address to virtual address
    fn phys_to_virt(addr: PhysAddr) -> VirtAddr;

    /// Busy-wait for the specified duration
    fn busy_wait(duration: core::time::Duration);

    /// Allocate `pages` contiguous 4K pages of DMA-coherent memory.
    ///
    /// Returns `(vaddr, paddr)`; a zero `vaddr` reports allocation failure.
    fn dma_alloc_coherent(pages: usize) -> (usize, usize);

    /// Release memory obtained from [`KernelFunc::dma_alloc_coherent`].
    fn dma_free_coherent(vaddr: usize, pages: usize);

    /// Clean (write-back) data cache range
    ///
    /// Ensures CPU-written data is flushed to memory so hardware DMA can see it.
    /// Must be called before hardware reads from a buffer (e.g., before TX).
    fn clean_dcache_range(addr: usize, size: usize);

    /// Invalidate (discard) data cache range
    ///
    /// Forces CPU to read from memory instead of cache on next access.
    /// Must be called before CPU reads hardware-written data (e.g., after RX).
    fn invalidate_dcache_range(addr: usize, size: usize);

    /// Monotonic time since an arbitrary epoch.
    fn monotonic_time() -> core::time::Duration;

    /// Whether the page at `paddr` sits on the memory node local to the device.
    fn is_local_page(paddr: PhysAddr) -> bool;
}

pub struct UseKernelFunc;

impl KernelFunc for UseKernelFunc {
    fn virt_to_phys(addr: VirtAddr) -> PhysAddr {
        crate_interface::call_interface!(KernelFunc::virt_to_phys(addr))
    }

    fn phys_to_virt(addr: PhysAddr) -> VirtAddr {
        crate_interface::call_interface!(KernelFunc::phys_to_virt(addr))
    }

    fn busy_wait(duration: core::time::Duration) {
        crate_interface::call_interface!(KernelFunc::busy_wait(duration))
    }

    fn dma_alloc_coherent(pages: usize) -> (usize, usize) {
        crate_interface::call_interface!(KernelFunc::dma_alloc_coherent(pages))
    }

    fn dma_free_coherent(vaddr: usize, pages: usize) {
        crate_interface::call_interface!(KernelFunc::dma_free_coherent(vaddr, pages))
    }

    fn clean_dcache_range(addr: usize, size: usize) {
        crate_interface::call_interface!(KernelFunc::clean_dcache_range(addr, size))
    }

    fn invalidate_dcache_range(addr: usize, size: usize) {
        crate_interface::call_interface!(KernelFunc::invalidate_dcache_range(addr, size))
    }

    fn monotonic_time() -> core::time::Duration {
        crate_interface::call_interface!(KernelFunc::monotonic_time())
    }

    fn is_local_page(paddr: PhysAddr) -> bool {
        crate_interface::call_interface!(KernelFunc::is_local_page(paddr))
    }
}

/// Link speed reported by the STATUS register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSpeed {
    Mbps10,
    Mbps100,
    Mbps1000,
}

impl LinkSpeed {
    pub fn mbps(self) -> u32 {
        match self {
            LinkSpeed::Mbps10 => 10,
            LinkSpeed::Mbps100 => 100,
            LinkSpeed::Mbps1000 => 1000,
        }
    }
}

/// Upstream network stack as seen from the ring engine.
///
/// Every poll, interrupt and watchdog entry point borrows the stack for the
/// duration of the call; the driver never keeps a reference to it.
pub trait HostStack {
    /// Allocate a CPU buffer for the copied portion of a received frame.
    fn alloc_rx_buffer(&mut self, len: usize) -> Option<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).ok()?;
        Some(buf)
    }

    /// Hand a received frame to the stack.
    fn deliver(&mut self, packet: RxPacket);

    /// A transmitted packet has been released by hardware.
    fn packet_sent(&mut self, packet: TxPacket) {
        drop(packet);
    }

    fn link_state_changed(&mut self, up: bool, speed: Option<LinkSpeed>);

    /// The queue hung and needs an adapter reset; stop feeding it.
    ///
    /// A full ring is reported through the `Busy` error of the rejected
    /// submission instead.
    fn stop_queue(&mut self, _queue: usize) {}

    /// The queue has room again after a `Busy` or a hang.
    fn wake_queue(&mut self, _queue: usize) {}

    /// A VF mailbox cause was raised.
    fn mailbox_event(&mut self) {}
}
