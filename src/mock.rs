//! Test platform: heap-backed DMA, a settable clock and a fake register file.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use std::vec::Vec;

use memory_addr::{PhysAddr, VirtAddr};

use crate::constants::PAGE_SIZE;
use crate::packet::{RxPacket, TxPacket};
use crate::{HostStack, KernelFunc, LinkSpeed};

thread_local! {
    static CLOCK: Cell<Duration> = const { Cell::new(Duration::ZERO) };
    static FAIL_DMA: Cell<usize> = const { Cell::new(0) };
    static PAGES_LOCAL: Cell<bool> = const { Cell::new(true) };
    static LIVE: RefCell<HashMap<usize, usize>> = RefCell::new(HashMap::new());
}

struct MockKernel;

#[crate_interface::impl_interface]
impl KernelFunc for MockKernel {
    fn virt_to_phys(addr: VirtAddr) -> PhysAddr {
        PhysAddr::from(addr.as_usize())
    }

    fn phys_to_virt(addr: PhysAddr) -> VirtAddr {
        VirtAddr::from(addr.as_usize())
    }

    fn busy_wait(duration: Duration) {
        advance_time(duration);
    }

    fn dma_alloc_coherent(pages: usize) -> (usize, usize) {
        if FAIL_DMA.with(|f| {
            let n = f.get();
            f.set(n.saturating_sub(1));
            n > 0
        }) {
            return (0, 0);
        }
        let layout = Layout::from_size_align(pages * PAGE_SIZE, PAGE_SIZE).unwrap();
        let vaddr = unsafe { alloc_zeroed(layout) } as usize;
        LIVE.with(|live| live.borrow_mut().insert(vaddr, pages));
        (vaddr, vaddr)
    }

    fn dma_free_coherent(vaddr: usize, pages: usize) {
        let recorded = LIVE.with(|live| live.borrow_mut().remove(&vaddr));
        assert_eq!(recorded, Some(pages), "double free or size mismatch at {vaddr:#x}");
        let layout = Layout::from_size_align(pages * PAGE_SIZE, PAGE_SIZE).unwrap();
        unsafe { dealloc(vaddr as *mut u8, layout) };
    }

    fn clean_dcache_range(_addr: usize, _size: usize) {}

    fn invalidate_dcache_range(_addr: usize, _size: usize) {}

    fn monotonic_time() -> Duration {
        CLOCK.with(Cell::get)
    }

    fn is_local_page(_paddr: PhysAddr) -> bool {
        PAGES_LOCAL.with(Cell::get)
    }
}

pub fn advance_time(d: Duration) {
    CLOCK.with(|c| c.set(c.get() + d));
}

/// Fail the next `n` coherent allocations on this thread.
pub fn fail_dma_allocs(n: usize) {
    FAIL_DMA.with(|f| f.set(n));
}

pub fn set_pages_local(local: bool) {
    PAGES_LOCAL.with(|l| l.set(local));
}

/// Coherent pages currently allocated on this thread.
pub fn live_dma_pages() -> usize {
    LIVE.with(|live| live.borrow().values().sum())
}

/// 64K of fake device registers.
pub struct FakeRegs {
    words: Vec<AtomicU32>,
}

impl FakeRegs {
    pub fn new() -> Self {
        Self {
            words: (0..0x10000 / 4).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn get(&self, reg: usize) -> u32 {
        self.words[reg / 4].load(Ordering::SeqCst)
    }

    pub fn set(&self, reg: usize, val: u32) {
        self.words[reg / 4].store(val, Ordering::SeqCst);
    }
}

/// Host stack that records every callback.
#[derive(Default)]
pub struct TestStack {
    pub delivered: Vec<RxPacket>,
    pub sent: Vec<TxPacket>,
    pub links: Vec<(bool, Option<LinkSpeed>)>,
    pub stopped: Vec<usize>,
    pub woken: Vec<usize>,
    pub mailbox: usize,
    pub fail_allocs: usize,
}

impl HostStack for TestStack {
    fn alloc_rx_buffer(&mut self, len: usize) -> Option<Vec<u8>> {
        if self.fail_allocs > 0 {
            self.fail_allocs -= 1;
            return None;
        }
        Some(Vec::with_capacity(len))
    }

    fn deliver(&mut self, packet: RxPacket) {
        self.delivered.push(packet);
    }

    fn packet_sent(&mut self, packet: TxPacket) {
        self.sent.push(packet);
    }

    fn link_state_changed(&mut self, up: bool, speed: Option<LinkSpeed>) {
        self.links.push((up, speed));
    }

    fn stop_queue(&mut self, queue: usize) {
        self.stopped.push(queue);
    }

    fn wake_queue(&mut self, queue: usize) {
        self.woken.push(queue);
    }

    fn mailbox_event(&mut self) {
        self.mailbox += 1;
    }
}

fn eth_header(ethertype: u16) -> Vec<u8> {
    let mut frame = vec![0x02, 0, 0, 0, 0, 0x02, 0x02, 0, 0, 0, 0, 0x01];
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame
}

fn ipv4_header(proto: u8, l4_total: usize) -> Vec<u8> {
    let tot_len = (20 + l4_total) as u16;
    let mut ip = vec![0x45, 0];
    ip.extend_from_slice(&tot_len.to_be_bytes());
    ip.extend_from_slice(&[0x12, 0x34, 0x40, 0x00, 64, proto, 0xAB, 0xCD]);
    ip.extend_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2]);
    ip
}

fn tcp_header() -> Vec<u8> {
    let mut th = vec![0x30, 0x39, 0x00, 0x50];
    th.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0]);
    th.extend_from_slice(&[5 << 4, 0x18, 0xFF, 0xFF, 0xBE, 0xEF, 0, 0]);
    th
}

fn payload(len: usize) -> impl Iterator<Item = u8> {
    (0..len).map(|i| i as u8)
}

/// Ethernet + IPv4 + TCP (no options) with `payload_len` bytes of payload.
pub fn ipv4_tcp_frame(payload_len: usize) -> Vec<u8> {
    let mut frame = eth_header(crate::constants::ETH_P_IP);
    frame.extend(ipv4_header(crate::constants::IPPROTO_TCP, 20 + payload_len));
    frame.extend(tcp_header());
    frame.extend(payload(payload_len));
    frame
}

pub fn ipv4_udp_frame(payload_len: usize) -> Vec<u8> {
    let mut frame = eth_header(crate::constants::ETH_P_IP);
    frame.extend(ipv4_header(crate::constants::IPPROTO_UDP, 8 + payload_len));
    let udp_len = (8 + payload_len) as u16;
    frame.extend_from_slice(&[0x30, 0x39, 0x00, 0x35]);
    frame.extend_from_slice(&udp_len.to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend(payload(payload_len));
    frame
}

pub fn ipv6_tcp_frame(payload_len: usize) -> Vec<u8> {
    let mut frame = eth_header(crate::constants::ETH_P_IPV6);
    let plen = (20 + payload_len) as u16;
    frame.extend_from_slice(&[0x60, 0, 0, 0]);
    frame.extend_from_slice(&plen.to_be_bytes());
    frame.extend_from_slice(&[crate::constants::IPPROTO_TCP, 64]);
    frame.extend((0..16).map(|i| if i == 0 { 0xfe } else { i as u8 }));
    frame.extend((0..16).map(|i| if i == 0 { 0xfe } else { 0x10 + i as u8 }));
    frame.extend(tcp_header());
    frame.extend(payload(payload_len));
    frame
}
