//! Memory-mapped register block

use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::regs::IgbRegisters;

/// MMIO window of one controller.
///
/// A read returning all-ones that is confirmed by an all-ones read of CTRL
/// means the device fell off the bus: the base is dropped, every later read
/// returns all-ones and writes go nowhere.
pub struct Hw {
    mmio_base: AtomicUsize,
}

impl Hw {
    pub fn new(mmio_base: usize) -> Self {
        Self {
            mmio_base: AtomicUsize::new(mmio_base),
        }
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.mmio_base.load(Ordering::Acquire) == 0
    }

    /// Read 32-bit register
    #[inline]
    pub fn read32(&self, reg: usize) -> u32 {
        let base = self.mmio_base.load(Ordering::Acquire);
        if base == 0 {
            return u32::MAX;
        }
        let value = unsafe { read_volatile((base + reg) as *const u32) };
        if value == u32::MAX
            && (reg == IgbRegisters::Ctrl.offset()
                || unsafe { read_volatile(base as *const u32) } == u32::MAX)
        {
            error!("igb: register read at {reg:#x} returned all-ones, device detached");
            self.mmio_base.store(0, Ordering::Release);
        }
        value
    }

    /// Write 32-bit register
    #[inline]
    pub fn write32(&self, reg: usize, val: u32) {
        let base = self.mmio_base.load(Ordering::Acquire);
        if base == 0 {
            return;
        }
        unsafe { write_volatile((base + reg) as *mut u32, val) }
    }

    #[inline]
    pub fn read(&self, reg: IgbRegisters) -> u32 {
        self.read32(reg.offset())
    }

    #[inline]
    pub fn write(&self, reg: IgbRegisters, val: u32) {
        self.write32(reg.offset(), val)
    }

    pub fn set_bits(&self, reg: IgbRegisters, bits: u32) {
        self.write(reg, self.read(reg) | bits);
    }

    pub fn clear_bits(&self, reg: IgbRegisters, bits: u32) {
        self.write(reg, self.read(reg) & !bits);
    }

    /// Post outstanding writes by reading STATUS back.
    #[inline]
    pub fn flush(&self) {
        let _ = self.read(IgbRegisters::Status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FakeRegs;
    use crate::regs::{register_bits::*, IgbRegisters::*};

    #[test]
    fn test_read_write() {
        let regs = FakeRegs::new();
        let hw = Hw::new(regs.base());
        hw.write(Rctl, RCTL_EN);
        hw.set_bits(Rctl, RCTL_LPE);
        assert_eq!(regs.get(Rctl.offset()), RCTL_EN | RCTL_LPE);
        hw.clear_bits(Rctl, RCTL_EN);
        assert_eq!(hw.read(Rctl), RCTL_LPE);
    }

    #[test]
    fn test_all_ones_read_detaches() {
        let regs = FakeRegs::new();
        let hw = Hw::new(regs.base());
        regs.set(Ctrl.offset(), u32::MAX);
        regs.set(Status.offset(), u32::MAX);
        assert_eq!(hw.read(Status), u32::MAX);
        assert!(hw.is_detached());
        hw.write(Rctl, RCTL_EN);
        assert_eq!(regs.get(Rctl.offset()), 0);
        assert_eq!(hw.read(Rctl), u32::MAX);
    }

    #[test]
    fn test_all_ones_value_with_live_ctrl_is_not_a_detach() {
        let regs = FakeRegs::new();
        let hw = Hw::new(regs.base());
        regs.set(Ims.offset(), u32::MAX);
        assert_eq!(hw.read(Ims), u32::MAX);
        assert!(!hw.is_detached());
    }
}
