// SPDX-License-Identifier: GPL-3.0-or-later

//! Slot level flash operations: blank check, erase, read back and
//! programming one slot from another.

use crate::{
    config::{FlashLayout, Medium, Slot},
    MediumError, SlotError,
};

/// Largest programming page of any supported medium.
pub const MAX_PAGE_SIZE: usize = 256;

/// Internal code flash driver.
///
/// Methods take `&self` since the hardware serializes access itself
/// and the driver is opened and closed around every operation.
pub trait FlashDriver {
    fn open(&self) -> Result<(), MediumError>;
    fn close(&self);

    /// Memory mapped view of `len` bytes at `addr`.
    fn area(&self, addr: u32, len: u32) -> Result<&[u8], MediumError>;

    /// Hardware blank check of `len` bytes at `addr`.
    fn blank_check(&self, addr: u32, len: u32) -> Result<bool, MediumError>;

    /// Erase `block_count` erase blocks starting at `addr`.
    fn erase(&self, addr: u32, block_count: u32) -> Result<(), MediumError>;

    /// Program `src` at `dst`. `src` covers whole pages.
    fn write(&self, src: &[u8], dst: u32) -> Result<(), MediumError>;
}

/// Memory mapped serial (QSPI) flash driver.
///
/// Serial flash has no hardware blank check and erases one block at a
/// time, reporting completion through a busy flag.
pub trait SerialFlashDriver {
    fn open(&self) -> Result<(), MediumError>;
    fn close(&self);

    fn area(&self, addr: u32, len: u32) -> Result<&[u8], MediumError>;

    /// Start erasing one block of `block_len` bytes at `addr`.
    fn erase(&self, addr: u32, block_len: u32) -> Result<(), MediumError>;

    /// Whether an erase is still running.
    fn in_progress(&self) -> Result<bool, MediumError>;
}

/// Serial flash stand-in for boards whose slots are both internal.
pub struct NoSerialFlash;

impl SerialFlashDriver for NoSerialFlash {
    fn open(&self) -> Result<(), MediumError> {
        Err(MediumError::Fault)
    }

    fn close(&self) {}

    fn area(&self, _addr: u32, _len: u32) -> Result<&[u8], MediumError> {
        Err(MediumError::Fault)
    }

    fn erase(&self, _addr: u32, _block_len: u32) -> Result<(), MediumError> {
        Err(MediumError::Fault)
    }

    fn in_progress(&self) -> Result<bool, MediumError> {
        Err(MediumError::Fault)
    }
}

#[repr(align(4))]
struct PageBuffer([u8; MAX_PAGE_SIZE]);

/// Dispatches slot operations to the driver for the slot's medium.
pub struct SlotManager<'a, F, Q> {
    layout: &'a FlashLayout,
    flash: &'a F,
    serial: &'a Q,
}

impl<'a, F: FlashDriver, Q: SerialFlashDriver> SlotManager<'a, F, Q> {
    pub fn new(layout: &'a FlashLayout, flash: &'a F, serial: &'a Q) -> Self {
        SlotManager {
            layout,
            flash,
            serial,
        }
    }

    pub fn layout(&self) -> &FlashLayout {
        self.layout
    }

    /// Whether the whole slot reads as erased.
    pub fn blank_check(&self, slot: Slot) -> Result<bool, MediumError> {
        let region = self.layout.region(slot);
        match self.layout.medium(slot) {
            Medium::Internal => {
                self.flash.open()?;
                let result = self.flash.blank_check(region.base, region.capacity);
                self.flash.close();
                result
            }
            Medium::Serial => {
                let area = self.serial.area(region.base, region.capacity)?;
                Ok(area.iter().all(|&b| b == self.layout.erased_byte))
            }
        }
    }

    /// Erase the whole slot.
    pub fn erase(&self, slot: Slot) -> Result<(), MediumError> {
        let region = self.layout.region(slot);
        match self.layout.medium(slot) {
            Medium::Internal => {
                self.flash.open()?;
                let result = self
                    .flash
                    .erase(region.base, region.capacity / region.erase_block);
                self.flash.close();
                result
            }
            Medium::Serial => {
                self.serial.open()?;
                let mut result = Ok(());
                let mut addr = region.base;
                while addr < region.base + region.capacity {
                    result = self.serial.erase(addr, region.erase_block);
                    if result.is_ok() {
                        result = self.wait_serial_idle();
                    }
                    if result.is_err() {
                        break;
                    }
                    addr += region.erase_block;
                }
                self.serial.close();
                result
            }
        }
    }

    /// Memory mapped view of the whole slot.
    pub fn image(&self, slot: Slot) -> Result<&[u8], MediumError> {
        let region = self.layout.region(slot);
        self.area_at(region.base, region.capacity)
    }

    /// Copy `len` bytes read from `src_addr` into the `dest` slot,
    /// which must be internal flash and already erased.
    ///
    /// The tail that does not fill a page is staged through a buffer
    /// prefilled with the erased byte, so the cells past the image end
    /// keep their erased value.
    pub fn program(&self, dest: Slot, src_addr: u32, len: u32) -> Result<(), SlotError> {
        let region = self.layout.region(dest);
        if len == 0 || src_addr == 0 {
            return Err(SlotError::InvalidArgument);
        }
        if self.layout.medium(dest) != Medium::Internal || len > region.capacity {
            return Err(SlotError::InvalidArgument);
        }

        let src = self.area_at(src_addr, len)?;
        let page = region.page as usize;
        let bulk = (src.len() / page) * page;

        self.flash.open()?;
        let mut result = self.flash.write(&src[..bulk], region.base);

        if result.is_ok() && bulk < src.len() {
            let mut tail = PageBuffer([self.layout.erased_byte; MAX_PAGE_SIZE]);
            tail.0[..src.len() - bulk].copy_from_slice(&src[bulk..]);
            result = self
                .flash
                .write(&tail.0[..page], region.base + bulk as u32);
        }

        self.flash.close();
        result.map_err(SlotError::Medium)
    }

    /// Resolve an address range to the medium it belongs to.
    fn area_at(&self, addr: u32, len: u32) -> Result<&[u8], MediumError> {
        let internal_end = self.layout.internal_base + self.layout.internal_size;
        if addr >= self.layout.internal_base && addr < internal_end {
            self.flash.area(addr, len)
        } else {
            self.serial.area(addr, len)
        }
    }

    fn wait_serial_idle(&self) -> Result<(), MediumError> {
        for _ in 0..self.layout.serial_poll_limit {
            if !self.serial.in_progress()? {
                return Ok(());
            }
        }
        Err(MediumError::Timeout)
    }
}
