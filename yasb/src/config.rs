// SPDX-License-Identifier: GPL-3.0-or-later

//! Flash geometry. Slot placement, erase block and page sizes are
//! board facts, so they live in one table instead of being spread
//! through the drivers.

/// Firmware slot selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    /// The slot that is executed after a successful boot.
    Main,
    /// The staging slot a new image is written to before it is applied.
    Update,
}

/// Physical medium backing a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Medium {
    /// Code flash inside the microcontroller.
    Internal,
    /// Memory mapped serial (QSPI) flash.
    Serial,
}

/// Geometry of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRegion {
    /// First byte of the slot in the address space.
    pub base: u32,
    /// Slot capacity in bytes, a multiple of `erase_block`.
    pub capacity: u32,
    /// Smallest erasable unit in bytes.
    pub erase_block: u32,
    /// Programming granularity in bytes.
    pub page: u32,
}

/// Full flash layout of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    /// Start of the internal code flash address range.
    pub internal_base: u32,
    /// Length of the internal code flash address range.
    pub internal_size: u32,
    pub main: SlotRegion,
    pub update: SlotRegion,
    /// Byte value every erased cell reads back as.
    pub erased_byte: u8,
    /// Upper bound on busy polls of the serial flash before giving up.
    pub serial_poll_limit: u32,
}

impl FlashLayout {
    pub const fn region(&self, slot: Slot) -> &SlotRegion {
        match slot {
            Slot::Main => &self.main,
            Slot::Update => &self.update,
        }
    }

    /// Medium a slot lives on, judged by its base address.
    pub const fn medium(&self, slot: Slot) -> Medium {
        let base = self.region(slot).base;
        if base >= self.internal_base && base < self.internal_base + self.internal_size {
            Medium::Internal
        } else {
            Medium::Serial
        }
    }
}

/// S5D9 with both slots in internal code flash.
pub const S5D9: FlashLayout = FlashLayout {
    internal_base: 0x0000_0000,
    internal_size: 0x0020_0000,
    main: SlotRegion {
        base: 0x0001_0000,
        capacity: 0x000F_8000,
        erase_block: 0x8000,
        page: 128,
    },
    update: SlotRegion {
        base: 0x0010_8000,
        capacity: 0x000F_8000,
        erase_block: 0x8000,
        page: 128,
    },
    erased_byte: 0xff,
    serial_poll_limit: 1_000_000,
};

/// S5D9 with the update slot in memory mapped QSPI flash, which frees
/// most of the code flash for the main image.
pub const S5D9_QSPI: FlashLayout = FlashLayout {
    internal_base: 0x0000_0000,
    internal_size: 0x0020_0000,
    main: SlotRegion {
        base: 0x0001_0000,
        capacity: 0x001F_0000,
        erase_block: 0x8000,
        page: 128,
    },
    update: SlotRegion {
        base: 0x6000_0000,
        capacity: 0x001F_0000,
        erase_block: 0x8000,
        page: 256,
    },
    erased_byte: 0xff,
    serial_poll_limit: 1_000_000,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_is_derived_from_base_address() {
        assert_eq!(S5D9.medium(Slot::Main), Medium::Internal);
        assert_eq!(S5D9.medium(Slot::Update), Medium::Internal);
        assert_eq!(S5D9_QSPI.medium(Slot::Main), Medium::Internal);
        assert_eq!(S5D9_QSPI.medium(Slot::Update), Medium::Serial);
    }

    #[test]
    fn slot_capacities_are_erase_aligned() {
        for layout in [S5D9, S5D9_QSPI] {
            for slot in [Slot::Main, Slot::Update] {
                let r = layout.region(slot);
                assert_eq!(r.capacity % r.erase_block, 0);
                assert_eq!(r.base % r.erase_block, 0);
                assert_eq!(r.erase_block % r.page, 0);
            }
        }
    }
}
