// SPDX-License-Identifier: GPL-3.0-or-later

//! The boot decision and its execution.
//!
//! Each boot looks at both slots once and commits to a single course
//! of action. A staged update is applied before anything runs, an
//! unverifiable update is destroyed, and any failure while copying it
//! into the main slot ends in a reset so the next boot retries from a
//! clean state.

use crate::{
    config::Slot,
    image::{EcdsaVerify, ImageVerifier, VerificationResult},
    sha256::Sha256Compress,
    slot::{FlashDriver, SerialFlashDriver, SlotManager},
};

/// Course of action for this boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    /// Update slot is blank or unreadable, main slot verifies.
    BootMain,
    /// A valid update is staged and is not older than the main image.
    ApplyUpdateThenBootMain,
    /// The staged update is invalid or older than the main image.
    DiscardUpdateThenBootMain,
    /// Applying the update failed part way through.
    Reset,
    /// No runnable image anywhere.
    Halt,
}

/// How a boot cycle hands control back to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Termination {
    /// Jump to the image in the main slot.
    BootMain,
    /// Reset the system and run the bootloader again.
    Reset,
    /// Park the CPU.
    Halt,
}

/// Ties the slot manager and image verifier together into the boot
/// flow.
pub struct BootEngine<'a, F, Q, H, E> {
    slots: SlotManager<'a, F, Q>,
    verifier: ImageVerifier<'a, H, E>,
}

impl<'a, F, Q, H, E> BootEngine<'a, F, Q, H, E>
where
    F: FlashDriver,
    Q: SerialFlashDriver,
    H: Sha256Compress,
    E: EcdsaVerify,
{
    pub fn new(slots: SlotManager<'a, F, Q>, verifier: ImageVerifier<'a, H, E>) -> Self {
        BootEngine { slots, verifier }
    }

    /// Run one boot cycle to completion.
    pub fn run(&self) -> Termination {
        match self.decide() {
            Decision::BootMain => Termination::BootMain,
            Decision::ApplyUpdateThenBootMain => self.apply_update(),
            Decision::DiscardUpdateThenBootMain => self.discard_update(),
            Decision::Reset => Termination::Reset,
            Decision::Halt => Termination::Halt,
        }
    }

    /// Inspect both slots and pick a course of action without touching
    /// flash contents.
    pub fn decide(&self) -> Decision {
        let update_blank = match self.slots.blank_check(Slot::Update) {
            Ok(blank) => blank,
            Err(e) => {
                // Unreadable update area. Ignore it rather than brick.
                warn!("update slot blank check failed: {}", e);
                return self.main_decision();
            }
        };
        if update_blank {
            return self.main_decision();
        }

        let update_version = match self.verify(Slot::Update) {
            VerificationResult::Valid(version) => version,
            result => {
                warn!("staged update rejected: {}", result);
                return Decision::DiscardUpdateThenBootMain;
            }
        };

        // An update of the same version is reapplied. That makes a
        // boot that died between programming and destroying the update
        // converge instead of looping on a half applied image.
        if update_version >= self.effective_main_version() {
            Decision::ApplyUpdateThenBootMain
        } else {
            info!("staged update v{} is a downgrade", update_version);
            Decision::DiscardUpdateThenBootMain
        }
    }

    fn verify(&self, slot: Slot) -> VerificationResult {
        match self.slots.image(slot) {
            Ok(image) => self.verifier.verify(image),
            Err(e) => VerificationResult::Medium(e),
        }
    }

    /// Version the staged update competes against. A blank, unreadable
    /// or unverifiable main slot competes as version 0, so any update
    /// wins over a slot that cannot boot anyway.
    fn effective_main_version(&self) -> u32 {
        match self.slots.blank_check(Slot::Main) {
            Ok(true) | Err(_) => 0,
            Ok(false) => match self.verify(Slot::Main) {
                VerificationResult::Valid(version) => version,
                _ => 0,
            },
        }
    }

    fn main_decision(&self) -> Decision {
        match self.verify(Slot::Main) {
            VerificationResult::Valid(version) => {
                info!("booting main image v{}", version);
                Decision::BootMain
            }
            result => {
                error!("main image rejected: {}", result);
                Decision::Halt
            }
        }
    }

    fn discard_update(&self) -> Termination {
        if let Err(e) = self.slots.erase(Slot::Update) {
            // Boot what we have anyway. The stale update will be
            // rejected again next boot.
            warn!("update slot erase failed: {}", e);
        }
        match self.main_decision() {
            Decision::BootMain => Termination::BootMain,
            _ => Termination::Halt,
        }
    }

    fn apply_update(&self) -> Termination {
        let total = match self.update_total() {
            Some(total) => total,
            None => return Termination::Reset,
        };

        let main_blank = self.slots.blank_check(Slot::Main).unwrap_or(false);
        if !main_blank {
            if let Err(e) = self.slots.erase(Slot::Main) {
                error!("main slot erase failed: {}", e);
                return Termination::Reset;
            }
        }

        let src = self.slots.layout().region(Slot::Update).base;
        if let Err(e) = self.slots.program(Slot::Main, src, total) {
            error!("programming main slot failed: {}", e);
            return Termination::Reset;
        }

        // The copy must verify on its own before the staged original
        // is destroyed.
        match self.verify(Slot::Main) {
            VerificationResult::Valid(version) => {
                info!("update v{} applied", version);
                if let Err(e) = self.slots.erase(Slot::Update) {
                    warn!("update slot erase failed: {}", e);
                }
                Termination::BootMain
            }
            result => {
                error!("applied image failed verification: {}", result);
                Termination::Reset
            }
        }
    }

    /// Total byte count of the staged update, from its header.
    fn update_total(&self) -> Option<u32> {
        let image = match self.slots.image(Slot::Update) {
            Ok(image) => image,
            Err(_) => return None,
        };
        let header = crate::image::ImageHeader::parse(image)?;
        let total = header.total_size();
        if total as usize > image.len() {
            return None;
        }
        Some(total)
    }
}
