// SPDX-License-Identifier: GPL-3.0-or-later

//! Two-slot secure bootloader core.
//!
//! Everything hardware specific is reached through traits: the SHA-256
//! block engine ([`Sha256Compress`]), the ECDSA engine ([`EcdsaVerify`])
//! and the flash drivers ([`FlashDriver`], [`SerialFlashDriver`]). The
//! library itself is `no_std` and allocation free, so the boot decision
//! logic runs unchanged on the target and under `cargo test` on the host.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

#[macro_use]
mod fmt;

mod boot;
mod config;
mod image;
mod keys;
mod port;
mod sha256;
mod slot;

#[cfg(test)]
mod testutil;

pub use {
    boot::{BootEngine, Decision, Termination},
    config::{FlashLayout, Medium, Slot, SlotRegion, S5D9, S5D9_QSPI},
    image::{
        EcdsaSign, EcdsaVerify, ImageHeader, ImageVerifier, SignError, SignatureCheck,
        VerificationResult, FIXED_OVERHEAD, HEADER_SIZE, MAGIC, SIGNATURE_SIZE,
    },
    keys::{CurveParams, PUBLIC_KEY, SECP256K1},
    port::halt,
    sha256::{Sha256Compress, Sha256Stream, BLOCK_SIZE, DIGEST_SIZE},
    slot::{FlashDriver, NoSerialFlash, SerialFlashDriver, SlotManager, MAX_PAGE_SIZE},
};

#[cfg(all(feature = "cortex-m", target_arch = "arm"))]
pub use port::{boot_main_application, system_reset, terminate};

/// Failure reported by a hardware engine or flash medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediumError {
    /// The peripheral reported an unrecoverable error.
    Fault,
    /// The peripheral stayed busy past the configured poll limit.
    Timeout,
}

impl core::fmt::Display for MediumError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            MediumError::Fault => write!(f, "flash medium fault"),
            MediumError::Timeout => write!(f, "flash medium timeout"),
        }
    }
}

/// Failure of a slot level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotError {
    /// The request does not fit the slot geometry.
    InvalidArgument,
    /// The underlying medium failed.
    Medium(MediumError),
}

impl From<MediumError> for SlotError {
    fn from(e: MediumError) -> Self {
        SlotError::Medium(e)
    }
}

impl core::fmt::Display for SlotError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            SlotError::InvalidArgument => write!(f, "invalid slot operation argument"),
            SlotError::Medium(e) => write!(f, "{}", e),
        }
    }
}
