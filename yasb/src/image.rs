// SPDX-License-Identifier: GPL-3.0-or-later

//! Image header format, signing and verification.
//!
//! An image in a slot looks like this:
//!
//! ```text
//! offset   size  field
//! 0        4     magic "YASB"
//! 4        32    ECDSA signature r, big endian
//! 36       32    ECDSA signature s, big endian
//! 68       4     length, little endian
//! 72       4     version, little endian
//! 76       180   padding
//! 256      ...   payload
//! ```
//!
//! The signature covers everything from the length field to the end of
//! the payload, so `length + 4` bytes starting at offset 68. The length
//! field itself counts the signed bytes less the version word, which
//! makes the total image size `length + 72`.

use crate::{
    keys::CurveParams,
    sha256::{Sha256Compress, Sha256Stream, DIGEST_SIZE},
    MediumError,
};

/// First four bytes of every image.
pub const MAGIC: [u8; 4] = *b"YASB";
/// Bytes before the payload starts.
pub const HEADER_SIZE: usize = 0x100;
/// r and s, 32 bytes each.
pub const SIGNATURE_SIZE: usize = 64;
/// Magic, signature and length field. Added to `length` this gives the
/// total image size.
pub const FIXED_OVERHEAD: usize = 4 + SIGNATURE_SIZE + 4;

const SIGNATURE_OFFSET: usize = 4;
const LENGTH_OFFSET: usize = 68;
const VERSION_OFFSET: usize = 72;
const PADDING_SIZE: usize = HEADER_SIZE - VERSION_OFFSET - 4;

/// Outcome of the ECDSA engine.
///
/// The discriminants are far apart in hamming distance so a single
/// glitched bit cannot turn a failure into a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum SignatureCheck {
    Pass = 0x0000_5a3c,
    Fail = 0xa5c3_0000,
}

/// An ECDSA signature verification engine.
pub trait EcdsaVerify {
    fn verify(
        &self,
        curve: &CurveParams,
        public_key: &[u8; 64],
        digest: &[u8; DIGEST_SIZE],
        r: &[u8; 32],
        s: &[u8; 32],
    ) -> Result<SignatureCheck, MediumError>;
}

/// An ECDSA signing engine, used by the host side tooling.
pub trait EcdsaSign {
    fn sign(&self, digest: &[u8; DIGEST_SIZE]) -> ([u8; 32], [u8; 32]);
}

/// Failure while building a signed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignError {
    BufferTooSmall,
    PayloadTooLong,
    Medium(MediumError),
}

impl From<MediumError> for SignError {
    fn from(e: MediumError) -> Self {
        SignError::Medium(e)
    }
}

impl core::fmt::Display for SignError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            SignError::BufferTooSmall => write!(f, "output buffer too small for image"),
            SignError::Medium(e) => write!(f, "{}", e),
            SignError::PayloadTooLong => write!(f, "payload does not fit the length field"),
        }
    }
}

/// Parsed fixed header of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub signature_r: [u8; 32],
    pub signature_s: [u8; 32],
    length: [u8; 4],
    version: [u8; 4],
}

impl ImageHeader {
    /// Parse the header out of the start of `data`. Returns `None` if
    /// there are not enough bytes or the magic does not match.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE || data[..4] != MAGIC {
            return None;
        }

        let mut header = ImageHeader {
            signature_r: [0; 32],
            signature_s: [0; 32],
            length: [0; 4],
            version: [0; 4],
        };
        header
            .signature_r
            .copy_from_slice(&data[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 32]);
        header
            .signature_s
            .copy_from_slice(&data[SIGNATURE_OFFSET + 32..SIGNATURE_OFFSET + 64]);
        header
            .length
            .copy_from_slice(&data[LENGTH_OFFSET..LENGTH_OFFSET + 4]);
        header
            .version
            .copy_from_slice(&data[VERSION_OFFSET..VERSION_OFFSET + 4]);
        Some(header)
    }

    /// Signed length in bytes, less the version word.
    pub fn length(&self) -> u32 {
        u32::from_le_bytes(self.length)
    }

    /// Monotonic firmware version.
    pub fn version(&self) -> u32 {
        u32::from_le_bytes(self.version)
    }

    /// Total size of the image including the header.
    pub fn total_size(&self) -> u32 {
        self.length().saturating_add(FIXED_OVERHEAD as u32)
    }

    /// Build a signed image for `payload` into `out` and return the
    /// number of bytes written.
    pub fn sign_to<H: Sha256Compress, S: EcdsaSign>(
        payload: &[u8],
        version: u32,
        out: &mut [u8],
        sha: &Sha256Stream<H>,
        signer: &S,
    ) -> Result<usize, SignError> {
        let total = HEADER_SIZE + payload.len();
        let length = payload.len() + PADDING_SIZE + 4;
        if u32::try_from(length).is_err() {
            return Err(SignError::PayloadTooLong);
        }
        if out.len() < total {
            return Err(SignError::BufferTooSmall);
        }

        let out = &mut out[..total];
        out[..4].copy_from_slice(&MAGIC);
        out[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE].fill(0);
        out[LENGTH_OFFSET..LENGTH_OFFSET + 4].copy_from_slice(&(length as u32).to_le_bytes());
        out[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&version.to_le_bytes());
        out[VERSION_OFFSET + 4..HEADER_SIZE].fill(0);
        out[HEADER_SIZE..].copy_from_slice(payload);

        let digest = sha.digest(&out[LENGTH_OFFSET..])?;
        let (r, s) = signer.sign(&digest);
        out[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 32].copy_from_slice(&r);
        out[SIGNATURE_OFFSET + 32..SIGNATURE_OFFSET + 64].copy_from_slice(&s);

        Ok(total)
    }
}

/// Why an image was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerificationResult {
    /// The image is authentic, carries its version.
    Valid(u32),
    /// Missing or wrong magic, or too short for a header.
    InvalidMagic,
    /// A hardware engine failed mid check.
    Medium(MediumError),
    /// The claimed length runs past the end of the slot.
    Oversized,
    /// The signature does not match the image contents.
    SignatureInvalid,
}

/// Checks a slot resident image against the signing authority key.
pub struct ImageVerifier<'a, H, E> {
    sha: Sha256Stream<'a, H>,
    ecdsa: &'a E,
    curve: &'a CurveParams,
    public_key: &'a [u8; 64],
}

impl<'a, H: Sha256Compress, E: EcdsaVerify> ImageVerifier<'a, H, E> {
    pub fn new(
        sha_engine: &'a H,
        ecdsa: &'a E,
        curve: &'a CurveParams,
        public_key: &'a [u8; 64],
    ) -> Self {
        ImageVerifier {
            sha: Sha256Stream::new(sha_engine),
            ecdsa,
            curve,
            public_key,
        }
    }

    /// Verify the image at the start of `image`. The slice spans the
    /// whole slot, so the length bound is checked against it before
    /// anything is hashed.
    pub fn verify(&self, image: &[u8]) -> VerificationResult {
        let header = match ImageHeader::parse(image) {
            Some(header) => header,
            None => return VerificationResult::InvalidMagic,
        };

        let total = header.total_size() as usize;
        if total > image.len() {
            return VerificationResult::Oversized;
        }

        let digest = match self.sha.digest(&image[LENGTH_OFFSET..total]) {
            Ok(digest) => digest,
            Err(e) => return VerificationResult::Medium(e),
        };

        match self.ecdsa.verify(
            self.curve,
            self.public_key,
            &digest,
            &header.signature_r,
            &header.signature_s,
        ) {
            Ok(SignatureCheck::Pass) => VerificationResult::Valid(header.version()),
            Ok(SignatureCheck::Fail) => VerificationResult::SignatureInvalid,
            Err(e) => VerificationResult::Medium(e),
        }
    }
}
