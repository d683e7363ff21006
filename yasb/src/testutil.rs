// SPDX-License-Identifier: GPL-3.0-or-later

//! Host side stand-ins for the hardware: an in-memory flash that
//! implements both driver traits and software SHA-256 and ECDSA
//! engines backed by the `sha2` and `secp256k1` crates.

use {
    crate::{
        config::{FlashLayout, Medium, Slot, SlotRegion},
        image::{EcdsaSign, EcdsaVerify, ImageHeader, SignatureCheck},
        keys::CurveParams,
        sha256::{Sha256Compress, Sha256Stream, BLOCK_SIZE, DIGEST_SIZE},
        slot::{FlashDriver, SerialFlashDriver},
        MediumError,
    },
    core::cell::{Cell, UnsafeCell},
    secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey},
    sha2::{compress256, digest::generic_array::GenericArray},
    std::vec::Vec,
};

/// Small two slot layout with everything in internal flash.
pub fn layout_internal() -> FlashLayout {
    FlashLayout {
        internal_base: 0x0000_0000,
        internal_size: 0x1_0000,
        main: SlotRegion {
            base: 0x1000,
            capacity: 0x2000,
            erase_block: 0x800,
            page: 128,
        },
        update: SlotRegion {
            base: 0x3000,
            capacity: 0x2000,
            erase_block: 0x800,
            page: 128,
        },
        erased_byte: 0xff,
        serial_poll_limit: 16,
    }
}

/// Same as [`layout_internal`] but with the update slot on serial
/// flash.
pub fn layout_serial() -> FlashLayout {
    FlashLayout {
        update: SlotRegion {
            base: 0x6000_0000,
            capacity: 0x2000,
            erase_block: 0x800,
            page: 256,
        },
        ..layout_internal()
    }
}

struct MemRegion {
    base: u32,
    mem: UnsafeCell<Vec<u8>>,
}

/// In-memory flash covering the internal range and, when the layout
/// has one, the serial update region.
///
/// The failure knobs make a single operation kind fail so the callers'
/// error paths can be driven from tests.
pub struct MemFlash {
    regions: Vec<MemRegion>,
    erased: u8,
    erase_block: u32,
    pub fail_open: Cell<bool>,
    pub fail_blank_check: Cell<bool>,
    pub fail_erase: Cell<bool>,
    pub fail_write: Cell<bool>,
    /// Flip a bit in every write so the data read back differs.
    pub corrupt_writes: Cell<bool>,
    /// Serial erase busy flag never clears.
    pub stuck: Cell<bool>,
    busy_polls: Cell<u32>,
    pub erase_calls: Cell<u32>,
    pub write_calls: Cell<u32>,
}

impl MemFlash {
    pub fn new(layout: &FlashLayout) -> Self {
        let mut regions = vec![MemRegion {
            base: layout.internal_base,
            mem: UnsafeCell::new(vec![layout.erased_byte; layout.internal_size as usize]),
        }];
        if layout.medium(Slot::Update) == Medium::Serial {
            regions.push(MemRegion {
                base: layout.update.base,
                mem: UnsafeCell::new(vec![
                    layout.erased_byte;
                    layout.update.capacity as usize
                ]),
            });
        }
        MemFlash {
            regions,
            erased: layout.erased_byte,
            erase_block: layout.main.erase_block,
            fail_open: Cell::new(false),
            fail_blank_check: Cell::new(false),
            fail_erase: Cell::new(false),
            fail_write: Cell::new(false),
            corrupt_writes: Cell::new(false),
            stuck: Cell::new(false),
            busy_polls: Cell::new(0),
            erase_calls: Cell::new(0),
            write_calls: Cell::new(0),
        }
    }

    fn region_of(&self, addr: u32, len: usize) -> Result<(&MemRegion, usize), MediumError> {
        for region in &self.regions {
            let size = unsafe { (*region.mem.get()).len() };
            let start = addr.wrapping_sub(region.base) as usize;
            if addr >= region.base && start + len <= size {
                return Ok((region, start));
            }
        }
        Err(MediumError::Fault)
    }

    fn view(&self, addr: u32, len: usize) -> Result<&[u8], MediumError> {
        let (region, start) = self.region_of(addr, len)?;
        let mem = unsafe { &*region.mem.get() };
        Ok(&mem[start..start + len])
    }

    /// Raw store, bypassing the driver interface.
    fn store(&self, addr: u32, data: &[u8]) {
        let (region, start) = self.region_of(addr, data.len()).unwrap();
        unsafe {
            let mem = region.mem.get();
            core::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (*mem).as_mut_ptr().add(start),
                data.len(),
            );
        }
    }

    fn set_byte(&self, addr: u32, value: u8) {
        self.store(addr, &[value]);
    }

    pub fn fill(&self, addr: u32, data: &[u8]) {
        self.store(addr, data);
    }

    pub fn read_back(&self, addr: u32, len: usize) -> Vec<u8> {
        self.view(addr, len).unwrap().to_vec()
    }

    pub fn is_blank(&self, addr: u32, len: u32) -> bool {
        self.view(addr, len as usize)
            .unwrap()
            .iter()
            .all(|&b| b == self.erased)
    }

    fn erase_range(&self, addr: u32, len: usize) {
        let erased = vec![self.erased; len];
        self.store(addr, &erased);
    }
}

impl FlashDriver for MemFlash {
    fn open(&self) -> Result<(), MediumError> {
        if self.fail_open.get() {
            return Err(MediumError::Fault);
        }
        Ok(())
    }

    fn close(&self) {}

    fn area(&self, addr: u32, len: u32) -> Result<&[u8], MediumError> {
        self.view(addr, len as usize)
    }

    fn blank_check(&self, addr: u32, len: u32) -> Result<bool, MediumError> {
        if self.fail_blank_check.get() {
            return Err(MediumError::Fault);
        }
        Ok(self
            .view(addr, len as usize)?
            .iter()
            .all(|&b| b == self.erased))
    }

    fn erase(&self, addr: u32, block_count: u32) -> Result<(), MediumError> {
        if self.fail_erase.get() {
            return Err(MediumError::Fault);
        }
        self.erase_calls.set(self.erase_calls.get() + 1);
        let len = (block_count * self.erase_block) as usize;
        self.region_of(addr, len)?;
        self.erase_range(addr, len);
        Ok(())
    }

    fn write(&self, src: &[u8], dst: u32) -> Result<(), MediumError> {
        if self.fail_write.get() {
            return Err(MediumError::Fault);
        }
        if src.is_empty() {
            return Ok(());
        }
        self.write_calls.set(self.write_calls.get() + 1);
        self.region_of(dst, src.len())?;
        self.store(dst, src);
        if self.corrupt_writes.get() {
            self.set_byte(dst, src[0] ^ 0x04);
        }
        Ok(())
    }
}

impl SerialFlashDriver for MemFlash {
    fn open(&self) -> Result<(), MediumError> {
        if self.fail_open.get() {
            return Err(MediumError::Fault);
        }
        Ok(())
    }

    fn close(&self) {}

    fn area(&self, addr: u32, len: u32) -> Result<&[u8], MediumError> {
        self.view(addr, len as usize)
    }

    fn erase(&self, addr: u32, block_len: u32) -> Result<(), MediumError> {
        if self.fail_erase.get() {
            return Err(MediumError::Fault);
        }
        self.erase_calls.set(self.erase_calls.get() + 1);
        self.region_of(addr, block_len as usize)?;
        self.erase_range(addr, block_len as usize);
        self.busy_polls.set(2);
        Ok(())
    }

    fn in_progress(&self) -> Result<bool, MediumError> {
        if self.stuck.get() {
            return Ok(true);
        }
        let polls = self.busy_polls.get();
        if polls > 0 {
            self.busy_polls.set(polls - 1);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Software SHA-256 block engine.
pub struct SoftSha {
    pub compress_calls: Cell<u32>,
    /// Error out after this many successful compressions.
    pub fail_after: Cell<Option<u32>>,
}

impl SoftSha {
    pub fn new() -> Self {
        SoftSha {
            compress_calls: Cell::new(0),
            fail_after: Cell::new(None),
        }
    }
}

impl Sha256Compress for SoftSha {
    fn compress(
        &self,
        state: &mut [u8; DIGEST_SIZE],
        block: &[u8; BLOCK_SIZE],
    ) -> Result<(), MediumError> {
        if let Some(limit) = self.fail_after.get() {
            if self.compress_calls.get() >= limit {
                return Err(MediumError::Fault);
            }
        }
        self.compress_calls.set(self.compress_calls.get() + 1);

        let mut words = [0u32; 8];
        for (word, chunk) in words.iter_mut().zip(state.chunks_exact(4)) {
            *word = u32::from_be_bytes(chunk.try_into().unwrap());
        }
        compress256(
            &mut words,
            core::slice::from_ref(GenericArray::from_slice(block)),
        );
        for (chunk, word) in state.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Ok(())
    }
}

/// Software ECDSA verification over secp256k1.
pub struct SoftEcdsa;

impl EcdsaVerify for SoftEcdsa {
    fn verify(
        &self,
        _curve: &CurveParams,
        public_key: &[u8; 64],
        digest: &[u8; DIGEST_SIZE],
        r: &[u8; 32],
        s: &[u8; 32],
    ) -> Result<SignatureCheck, MediumError> {
        let mut uncompressed = [0u8; 65];
        uncompressed[0] = 0x04;
        uncompressed[1..].copy_from_slice(public_key);
        let key = match PublicKey::from_slice(&uncompressed) {
            Ok(key) => key,
            Err(_) => return Ok(SignatureCheck::Fail),
        };

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(r);
        compact[32..].copy_from_slice(s);
        let signature = match Signature::from_compact(&compact) {
            Ok(signature) => signature,
            Err(_) => return Ok(SignatureCheck::Fail),
        };

        let secp = Secp256k1::verification_only();
        let message = Message::from_digest(*digest);
        Ok(match secp.verify_ecdsa(&message, &signature, &key) {
            Ok(()) => SignatureCheck::Pass,
            Err(_) => SignatureCheck::Fail,
        })
    }
}

/// Signs with a fixed throwaway key.
pub struct TestSigner {
    secret: SecretKey,
}

impl TestSigner {
    pub fn new() -> Self {
        TestSigner {
            secret: SecretKey::from_slice(&[7; 32]).unwrap(),
        }
    }

    /// A second, different key.
    pub fn other() -> Self {
        TestSigner {
            secret: SecretKey::from_slice(&[9; 32]).unwrap(),
        }
    }

    pub fn public_key(&self) -> [u8; 64] {
        let secp = Secp256k1::new();
        let uncompressed = self.secret.public_key(&secp).serialize_uncompressed();
        uncompressed[1..].try_into().unwrap()
    }
}

impl EcdsaSign for TestSigner {
    fn sign(&self, digest: &[u8; DIGEST_SIZE]) -> ([u8; 32], [u8; 32]) {
        let secp = Secp256k1::new();
        let signature = secp.sign_ecdsa(&Message::from_digest(*digest), &self.secret);
        let compact = signature.serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        (r, s)
    }
}

/// A complete signed image built with [`TestSigner`].
pub fn signed_image(version: u32, payload: &[u8], signer: &TestSigner) -> Vec<u8> {
    let engine = SoftSha::new();
    let sha = Sha256Stream::new(&engine);
    let mut out = vec![0u8; crate::image::HEADER_SIZE + payload.len()];
    let written = ImageHeader::sign_to(payload, version, &mut out, &sha, signer).unwrap();
    out.truncate(written);
    out
}
