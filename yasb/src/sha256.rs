// SPDX-License-Identifier: GPL-3.0-or-later

//! Streaming SHA-256 built on top of a block-only compression engine.
//!
//! Hardware accelerators typically expose just the compression
//! function over whole 64 byte blocks. [`Sha256Stream`] adds the
//! message schedule around it: block iteration, the `0x80` terminator,
//! zero padding and the trailing big endian bit length.

use crate::MediumError;

pub const DIGEST_SIZE: usize = 32;
pub const BLOCK_SIZE: usize = 64;

/// SHA-256 initial hash value, big endian.
pub const INITIAL_STATE: [u8; DIGEST_SIZE] = [
    0x6a, 0x09, 0xe6, 0x67, 0xbb, 0x67, 0xae, 0x85, 0x3c, 0x6e, 0xf3, 0x72, 0xa5, 0x4f, 0xf5,
    0x3a, 0x51, 0x0e, 0x52, 0x7f, 0x9b, 0x05, 0x68, 0x8c, 0x1f, 0x83, 0xd9, 0xab, 0x5b, 0xe0,
    0xcd, 0x19,
];

/// A SHA-256 block compression engine.
///
/// Implementations fold one 64 byte block into `state` in place. The
/// engine may require the block to be 32 bit aligned; [`Sha256Stream`]
/// only hands it aligned blocks.
pub trait Sha256Compress {
    fn compress(
        &self,
        state: &mut [u8; DIGEST_SIZE],
        block: &[u8; BLOCK_SIZE],
    ) -> Result<(), MediumError>;
}

#[repr(align(4))]
struct AlignedBlock([u8; BLOCK_SIZE]);

/// One-shot SHA-256 over a byte slice.
pub struct Sha256Stream<'a, H> {
    engine: &'a H,
}

impl<'a, H: Sha256Compress> Sha256Stream<'a, H> {
    pub fn new(engine: &'a H) -> Self {
        Sha256Stream { engine }
    }

    pub fn digest(&self, data: &[u8]) -> Result<[u8; DIGEST_SIZE], MediumError> {
        let mut state = INITIAL_STATE;
        let mut block = AlignedBlock([0; BLOCK_SIZE]);

        let whole = (data.len() / BLOCK_SIZE) * BLOCK_SIZE;
        let rem = data.len() % BLOCK_SIZE;

        if data.as_ptr() as usize % 4 == 0 {
            // Already word aligned, compress in place.
            for chunk in data[..whole].chunks_exact(BLOCK_SIZE) {
                // Infallible, chunks_exact yields BLOCK_SIZE slices.
                self.engine.compress(&mut state, chunk.try_into().unwrap())?;
            }
        } else {
            // Stage each block through an aligned buffer.
            for chunk in data[..whole].chunks_exact(BLOCK_SIZE) {
                block.0.copy_from_slice(chunk);
                self.engine.compress(&mut state, &block.0)?;
            }
        }

        block.0[..rem].copy_from_slice(&data[whole..]);
        block.0[rem] = 0x80;

        if BLOCK_SIZE - rem - 1 >= 8 {
            // The bit length fits after the terminator.
            block.0[rem + 1..BLOCK_SIZE - 8].fill(0);
        } else {
            // It does not, so this block is padding only and the bit
            // length goes into one more block.
            block.0[rem + 1..].fill(0);
            self.engine.compress(&mut state, &block.0)?;
            block.0[..BLOCK_SIZE - 8].fill(0);
        }

        let bits = (data.len() as u64) * 8;
        block.0[BLOCK_SIZE - 8..].copy_from_slice(&bits.to_be_bytes());
        self.engine.compress(&mut state, &block.0)?;

        Ok(state)
    }
}
