//! Byte-at-a-time decryption of a secret that an ECB oracle appends to attacker input.
//!
//! The attack never needs the key. It shifts the secret with filler so that exactly one unknown
//! byte sits at the end of a block, then brute forces that byte by encrypting blocks whose other
//! bytes are already known and comparing ciphertext blocks.

use crate::{
    ecb::{adjacent_repeats, guess_uses_ecb, is_likely_ecb},
    error::{Error, Result},
    oracle::EncryptionOracle,
    padding::unpad_pkcs7,
};
use tracing::{debug, instrument, trace, warn};

/// Options for the attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteAtATime {
    /// The byte used to fill and shift input.
    pub filler: u8,
    /// Candidates are tried from 0 up to, but not including, this value. The default of 128 only
    /// recovers ASCII secrets; use 256 for binary ones.
    pub candidates_end: u16,
    /// Largest block size probed for.
    pub max_block_size: usize,
}

impl Default for ByteAtATime {
    fn default() -> Self {
        ByteAtATime {
            filler: b'A',
            candidates_end: 128,
            max_block_size: 64,
        }
    }
}

/// Bytes recovered from an oracle's output, one per ciphertext byte of the oracle's empty-input
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    /// The recovered bytes in order. Positions where no candidate matched hold the filler length
    /// that was used for that position.
    pub bytes: Vec<u8>,
    /// The first position where no candidate matched. The secret's own bytes all match, and so
    /// does the single `0x01` padding byte that follows them; the next position cannot match
    /// because the oracle's padding has moved on.
    pub end_of_secret: Option<usize>,
    block_size: usize,
}

impl Recovery {
    /// The secret with the trailing padding byte and the unmatched tail trimmed off.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        match self.end_of_secret {
            Some(end) => {
                let matched = &self.bytes[..end];
                matched.strip_suffix(&[1]).unwrap_or(matched)
            }
            None => unpad_pkcs7(&self.bytes, self.block_size).unwrap_or(&self.bytes),
        }
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

/// The first block index where both outputs repeat a block, with different contents in each.
///
/// The two outputs come from same-length runs of two different filler bytes. Blocks made only of
/// filler repeat in both, at the same index, with different contents. A repeat that involves
/// prefix or secret bytes, or a chance collision, cannot satisfy all three at once.
fn common_repeat(probe: &[u8], confirm: &[u8], block_size: usize) -> Option<usize> {
    let confirmed = adjacent_repeats(confirm, block_size);
    let block = |ciphertext: &[u8], idx: usize| {
        ciphertext[idx * block_size..(idx + 1) * block_size].to_vec()
    };

    adjacent_repeats(probe, block_size)
        .into_iter()
        .find(|idx| confirmed.contains(idx) && block(probe, *idx) != block(confirm, *idx))
}

/// An oracle shifted so that attacker input starts on a block boundary, with the ciphertext
/// blocks before that boundary cut off.
struct Aligned<'a, O: ?Sized> {
    oracle: &'a O,
    padding: Vec<u8>,
    skip: usize,
}

impl<O: EncryptionOracle + ?Sized> EncryptionOracle for Aligned<'_, O> {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let input = [self.padding.as_slice(), plaintext].concat();
        let mut ciphertext = self.oracle.encrypt(&input)?;
        Ok(ciphertext.split_off(self.skip.min(ciphertext.len())))
    }
}

impl ByteAtATime {
    /// Probe with three blocks' worth of filler at growing sizes until the ECB detector sees a
    /// repeated block.
    ///
    /// A hit is only accepted if a second probe with a different filler repeats at the same block
    /// with different content, which rules out chance collisions of short windows elsewhere in
    /// the output.
    ///
    /// # Errors
    ///
    /// [`Error::BlockSizeNotFound`] if no size up to `max_block_size` shows a repeat, which also
    /// happens when the oracle is not ECB.
    #[instrument(skip_all)]
    pub fn discover_block_size<O: EncryptionOracle + ?Sized>(&self, oracle: &O) -> Result<usize> {
        for block_size in 2..=self.max_block_size {
            let probe = oracle.encrypt(&vec![self.filler; block_size * 3])?;
            if !is_likely_ecb(&probe, block_size) {
                continue;
            }

            let confirm = oracle.encrypt(&vec![!self.filler; block_size * 3])?;
            if common_repeat(&probe, &confirm, block_size).is_some() {
                debug!(block_size, "discovered block size");
                return Ok(block_size);
            }
            trace!(block_size, "rejected chance repeat");
        }

        Err(Error::BlockSizeNotFound {
            max: self.max_block_size,
        })
    }

    /// Recover the secret an ECB oracle appends to attacker input.
    ///
    /// # Errors
    ///
    /// [`Error::BlockSizeNotFound`] if the oracle does not behave like ECB, or oracle errors.
    #[instrument(skip_all)]
    pub fn recover_suffix<O: EncryptionOracle + ?Sized>(&self, oracle: &O) -> Result<Recovery> {
        let block_size = self.discover_block_size(oracle)?;
        self.recover_with_block_size(oracle, block_size)
    }

    /// Recover the appended secret when the oracle also prepends a fixed prefix of unknown
    /// length. The prefix is padded out to a block boundary and the attack then runs on the
    /// aligned remainder.
    ///
    /// # Errors
    ///
    /// [`Error::BlockSizeNotFound`], [`Error::InputNotLocated`] or oracle errors.
    #[instrument(skip_all)]
    pub fn recover_suffix_with_prefix<O: EncryptionOracle + ?Sized>(
        &self,
        oracle: &O,
    ) -> Result<Recovery> {
        let block_size = self.discover_block_size(oracle)?;
        let aligned = self.align(oracle, block_size)?;
        self.recover_with_block_size(&aligned, block_size)
    }

    /// Find the smallest padding that makes two filler blocks repeat back to back. At that point
    /// the input after the padding starts on a block boundary, at the index of the repeat. Both
    /// fillers must agree so that a prefix ending in, or a secret starting with, filler bytes
    /// cannot fake the repeat.
    fn align<'a, O: EncryptionOracle + ?Sized>(
        &self,
        oracle: &'a O,
        block_size: usize,
    ) -> Result<Aligned<'a, O>> {
        for pad_len in 0..block_size {
            let probe = oracle.encrypt(&vec![self.filler; pad_len + 2 * block_size])?;
            let confirm = oracle.encrypt(&vec![!self.filler; pad_len + 2 * block_size])?;

            if let Some(block) = common_repeat(&probe, &confirm, block_size) {
                debug!(pad_len, block, "aligned input to block boundary");
                return Ok(Aligned {
                    oracle,
                    padding: vec![self.filler; pad_len],
                    skip: block * block_size,
                });
            }
        }

        Err(Error::InputNotLocated)
    }

    /// The byte-by-byte loop, for an oracle known to append its secret straight after the input.
    ///
    /// For position `i` the input is `block_size - 1 - i % block_size` filler bytes, which puts
    /// secret byte `i` last in block `i / block_size`. The other bytes of that block are the
    /// last `block_size - 1` bytes of `filler ++ recovered`, so every candidate can be tried by
    /// encrypting those known bytes plus the candidate as a single first block.
    ///
    /// # Errors
    ///
    /// [`Error::NotEcb`] if three blocks of identical input do not produce a repeated block, and
    /// oracle errors.
    #[instrument(skip(self, oracle))]
    pub fn recover_with_block_size<O: EncryptionOracle + ?Sized>(
        &self,
        oracle: &O,
        block_size: usize,
    ) -> Result<Recovery> {
        if !guess_uses_ecb(oracle, block_size)? {
            return Err(Error::NotEcb);
        }

        let total_len = oracle.encrypt(&[])?.len();
        let mut cracked = Vec::with_capacity(total_len);
        let mut end_of_secret = None;

        while cracked.len() < total_len {
            let i = cracked.len();
            let ref_block_idx = i / block_size;
            // cycles block_size - 1, ..., 1, 0, block_size - 1, ...
            let fill_size = block_size - (i % block_size) - 1;

            let filler = vec![self.filler; fill_size];
            let ciphertext = oracle.encrypt(&filler)?;

            let found = match ciphertext.chunks_exact(block_size).nth(ref_block_idx) {
                Some(reference) => {
                    let known = [filler.as_slice(), cracked.as_slice()].concat();
                    let known = &known[known.len() + 1 - block_size..];
                    self.match_last_byte(oracle, block_size, known, reference)?
                }
                None => None,
            };

            if let Some(byte) = found {
                trace!(i, byte, "recovered byte");
                cracked.push(byte);
            } else {
                if end_of_secret.is_none() {
                    debug!(i, "no candidate matched, end of secret");
                    end_of_secret = Some(i);
                }
                #[allow(clippy::cast_possible_truncation)]
                cracked.push(fill_size as u8);
            }
        }

        if end_of_secret == Some(0) {
            warn!("no byte could be recovered");
        }

        Ok(Recovery {
            bytes: cracked,
            end_of_secret,
            block_size,
        })
    }

    /// Find the candidate that, appended to `known`, encrypts to `reference` as the first block.
    fn match_last_byte<O: EncryptionOracle + ?Sized>(
        &self,
        oracle: &O,
        block_size: usize,
        known: &[u8],
        reference: &[u8],
    ) -> Result<Option<u8>> {
        let mut probe = Vec::with_capacity(block_size);
        probe.extend_from_slice(known);
        probe.push(0);

        for candidate in 0..self.candidates_end.min(256) {
            #[allow(clippy::cast_possible_truncation)]
            let candidate = candidate as u8;
            probe[block_size - 1] = candidate;

            let ciphertext = oracle.encrypt(&probe)?;
            if ciphertext.get(..block_size) == Some(reference) {
                return Ok(Some(candidate));
            }
        }

        Ok(None)
    }
}
