//! The CBC padding oracle attack.
//!
//! Decrypting a forged previous block `f` followed by a real block `c` yields `D(c) ^ f`. Only
//! the padding check's yes/no answer is visible, but sweeping one byte of `f` until the padding
//! is valid pins down that byte of `D(c)`, and with it the plaintext `D(c) ^ prev`.

use crate::{
    cipher::Aes128,
    error::{Error, Result},
    modes::{decrypt_cbc, encrypt_cbc},
    oracle::{gen_random_bytes, PaddingOracle},
    padding::{is_pkcs7_valid, pkcs7_padded, unpad_pkcs7},
};
use tracing::{debug, instrument, trace, warn};

/// A service that decrypts `IV ++ ciphertext` under AES-128-CBC and reports only whether the
/// padding checked out.
#[derive(Debug)]
pub struct CbcPaddingOracle {
    cipher: Aes128,
    iv: Vec<u8>,
}

impl CbcPaddingOracle {
    #[must_use]
    pub fn new_random() -> Self {
        CbcPaddingOracle {
            cipher: Aes128::random(),
            iv: gen_random_bytes(Aes128::BLOCK_SIZE),
        }
    }

    /// Pad and encrypt `plaintext`, returning `IV ++ ciphertext`.
    ///
    /// # Errors
    ///
    /// Cipher errors.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = encrypt_cbc(
            &self.cipher,
            &self.iv,
            &pkcs7_padded(plaintext, Aes128::BLOCK_SIZE),
        )?;
        Ok([self.iv.as_slice(), ciphertext.as_slice()].concat())
    }
}

impl PaddingOracle for CbcPaddingOracle {
    fn is_padding_valid(&self, iv_and_ciphertext: &[u8]) -> bool {
        if iv_and_ciphertext.len() < 2 * Aes128::BLOCK_SIZE {
            return false;
        }

        let (iv, ciphertext) = iv_and_ciphertext.split_at(Aes128::BLOCK_SIZE);
        decrypt_cbc(&self.cipher, iv, ciphertext)
            .map_or(false, |plaintext| is_pkcs7_valid(&plaintext, Aes128::BLOCK_SIZE))
    }
}

fn query<O: PaddingOracle + ?Sized>(oracle: &O, forged: &[u8], target: &[u8]) -> bool {
    oracle.is_padding_valid(&[forged, target].concat())
}

/// Recover the plaintext of `target` given the block before it.
///
/// Bytes are found last to first. For position `pos` the padding value is
/// `pad = block_size - pos`: every byte after `pos` is forced to decrypt to `pad`, and each guess
/// `g` for the plaintext byte sets `f[pos] = prev[pos] ^ g ^ pad`. Padding is valid exactly when
/// the guess is right, with two exceptions:
///
/// * `g == pad` leaves the byte unchanged, so it is never queried. If no other guess validates,
///   the byte is `pad`.
/// * At the last byte a guess can also validate because the plaintext before it happens to end
///   in a longer padding run. Such hits are confirmed by changing the byte before and querying
///   again; a genuine one-byte pad stays valid.
fn decrypt_block<O: PaddingOracle + ?Sized>(
    oracle: &O,
    prev: &[u8],
    target: &[u8],
) -> Vec<u8> {
    let block_size = target.len();
    let mut plaintext = vec![0; block_size];

    for pos in (0..block_size).rev() {
        #[allow(clippy::cast_possible_truncation)]
        let pad = (block_size - pos) as u8;

        let mut forged = prev.to_vec();
        for (byte, known) in forged[pos + 1..].iter_mut().zip(&plaintext[pos + 1..]) {
            *byte ^= known ^ pad;
        }

        let found = (0..=u8::MAX).filter(|&guess| guess != pad).find(|&guess| {
            forged[pos] = prev[pos] ^ guess ^ pad;
            if !query(oracle, &forged, target) {
                return false;
            }
            if pad > 1 || pos == 0 {
                return true;
            }

            let mut perturbed = forged.clone();
            perturbed[pos - 1] ^= 0xff;
            query(oracle, &perturbed, target)
        });

        plaintext[pos] = found.unwrap_or_else(|| {
            warn!(pos, pad, "no guess validated, assuming the pad value");
            pad
        });
        trace!(pos, byte = plaintext[pos], "recovered byte");
    }

    plaintext
}

/// Decrypt `IV ++ ciphertext` using only a padding oracle, then strip the PKCS#7 padding.
///
/// The IV serves as the previous block of the first ciphertext block, so every block is handled
/// the same way. If the recovered plaintext does not end in valid padding it is returned as is.
///
/// # Errors
///
/// [`Error::MisalignedInput`] if the input is empty or not a multiple of `block_size`.
#[instrument(skip(oracle, iv_and_ciphertext), fields(len = iv_and_ciphertext.len()))]
pub fn decrypt_with_padding_oracle<O: PaddingOracle + ?Sized>(
    oracle: &O,
    iv_and_ciphertext: &[u8],
    block_size: usize,
) -> Result<Vec<u8>> {
    if block_size == 0 || iv_and_ciphertext.is_empty() || iv_and_ciphertext.len() % block_size != 0
    {
        return Err(Error::MisalignedInput {
            len: iv_and_ciphertext.len(),
            block_size,
        });
    }

    let blocks = iv_and_ciphertext.chunks_exact(block_size).collect::<Vec<_>>();
    let mut plaintext = Vec::with_capacity(iv_and_ciphertext.len() - block_size);
    for (idx, pair) in blocks.windows(2).enumerate() {
        plaintext.extend(decrypt_block(oracle, pair[0], pair[1]));
        debug!(block = idx, "decrypted block");
    }

    match unpad_pkcs7(&plaintext, block_size) {
        Some(unpadded) => Ok(unpadded.to_vec()),
        None => {
            if !plaintext.is_empty() {
                warn!("recovered plaintext has no valid padding");
            }
            Ok(plaintext)
        }
    }
}
