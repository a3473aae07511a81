//! The attacker's view of a victim: narrow call signatures that never expose key material.
//!
//! Concrete oracles own their key and IV privately. Attacks are generic over these traits, and
//! plain closures implement them too.

use crate::{
    cipher::Aes128,
    error::{Error, Result},
    modes::{encrypt_cbc, encrypt_ecb},
    padding::pkcs7_padded,
};
use rand::{Rng, RngCore};
use tracing::debug;

/// Chosen-plaintext access: the oracle may wrap the input with secret data before encrypting.
pub trait EncryptionOracle {
    /// # Errors
    ///
    /// Whatever the underlying encryption reports.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Discover the block size from how the ciphertext length grows: feed longer and longer
    /// inputs until the length jumps, and the size of the jump is the block size.
    ///
    /// # Errors
    ///
    /// [`Error::BlockSizeNotFound`] when the length has not jumped after `max_block_size` bytes.
    fn discover_block_size_by_length(&self, max_block_size: usize) -> Result<usize> {
        let mut plaintext = Vec::new();
        let initial_size = self.encrypt(&plaintext)?.len();

        while plaintext.len() <= max_block_size {
            plaintext.push(0);
            let cur_size = self.encrypt(&plaintext)?.len();
            if cur_size != initial_size {
                let block_size = cur_size - initial_size;
                debug!(block_size, "block size from ciphertext growth");
                return Ok(block_size);
            }
        }

        Err(Error::BlockSizeNotFound {
            max: max_block_size,
        })
    }
}

impl<F> EncryptionOracle for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self(plaintext)
    }
}

/// Decrypt-and-validate access: reveals only whether `IV ++ ciphertext` decrypts to well-formed
/// PKCS#7 padding.
pub trait PaddingOracle {
    fn is_padding_valid(&self, iv_and_ciphertext: &[u8]) -> bool;
}

impl<F> PaddingOracle for F
where
    F: Fn(&[u8]) -> bool,
{
    fn is_padding_valid(&self, iv_and_ciphertext: &[u8]) -> bool {
        self(iv_and_ciphertext)
    }
}

/// Decrypt-and-check access: reveals only whether the decrypted plaintext grants admin rights.
pub trait AdminChecker {
    fn is_admin(&self, ciphertext: &[u8]) -> bool;
}

impl<F> AdminChecker for F
where
    F: Fn(&[u8]) -> bool,
{
    fn is_admin(&self, ciphertext: &[u8]) -> bool {
        self(ciphertext)
    }
}

/// Fill `buf` from the thread-local CSPRNG. Panics if the OS entropy source fails, since no
/// oracle secret is meaningful without it.
pub(crate) fn fill_random(buf: &mut [u8]) {
    rand::thread_rng().fill_bytes(buf);
}

#[must_use]
pub fn gen_random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0; len];
    fill_random(&mut buf);
    buf
}

#[derive(Clone, PartialEq, Eq)]
enum Chaining {
    Ecb,
    Cbc { iv: Vec<u8> },
}

/// Encrypts `prefix ++ input ++ suffix` under AES-128 in ECB or CBC mode, PKCS#7 padded. Key,
/// mode, IV and affixes are fixed when the oracle is built.
pub struct AffixingOracle {
    chaining: Chaining,
    cipher: Aes128,
    prefix: Vec<u8>,
    suffix: Vec<u8>,
}

impl AffixingOracle {
    /// Random key, a coin flip between ECB and CBC (with a random IV), and 5 to 10 random bytes
    /// each of prefix and suffix.
    #[must_use]
    pub fn new_random() -> Self {
        let mut rng = rand::thread_rng();

        let chaining = if rng.gen_bool(0.5) {
            Chaining::Ecb
        } else {
            Chaining::Cbc {
                iv: gen_random_bytes(Aes128::BLOCK_SIZE),
            }
        };

        let rand_prefix_len = rng.gen_range(5..=10);
        let rand_suffix_len = rng.gen_range(5..=10);

        AffixingOracle {
            chaining,
            cipher: Aes128::random(),
            prefix: gen_random_bytes(rand_prefix_len),
            suffix: gen_random_bytes(rand_suffix_len),
        }
    }

    /// ECB under a random key with `secret` appended to every input.
    #[must_use]
    pub fn appending(secret: Vec<u8>) -> Self {
        AffixingOracle {
            chaining: Chaining::Ecb,
            cipher: Aes128::random(),
            prefix: Vec::new(),
            suffix: secret,
        }
    }

    /// Like [`AffixingOracle::appending`], plus 0 to 127 random bytes prepended to every input.
    #[must_use]
    pub fn prepending_random(secret: Vec<u8>) -> Self {
        let prefix_len = rand::thread_rng().gen_range(0..128);
        Self::with_prefix(gen_random_bytes(prefix_len), secret)
    }

    /// ECB under a random key with the given prefix and appended secret.
    #[must_use]
    pub fn with_prefix(prefix: Vec<u8>, secret: Vec<u8>) -> Self {
        AffixingOracle {
            chaining: Chaining::Ecb,
            cipher: Aes128::random(),
            prefix,
            suffix: secret,
        }
    }

    /// Whether the oracle is using ECB. For checking guesses in tests, not for attacks.
    #[must_use]
    pub fn uses_ecb(&self) -> bool {
        matches!(self.chaining, Chaining::Ecb)
    }
}

impl EncryptionOracle for AffixingOracle {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let affixed = [self.prefix.as_slice(), plaintext, self.suffix.as_slice()].concat();
        let padded = pkcs7_padded(&affixed, Aes128::BLOCK_SIZE);
        match &self.chaining {
            Chaining::Ecb => encrypt_ecb(&self.cipher, &padded),
            Chaining::Cbc { iv } => encrypt_cbc(&self.cipher, iv, &padded),
        }
    }
}
