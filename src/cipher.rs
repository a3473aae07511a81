use crate::error::{Error, Result};
use openssl::symm::{self, Crypter, Mode};

/// A keyed block cipher that transforms exactly one block per call. Modes of operation are built
/// on top of this in [`crate::modes`].
pub trait BlockCipher {
    fn block_size(&self) -> usize;

    /// Encrypt one block. `block` must be exactly [`BlockCipher::block_size`] bytes.
    ///
    /// # Errors
    ///
    /// [`Error::MisalignedInput`] for a wrongly sized block, or an error from the primitive.
    fn encrypt_block(&self, block: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt one block. `block` must be exactly [`BlockCipher::block_size`] bytes.
    ///
    /// # Errors
    ///
    /// [`Error::MisalignedInput`] for a wrongly sized block, or an error from the primitive.
    fn decrypt_block(&self, block: &[u8]) -> Result<Vec<u8>>;
}

/// AES-128 over OpenSSL's raw ECB transform. The key never leaves this struct.
#[derive(Clone)]
pub struct Aes128 {
    key: [u8; 16],
}

impl Aes128 {
    pub const BLOCK_SIZE: usize = 16;
    pub const KEY_SIZE: usize = 16;

    /// # Errors
    ///
    /// [`Error::InvalidKeyLength`] unless `key` is 16 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        let key = key.try_into().map_err(|_| Error::InvalidKeyLength {
            len: key.len(),
            expected: Self::KEY_SIZE,
        })?;
        Ok(Aes128 { key })
    }

    /// A cipher under a fresh key from the thread-local CSPRNG.
    #[must_use]
    pub fn random() -> Self {
        let mut key = [0; Self::KEY_SIZE];
        crate::oracle::fill_random(&mut key);
        Aes128 { key }
    }

    fn transform(&self, block: &[u8], mode: Mode) -> Result<Vec<u8>> {
        if block.len() != Self::BLOCK_SIZE {
            return Err(Error::MisalignedInput {
                len: block.len(),
                block_size: Self::BLOCK_SIZE,
            });
        }

        // always ECB with padding off: chaining and padding are done by hand in `modes`
        let openssl_cipher = symm::Cipher::aes_128_ecb();
        let mut crypter = Crypter::new(openssl_cipher, mode, &self.key, None)?;
        crypter.pad(false);

        let mut buf = vec![0; block.len() + openssl_cipher.block_size()];
        let mut count = crypter.update(block, &mut buf)?;
        count += crypter.finalize(&mut buf[count..])?;
        buf.truncate(count);

        Ok(buf)
    }
}

impl std::fmt::Debug for Aes128 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes128").finish_non_exhaustive()
    }
}

impl BlockCipher for Aes128 {
    fn block_size(&self) -> usize {
        Self::BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &[u8]) -> Result<Vec<u8>> {
        self.transform(block, Mode::Encrypt)
    }

    fn decrypt_block(&self, block: &[u8]) -> Result<Vec<u8>> {
        self.transform(block, Mode::Decrypt)
    }
}
