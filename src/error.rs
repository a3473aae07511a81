use thiserror::Error;

/// Errors raised by the mode primitives and the attacks.
///
/// Padding validity is deliberately absent: an invalid PKCS#7 pad is an ordinary `None` or
/// `false`, never an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input of {len} bytes is not a multiple of the {block_size}-byte block size")]
    MisalignedInput { len: usize, block_size: usize },

    #[error("IV must be {block_size} bytes, got {len}")]
    InvalidIvLength { len: usize, block_size: usize },

    #[error("nonce must be shorter than the {block_size}-byte block, got {len} bytes")]
    InvalidNonceLength { len: usize, block_size: usize },

    #[error("key must be {expected} bytes, got {len}")]
    InvalidKeyLength { len: usize, expected: usize },

    #[error("no repeated ciphertext block found for block sizes up to {max}")]
    BlockSizeNotFound { max: usize },

    #[error("oracle output does not look ECB encrypted")]
    NotEcb,

    #[error("could not locate attacker-controlled input in the oracle output")]
    InputNotLocated,

    #[error("payload of {len} bytes does not fit in a {block_size}-byte block")]
    PayloadTooLong { len: usize, block_size: usize },

    #[error("malformed profile: {0}")]
    MalformedProfile(String),

    #[error(transparent)]
    Cipher(#[from] openssl::error::ErrorStack),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
