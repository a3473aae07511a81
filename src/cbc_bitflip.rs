//! CBC bitflipping: editing one ciphertext block to rewrite the plaintext of the next.
//!
//! CBC decrypts block `i` as `D(c[i]) ^ c[i - 1]`, so XOR-ing a delta into byte `p` of `c[i - 1]`
//! XORs the same delta into byte `p` of plaintext block `i`. Block `i - 1` itself decrypts to
//! garbage, which is why the attack spends a block of its own input on it.

use crate::{
    cipher::Aes128,
    error::{Error, Result},
    modes::{decrypt_cbc, encrypt_cbc},
    oracle::{gen_random_bytes, AdminChecker, EncryptionOracle},
    padding::pkcs7_padded,
};
use tracing::{debug, instrument};

const PREFIX: &[u8] = b"comment1=cooking%20MCs;userdata=";
const SUFFIX: &[u8] = b";comment2=%20like%20a%20pound%20of%20bacon";
const ADMIN_MARKER: &[u8] = b";admin=true;";

/// Bytes the comment oracle refuses to pass through unescaped.
const ESCAPED: [u8; 2] = [b';', b'='];

/// What to smuggle in, and the harmless byte that stands in for each escaped byte of it until
/// the flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitflipPayload {
    pub target: &'static [u8],
    pub placeholder: u8,
}

impl Default for BitflipPayload {
    fn default() -> Self {
        BitflipPayload {
            target: b";admin=true",
            placeholder: b'X',
        }
    }
}

/// Escapes the user data, wraps it in a fixed comment string and encrypts it under
/// AES-128-CBC with a key and IV only it knows.
#[derive(Debug)]
pub struct CommentOracle {
    cipher: Aes128,
    iv: Vec<u8>,
}

impl CommentOracle {
    #[must_use]
    pub fn new_random() -> Self {
        CommentOracle {
            cipher: Aes128::random(),
            iv: gen_random_bytes(Aes128::BLOCK_SIZE),
        }
    }

    fn escape(userdata: &[u8]) -> Vec<u8> {
        let mut escaped = Vec::with_capacity(userdata.len());
        for &byte in userdata {
            match byte {
                b';' => escaped.extend_from_slice(b"%3B"),
                b'=' => escaped.extend_from_slice(b"%3D"),
                _ => escaped.push(byte),
            }
        }
        escaped
    }
}

impl EncryptionOracle for CommentOracle {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let escaped = Self::escape(plaintext);
        let comment = [PREFIX, escaped.as_slice(), SUFFIX].concat();
        encrypt_cbc(
            &self.cipher,
            &self.iv,
            &pkcs7_padded(&comment, Aes128::BLOCK_SIZE),
        )
    }
}

impl AdminChecker for CommentOracle {
    /// Padding is not checked; a garbled block anywhere is fine as long as the marker is there.
    fn is_admin(&self, ciphertext: &[u8]) -> bool {
        decrypt_cbc(&self.cipher, &self.iv, ciphertext).map_or(false, |plaintext| {
            plaintext
                .windows(ADMIN_MARKER.len())
                .any(|window| window == ADMIN_MARKER)
        })
    }
}

/// The index of the first block that differs between two ciphertexts.
fn first_differing_block(a: &[u8], b: &[u8], block_size: usize) -> Option<usize> {
    a.chunks(block_size)
        .zip(b.chunks(block_size))
        .position(|(a, b)| a != b)
}

/// How many bytes the oracle puts in front of attacker input.
///
/// Inputs ending in `A` and in `B` first differ in the block where the input starts. Growing
/// the input in front of that last byte pushes it into the next block once the starting block
/// is full, at which point the starting block stops differing.
///
/// # Errors
///
/// [`Error::InputNotLocated`] if changing the input never changes the output, and oracle errors.
#[instrument(skip(oracle))]
pub fn locate_input<O: EncryptionOracle + ?Sized>(oracle: &O, block_size: usize) -> Result<usize> {
    let start_block = first_differing_block(
        &oracle.encrypt(b"A")?,
        &oracle.encrypt(b"B")?,
        block_size,
    )
    .ok_or(Error::InputNotLocated)?;

    for fill in 1..=block_size {
        let mut input = vec![b'A'; fill + 1];
        let a = oracle.encrypt(&input)?;
        input[fill] = b'B';
        let b = oracle.encrypt(&input)?;

        if first_differing_block(&a, &b, block_size) != Some(start_block) {
            let prefix_len = start_block * block_size + block_size - fill;
            debug!(prefix_len, "located attacker input");
            return Ok(prefix_len);
        }
    }

    Err(Error::InputNotLocated)
}

/// Build a ciphertext whose plaintext contains `payload.target` even though the oracle escapes
/// its delimiters.
///
/// The input is filler up to a block boundary, one sacrificial block, then the target with every
/// escaped byte replaced by the placeholder. The ciphertext of the sacrificial block is then
/// XOR-ed with `placeholder ^ target` at those positions.
///
/// # Errors
///
/// [`Error::PayloadTooLong`] if the target does not fit in one block,
/// [`Error::InputNotLocated`] if the input cannot be found in the output, and oracle errors.
#[instrument(skip(oracle))]
pub fn forge_admin_comment<O: EncryptionOracle + ?Sized>(
    oracle: &O,
    block_size: usize,
    payload: BitflipPayload,
) -> Result<Vec<u8>> {
    if payload.target.len() > block_size {
        return Err(Error::PayloadTooLong {
            len: payload.target.len(),
            block_size,
        });
    }

    let prefix_len = locate_input(oracle, block_size)?;
    let align_len = (block_size - prefix_len % block_size) % block_size;
    let sacrificial_block = (prefix_len + align_len) / block_size;

    let disguised = payload
        .target
        .iter()
        .map(|&byte| {
            if ESCAPED.contains(&byte) {
                payload.placeholder
            } else {
                byte
            }
        })
        .collect::<Vec<_>>();
    let input = [vec![b'A'; align_len + block_size], disguised.clone()].concat();

    let mut ciphertext = oracle.encrypt(&input)?;
    let flip_start = sacrificial_block * block_size;
    let flipped = ciphertext
        .get_mut(flip_start..flip_start + disguised.len())
        .ok_or(Error::InputNotLocated)?;

    for ((byte, stand_in), target) in flipped.iter_mut().zip(&disguised).zip(payload.target) {
        *byte ^= stand_in ^ target;
    }

    debug!(sacrificial_block, "flipped payload");
    Ok(ciphertext)
}
