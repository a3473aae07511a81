use crate::{error::Result, oracle::EncryptionOracle};
use std::collections::HashSet;

/// Determine if a ciphertext is likely ECB encrypted by checking whether any two block-aligned
/// windows of `block_size` bytes are identical.
///
/// `false` means it is either not ECB, too short, or its plaintext had no repeated blocks.
#[must_use]
pub fn is_likely_ecb(ciphertext: &[u8], block_size: usize) -> bool {
    if block_size == 0 {
        return false;
    }

    let mut seen = HashSet::new();
    ciphertext
        .chunks_exact(block_size)
        .any(|block| !seen.insert(block))
}

/// Indices of every block that is identical to the block right after it.
#[must_use]
pub fn adjacent_repeats(ciphertext: &[u8], block_size: usize) -> Vec<usize> {
    if block_size == 0 {
        return Vec::new();
    }

    ciphertext
        .chunks_exact(block_size)
        .zip(ciphertext.chunks_exact(block_size).skip(1))
        .enumerate()
        .filter_map(|(idx, (a, b))| (a == b).then_some(idx))
        .collect()
}

/// Guess whether an oracle encrypts with ECB, by feeding it three blocks of identical bytes.
/// Whatever the oracle prepends, at least two whole blocks of that input line up and encrypt
/// identically under ECB.
///
/// # Errors
///
/// Propagates oracle errors.
pub fn guess_uses_ecb<O: EncryptionOracle + ?Sized>(oracle: &O, block_size: usize) -> Result<bool> {
    let ciphertext = oracle.encrypt(&vec![0; block_size * 3])?;
    Ok(is_likely_ecb(&ciphertext, block_size))
}
