//! Breaking repeating-key XOR.

use crate::{
    bytes_ext::BytesExt,
    corpus::{Corpus, KeyGuess},
};
use tracing::{debug, instrument};

/// The key lengths to consider, `min..max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLengthSearch {
    pub min: usize,
    pub max: usize,
}

impl Default for KeyLengthSearch {
    fn default() -> Self {
        KeyLengthSearch { min: 2, max: 40 }
    }
}

pub struct VigenereResult {
    pub key: Vec<u8>,
    pub plaintext: Vec<u8>,
}

impl std::fmt::Debug for VigenereResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VigenereResult")
            .field("key", &String::from_utf8_lossy(&self.key))
            .field("plaintext", &String::from_utf8_lossy(&self.plaintext))
            .finish()
    }
}

#[must_use]
pub fn guess_single_byte_key(corpus: &Corpus, ciphertext: &[u8]) -> KeyGuess {
    corpus.find_best_single_byte_xor(ciphertext)
}

/// Mean hamming distance between the first `key_len` bytes and every following non-overlapping
/// chunk of the same length, divided by `key_len`. `None` if there is no second chunk.
fn normalized_distance(ciphertext: &[u8], key_len: usize) -> Option<f64> {
    let mut chunks = ciphertext.chunks_exact(key_len);
    let first = chunks.next()?;

    let (total, count) = chunks.fold((0, 0_u32), |(total, count), chunk| {
        (total + first.hamming_distance(chunk), count + 1)
    });
    if count == 0 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    Some(total as f64 / f64::from(count) / key_len as f64)
}

/// The key length with the smallest normalized edit distance; the shortest wins a tie. `None`
/// when the ciphertext is too short to compare two chunks of any length in the search range.
#[must_use]
#[instrument(skip_all, fields(len = ciphertext.len()))]
pub fn estimate_key_length(ciphertext: &[u8], search: KeyLengthSearch) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for key_len in search.min.max(1)..search.max {
        let Some(distance) = normalized_distance(ciphertext, key_len) else {
            continue;
        };
        if best.map_or(true, |(_, lowest)| distance < lowest) {
            best = Some((key_len, distance));
        }
    }

    let (key_len, distance) = best?;
    debug!(key_len, distance, "estimated key length");
    Some(key_len)
}

/// Split `ciphertext` into `key_len` columns, where column `i` holds every byte at a position
/// congruent to `i` modulo `key_len`.
fn transpose(ciphertext: &[u8], key_len: usize) -> Vec<Vec<u8>> {
    let mut columns = (0..key_len).map(|_| Vec::new()).collect::<Vec<_>>();
    for (i, byte) in ciphertext.iter().enumerate() {
        columns[i % key_len].push(*byte);
    }
    columns
}

/// Solve each column of the transposed ciphertext as single-byte XOR and join the keys.
#[must_use]
pub fn recover_repeating_key(corpus: &Corpus, ciphertext: &[u8], key_len: usize) -> Vec<u8> {
    if key_len == 0 {
        return Vec::new();
    }

    transpose(ciphertext, key_len)
        .iter()
        .map(|column| guess_single_byte_key(corpus, column).key)
        .collect()
}

/// Estimate the key length, recover the key and decrypt. `None` if no key length could be
/// estimated.
#[must_use]
#[instrument(skip_all, fields(len = ciphertext.len()))]
pub fn crack(corpus: &Corpus, ciphertext: &[u8], search: KeyLengthSearch) -> Option<VigenereResult> {
    let key_len = estimate_key_length(ciphertext, search)?;
    let key = recover_repeating_key(corpus, ciphertext, key_len);
    let plaintext = ciphertext.xor_repeating_key(&key);

    Some(VigenereResult { key, plaintext })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = include_bytes!("../data/sample.txt");

    #[test]
    fn test_transpose() {
        let columns = transpose(b"abcdefg", 3);
        assert_eq!(columns, vec![b"adg".to_vec(), b"be".to_vec(), b"cf".to_vec()]);
    }

    #[test]
    fn test_estimate_key_length() {
        let keys: [&[u8]; 3] = [
            b"Terminator X: Bring the noise",
            b"\x8f\x13\x62\xd4\x07\xbe\x51\x9a\x2c\xe0\x75\x11\xc8\x3b\x96\x4d\xf2\x68\x0a\xb7\x39",
            b"\x5e\xa1\x0c\x77\xe3\x19\x84\x2f\xd6\x40\x9b\x05\x6a\xcf\x38\x71\xbd\x12\xe9\x54\x0f\x8c\xa6",
        ];

        for key in keys {
            let ciphertext = SAMPLE.xor_repeating_key(key);
            assert_eq!(
                estimate_key_length(&ciphertext, KeyLengthSearch::default()),
                Some(key.len())
            );
        }
    }

    #[test]
    fn test_recover_repeating_key() {
        let key = b"\x8f\x13\x62\xd4\x07\xbe\x51\x9a\x2c\xe0\x75\x11\xc8\x3b\x96\x4d\xf2\x68\x0a\xb7\x39";
        let ciphertext = SAMPLE.xor_repeating_key(key);

        let recovered = recover_repeating_key(&Corpus::default(), &ciphertext, key.len());
        assert_eq!(recovered, key);
    }

    #[test]
    fn test_crack() {
        let key = b"Terminator X: Bring the noise";
        let ciphertext = SAMPLE.xor_repeating_key(key);

        let result = crack(&Corpus::default(), &ciphertext, KeyLengthSearch::default()).unwrap();
        assert_eq!(result.key, key);
        assert_eq!(result.plaintext, SAMPLE);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(estimate_key_length(b"abc", KeyLengthSearch::default()), None);
    }
}
