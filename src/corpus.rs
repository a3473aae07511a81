use crate::bytes_ext::BytesExt;
use std::collections::HashMap;

/// English letter frequencies, space included. Source: macfreek.nl letter distribution.
const ENGLISH_FREQUENCIES: [(char, f64); 27] = [
    (' ', 0.182_88),
    ('e', 0.102_67),
    ('t', 0.075_17),
    ('a', 0.065_32),
    ('o', 0.061_60),
    ('n', 0.057_12),
    ('i', 0.056_68),
    ('s', 0.053_17),
    ('r', 0.049_88),
    ('h', 0.049_79),
    ('l', 0.033_18),
    ('d', 0.032_83),
    ('u', 0.022_76),
    ('c', 0.022_34),
    ('m', 0.020_27),
    ('f', 0.019_83),
    ('w', 0.017_04),
    ('g', 0.016_25),
    ('p', 0.015_04),
    ('y', 0.014_28),
    ('b', 0.012_59),
    ('v', 0.007_96),
    ('k', 0.005_60),
    ('x', 0.001_41),
    ('j', 0.000_97),
    ('q', 0.000_84),
    ('z', 0.000_51),
];

/// The best single-byte XOR key found for a ciphertext, with its score and decryption. Higher
/// scores are more likely to be correct.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyGuess {
    pub key: u8,
    pub score: f64,
    pub plaintext: Vec<u8>,
}

/// A character frequency table. Immutable once built.
#[derive(Debug, Clone)]
pub struct Corpus {
    freq: HashMap<char, f64>,
}

impl Corpus {
    /// Sum of the table weights of each byte, ASCII case-folded. Bytes missing from the table
    /// contribute nothing. Scores only compare meaningfully between texts of equal length.
    #[must_use]
    pub fn score(&self, text: &[u8]) -> f64 {
        text.iter()
            .filter_map(|&byte| self.freq.get(&char::from(byte.to_ascii_lowercase())))
            .sum()
    }

    /// Try all 256 single-byte keys and keep the best scoring one. On a tie the lowest key wins.
    #[must_use]
    pub fn find_best_single_byte_xor(&self, ciphertext: &[u8]) -> KeyGuess {
        let mut best: Option<KeyGuess> = None;

        for key in 0..=u8::MAX {
            let plaintext = ciphertext.xor_single(key);
            let score = self.score(&plaintext);
            if best.as_ref().map_or(true, |best| score > best.score) {
                best = Some(KeyGuess {
                    key,
                    score,
                    plaintext,
                });
            }
        }

        // the loop body ran at least once
        best.unwrap_or(KeyGuess {
            key: 0,
            score: 0.0,
            plaintext: ciphertext.to_vec(),
        })
    }

    /// Find which of several ciphertexts is single-byte XOR encrypted English, returning the index
    /// of that line along with its best guess. `None` for no lines.
    #[must_use]
    pub fn detect_single_byte_xor<L: AsRef<[u8]>>(&self, lines: &[L]) -> Option<(usize, KeyGuess)> {
        lines
            .iter()
            .map(|line| self.find_best_single_byte_xor(line.as_ref()))
            .enumerate()
            .fold(None, |best: Option<(usize, KeyGuess)>, (idx, guess)| match best {
                Some(best) if best.1.score >= guess.score => Some(best),
                _ => Some((idx, guess)),
            })
    }
}

impl Default for Corpus {
    /// The built-in English letter table.
    fn default() -> Self {
        Corpus {
            freq: ENGLISH_FREQUENCIES.into_iter().collect(),
        }
    }
}

impl From<&str> for Corpus {
    /// Build a table of relative frequencies from sample text, case-folded.
    fn from(s: &str) -> Self {
        let mut counts = HashMap::new();
        let mut total = 0_u32;
        for c in s.chars() {
            if c.is_ascii_alphanumeric() || c.is_ascii_punctuation() || c == ' ' {
                *counts.entry(c.to_ascii_lowercase()).or_insert(0_u32) += 1;
                total += 1;
            }
        }

        let freq = counts
            .into_iter()
            .map(|(c, n)| (c, f64::from(n) / f64::from(total)))
            .collect();
        Corpus { freq }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_case_insensitive() {
        let corpus = Corpus::default();
        assert!((corpus.score(b"Hello World") - corpus.score(b"hello world")).abs() < 1e-12);
        assert!(corpus.score(b"\x00\x01\xff") == 0.0);
    }

    #[test]
    fn test_single_byte_xor() {
        let input =
            hex::decode("1b37373331363f78151b7f2b783431333d78397828372d363c78373e783a393b3736")
                .unwrap();

        let guess = Corpus::default().find_best_single_byte_xor(&input);
        assert_eq!(guess.key, b'X');
        assert_eq!(guess.plaintext, b"Cooking MC's like a pound of bacon");
    }

    #[test]
    fn test_single_byte_xor_sentence() {
        let plaintext = b"The quick brown fox jumps over the lazy dog while the cat sleeps";
        for key in [0x00, 0x42, 0x7f, 0xa5, 0xff] {
            let guess = Corpus::default().find_best_single_byte_xor(&plaintext.xor_single(key));
            assert_eq!(guess.key, key);
            assert_eq!(guess.plaintext, plaintext);
        }
    }

    #[test]
    fn test_detect_single_byte_xor() {
        let hidden = b"Now that the party is jumping".xor_single(0x35);
        let lines = vec![
            hex::decode("0e3647e8592d35514a081243582536ed3de6734059001e3f535ce6271032").unwrap(),
            hidden.clone(),
            hex::decode("334b041de124f73c18011a50e608097ac308ecee501337ec3e100854201d").unwrap(),
        ];

        let (idx, guess) = Corpus::default().detect_single_byte_xor(&lines).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(guess.plaintext, b"Now that the party is jumping");
    }

    #[test]
    fn test_corpus_from_text() {
        let corpus = Corpus::from(include_str!("../data/sample.txt"));
        let plaintext = b"It was the best of times, it was the worst of times";

        let guess = corpus.find_best_single_byte_xor(&plaintext.xor_single(0x13));
        assert_eq!(guess.key, 0x13);
    }
}
