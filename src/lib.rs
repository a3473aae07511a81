//! Attacks on ECB, CBC and repeating-key XOR constructions.
//!
//! Every attack talks to its victim through an oracle trait from [`oracle`], so it never sees a
//! key. The victims themselves ([`oracle::AffixingOracle`], [`ecb_cut_paste::ProfileOracle`],
//! [`cbc_bitflip::CommentOracle`], [`padding_oracle::CbcPaddingOracle`]) are AES-128 services
//! with keys generated when they are built.
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod byte_at_a_time;
pub mod bytes_ext;
pub mod cbc_bitflip;
pub mod cipher;
pub mod corpus;
pub mod ecb;
pub mod ecb_cut_paste;
pub mod error;
pub mod modes;
pub mod oracle;
pub mod padding;
pub mod padding_oracle;
pub mod vigenere;

pub use error::{Error, Result};

/// The attacks end to end.
///
/// Each scenario builds a victim, lets the attack loose on it through the oracle interface only,
/// and checks the result with the victim's own key. The pieces are tested in their modules.
#[cfg(test)]
mod scenarios {
    mod xor {
        use crate::{
            bytes_ext::BytesExt,
            corpus::Corpus,
            vigenere::{self, KeyLengthSearch},
        };

        #[test]
        fn single_byte_xor() {
            let input = "1b37373331363f78151b7f2b783431333d78397828372d363c78373e783a393b3736";
            let expected = "Cooking MC's like a pound of bacon";

            let guess = Corpus::default().find_best_single_byte_xor(&hex::decode(input).unwrap());
            assert_eq!(String::from_utf8_lossy(&guess.plaintext), expected);
        }

        #[test]
        fn repeating_key_xor() {
            let input = "Burning 'em, if you ain't quick and nimble\n\
            I go crazy when I hear a cymbal";
            let expected =
                "0b3637272a2b2e63622c2e69692a23693a2a3c6324202d623d63343c2a26226324272765272\
            a282b2f20430a652e2c652a3124333a653e2b2027630c692b20283165286326302e27282f";

            let ciphertext = input.as_bytes().xor_repeating_key("ICE");
            assert_eq!(hex::encode(ciphertext), expected);
        }

        #[test_log::test]
        fn break_repeating_key_xor() {
            let plaintext = include_bytes!("../data/sample.txt");
            let ciphertext = plaintext.xor_repeating_key("sixteen-byte-key");

            let result =
                vigenere::crack(&Corpus::default(), &ciphertext, KeyLengthSearch::default())
                    .unwrap();
            assert_eq!(result.key, b"sixteen-byte-key");
            assert_eq!(result.plaintext, plaintext);
        }
    }

    mod ecb {
        use crate::{
            byte_at_a_time::ByteAtATime,
            ecb::guess_uses_ecb,
            ecb_cut_paste::{forge_admin_profile, ProfileOracle},
            oracle::{AffixingOracle, EncryptionOracle},
        };
        use base64::{engine::general_purpose::STANDARD, Engine};

        const SECRET_B64: &str = "Um9sbGluJyBpbiBteSA1LjAKV2l0aCBteSByYWctdG9wIGRvd24gc28gbXkg\
            aGFpciBjYW4gYmxvdwpUaGUgZ2lybGllcyBvbiBzdGFuZGJ5IHdhdmluZyBq\
            dXN0IHRvIHNheSBoaQpEaWQgeW91IHN0b3A/IE5vLCBJIGp1c3QgZHJvdmUg\
            YnkK";

        // depends on randomness; a wrong guess needs a 128-bit collision
        #[test]
        fn detect_mode() {
            for _ in 0..100 {
                let oracle = AffixingOracle::new_random();
                let block_size = oracle.discover_block_size_by_length(64).unwrap();
                assert_eq!(
                    guess_uses_ecb(&oracle, block_size).unwrap(),
                    oracle.uses_ecb()
                );
            }
        }

        #[test_log::test]
        fn byte_at_a_time() {
            let secret = STANDARD.decode(SECRET_B64).unwrap();
            let oracle = AffixingOracle::appending(secret.clone());

            let recovery = ByteAtATime::default().recover_suffix(&oracle).unwrap();
            assert_eq!(recovery.block_size(), 16);
            assert_eq!(recovery.secret(), secret);
        }

        #[test_log::test]
        fn byte_at_a_time_behind_random_prefix() {
            let secret = STANDARD.decode(SECRET_B64).unwrap();
            let oracle = AffixingOracle::prepending_random(secret.clone());

            let recovery = ByteAtATime::default()
                .recover_suffix_with_prefix(&oracle)
                .unwrap();
            assert_eq!(recovery.secret(), secret);
        }

        #[test_log::test]
        fn cut_and_paste_admin_profile() {
            let oracle = ProfileOracle::new_random();
            let block_size = oracle.discover_block_size_by_length(64).unwrap();

            let forged = forge_admin_profile(&oracle, block_size).unwrap();
            assert!(oracle.decrypt_profile(&forged).unwrap().is_admin());
        }
    }

    mod cbc {
        use crate::{
            cbc_bitflip::{forge_admin_comment, BitflipPayload, CommentOracle},
            oracle::{AdminChecker, EncryptionOracle},
            padding_oracle::{decrypt_with_padding_oracle, CbcPaddingOracle},
        };

        #[test_log::test]
        fn bitflip_admin_comment() {
            let oracle = CommentOracle::new_random();
            let block_size = oracle.discover_block_size_by_length(64).unwrap();

            let honest = oracle.encrypt(b";admin=true").unwrap();
            assert!(!oracle.is_admin(&honest));

            let forged =
                forge_admin_comment(&oracle, block_size, BitflipPayload::default()).unwrap();
            assert!(oracle.is_admin(&forged));
        }

        #[test_log::test]
        fn padding_oracle() {
            let plaintext = b"000003Cooking MC's like a pound of bacon";
            let oracle = CbcPaddingOracle::new_random();
            let ciphertext = oracle.encrypt(plaintext).unwrap();

            let recovered = decrypt_with_padding_oracle(&oracle, &ciphertext, 16).unwrap();
            assert_eq!(recovered, plaintext);
        }
    }
}
