//! ECB, CBC and CTR over any [`BlockCipher`].
//!
//! ECB and CBC take block-aligned input and never pad; callers pad with [`crate::padding`] first.

use crate::{
    bytes_ext::BytesExt,
    cipher::BlockCipher,
    error::{Error, Result},
};

fn check_aligned(len: usize, block_size: usize) -> Result<()> {
    if len % block_size == 0 {
        Ok(())
    } else {
        Err(Error::MisalignedInput { len, block_size })
    }
}

fn check_iv(iv: &[u8], block_size: usize) -> Result<()> {
    if iv.len() == block_size {
        Ok(())
    } else {
        Err(Error::InvalidIvLength {
            len: iv.len(),
            block_size,
        })
    }
}

/// # Errors
///
/// [`Error::MisalignedInput`] if `plaintext` is not block-aligned.
pub fn encrypt_ecb<C: BlockCipher + ?Sized>(cipher: &C, plaintext: &[u8]) -> Result<Vec<u8>> {
    let block_size = cipher.block_size();
    check_aligned(plaintext.len(), block_size)?;

    let mut ciphertext = Vec::with_capacity(plaintext.len());
    for block in plaintext.chunks_exact(block_size) {
        ciphertext.extend_from_slice(&cipher.encrypt_block(block)?);
    }
    Ok(ciphertext)
}

/// # Errors
///
/// [`Error::MisalignedInput`] if `ciphertext` is not block-aligned.
pub fn decrypt_ecb<C: BlockCipher + ?Sized>(cipher: &C, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let block_size = cipher.block_size();
    check_aligned(ciphertext.len(), block_size)?;

    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for block in ciphertext.chunks_exact(block_size) {
        plaintext.extend_from_slice(&cipher.decrypt_block(block)?);
    }
    Ok(plaintext)
}

/// Each plaintext block is XOR-ed with the previous ciphertext block (the IV for the first) before
/// encryption.
///
/// # Errors
///
/// [`Error::InvalidIvLength`] or [`Error::MisalignedInput`].
pub fn encrypt_cbc<C: BlockCipher + ?Sized>(
    cipher: &C,
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let block_size = cipher.block_size();
    check_iv(iv, block_size)?;
    check_aligned(plaintext.len(), block_size)?;

    let mut ciphertext = Vec::with_capacity(plaintext.len());
    let mut last_ciphertext_block = iv.to_vec();

    for block in plaintext.chunks_exact(block_size) {
        last_ciphertext_block = cipher.encrypt_block(&block.xor(&last_ciphertext_block))?;
        ciphertext.extend_from_slice(&last_ciphertext_block);
    }

    Ok(ciphertext)
}

/// Inverse of [`encrypt_cbc`]: each decrypted block is XOR-ed with the previous *ciphertext*
/// block. Padding is left in place.
///
/// # Errors
///
/// [`Error::InvalidIvLength`] or [`Error::MisalignedInput`].
pub fn decrypt_cbc<C: BlockCipher + ?Sized>(
    cipher: &C,
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let block_size = cipher.block_size();
    check_iv(iv, block_size)?;
    check_aligned(ciphertext.len(), block_size)?;

    let mut plaintext = Vec::with_capacity(ciphertext.len());
    let mut previous = iv;

    for block in ciphertext.chunks_exact(block_size) {
        plaintext.extend_from_slice(&cipher.decrypt_block(block)?.xor(previous));
        previous = block;
    }

    Ok(plaintext)
}

/// Counter mode. The keystream block `n` is `E(nonce ++ counter)`, where the counter fills the
/// rest of the block and is little-endian, carrying from its low byte upwards. Any data length is
/// accepted; encryption and decryption are the same operation.
///
/// # Errors
///
/// [`Error::InvalidNonceLength`] unless the nonce leaves at least one counter byte.
pub fn apply_ctr<C: BlockCipher + ?Sized>(cipher: &C, nonce: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let block_size = cipher.block_size();
    if nonce.len() >= block_size {
        return Err(Error::InvalidNonceLength {
            len: nonce.len(),
            block_size,
        });
    }

    let mut counter_block = vec![0; block_size];
    counter_block[..nonce.len()].copy_from_slice(nonce);

    let mut output = Vec::with_capacity(data.len());
    for chunk in data.chunks(block_size) {
        let keystream = cipher.encrypt_block(&counter_block)?;
        output.extend(chunk.iter().zip(keystream).map(|(a, b)| a ^ b));

        for byte in &mut counter_block[nonce.len()..] {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                break;
            }
        }
    }

    Ok(output)
}

/// # Errors
///
/// See [`apply_ctr`].
pub fn encrypt_ctr<C: BlockCipher + ?Sized>(
    cipher: &C,
    nonce: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    apply_ctr(cipher, nonce, plaintext)
}

/// # Errors
///
/// See [`apply_ctr`].
pub fn decrypt_ctr<C: BlockCipher + ?Sized>(
    cipher: &C,
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    apply_ctr(cipher, nonce, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cipher::Aes128, oracle::gen_random_bytes, padding::pkcs7_padded};
    use base64::{engine::general_purpose::STANDARD, Engine};

    const KEY: &[u8] = b"This is 16 bytes";
    const PLAINTEXTS: &[&[u8]] = &[
        // general
        b"My name is Ozymandias, King of Kings;\n\
        Look on my Works, ye Mighty, and despair!",
        // exactly 1 block
        b"0123456789abcdef",
        // empty
        b"",
    ];

    #[test]
    fn test_ecb_matches_openssl() {
        use openssl::symm::{encrypt, Cipher};
        let cipher = Aes128::new(KEY).unwrap();

        for &plaintext in PLAINTEXTS {
            let expected = encrypt(Cipher::aes_128_ecb(), KEY, None, plaintext).unwrap();
            let actual = encrypt_ecb(&cipher, &pkcs7_padded(plaintext, 16)).unwrap();

            assert_eq!(
                actual,
                expected,
                r#"plaintext: "{}""#,
                plaintext.escape_ascii()
            );
        }
    }

    #[test]
    fn test_cbc_matches_openssl() {
        use openssl::symm::{decrypt, encrypt, Cipher};
        let cipher = Aes128::new(KEY).unwrap();

        for &plaintext in PLAINTEXTS {
            let iv = gen_random_bytes(16);
            let expected = encrypt(Cipher::aes_128_cbc(), KEY, Some(&iv), plaintext).unwrap();
            let actual = encrypt_cbc(&cipher, &iv, &pkcs7_padded(plaintext, 16)).unwrap();
            assert_eq!(actual, expected);

            let decrypted = decrypt(Cipher::aes_128_cbc(), KEY, Some(&iv), &actual).unwrap();
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn test_round_trips() {
        let cipher = Aes128::random();
        let iv = gen_random_bytes(16);

        for &plaintext in PLAINTEXTS {
            let padded = pkcs7_padded(plaintext, 16);

            let ecb = encrypt_ecb(&cipher, &padded).unwrap();
            assert_eq!(decrypt_ecb(&cipher, &ecb).unwrap(), padded);

            let cbc = encrypt_cbc(&cipher, &iv, &padded).unwrap();
            assert_eq!(decrypt_cbc(&cipher, &iv, &cbc).unwrap(), padded);

            // CTR takes unaligned data as is
            let ctr = encrypt_ctr(&cipher, &[0; 8], plaintext).unwrap();
            assert_eq!(ctr.len(), plaintext.len());
            assert_eq!(decrypt_ctr(&cipher, &[0; 8], &ctr).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_misaligned_input() {
        let cipher = Aes128::random();
        assert!(matches!(
            encrypt_ecb(&cipher, b"not a block"),
            Err(Error::MisalignedInput {
                len: 11,
                block_size: 16
            })
        ));
        assert!(matches!(
            decrypt_cbc(&cipher, &[0; 16], &[0; 17]),
            Err(Error::MisalignedInput { .. })
        ));
    }

    #[test]
    fn test_invalid_iv_length() {
        let cipher = Aes128::random();
        assert!(matches!(
            encrypt_cbc(&cipher, &[0; 8], &[0; 16]),
            Err(Error::InvalidIvLength {
                len: 8,
                block_size: 16
            })
        ));
        assert!(matches!(
            apply_ctr(&cipher, &[0; 16], b"data"),
            Err(Error::InvalidNonceLength { .. })
        ));
    }

    #[test]
    fn test_cbc_decrypt_known_key() {
        // AES-128-CBC vectors from NIST SP 800-38A, F.2.1
        let cipher = Aes128::new(&hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap()).unwrap();
        let iv = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let plaintext = hex::decode(
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51",
        )
        .unwrap();
        let ciphertext = hex::decode(
            "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2",
        )
        .unwrap();

        assert_eq!(encrypt_cbc(&cipher, &iv, &plaintext).unwrap(), ciphertext);
        assert_eq!(decrypt_cbc(&cipher, &iv, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_ctr_known_keystream() {
        let ciphertext = STANDARD
            .decode("L77na/nrFsKvynd6HzOoG7GHTLXsTVu9qvY/2syLXzhPweyyMTJULu/6/kXX0KSvoOLSFQ==")
            .unwrap();
        let cipher = Aes128::new(b"YELLOW SUBMARINE").unwrap();

        let plaintext = decrypt_ctr(&cipher, &[0; 8], &ciphertext).unwrap();
        assert!(plaintext.starts_with(b"Yo, VIP Let's kick it Ice, Ice, baby"));
    }

    #[test]
    fn test_ctr_counter_carries() {
        let cipher = Aes128::random();
        let nonce = [7; 8];

        // keystream block 256 must use counter bytes [0, 1, 0, ...]
        let keystream = apply_ctr(&cipher, &nonce, &[0; 257 * 16]).unwrap();
        let mut counter_block = nonce.to_vec();
        counter_block.extend_from_slice(&[0, 1, 0, 0, 0, 0, 0, 0]);

        let expected = cipher.encrypt_block(&counter_block).unwrap();
        assert_eq!(&keystream[256 * 16..], expected.as_slice());
    }
}
