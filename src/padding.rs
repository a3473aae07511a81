//! PKCS#7 padding.
//!
//! Invalid padding is reported as `None`/`false` and never as an error, so a padding oracle built
//! on top of these functions leaks exactly one bit.

/// Pad `data` in place to a multiple of `block_size`. A full block of padding is added when the
/// data is already aligned.
///
/// # Panics
///
/// If `block_size` is 0 or larger than 255.
pub fn pad_pkcs7(data: &mut Vec<u8>, block_size: usize) {
    assert!(
        (1..=255).contains(&block_size),
        "PKCS#7 block size must be in 1..=255, got {block_size}"
    );
    let pad_len = block_size - data.len() % block_size;
    #[allow(clippy::cast_possible_truncation)]
    data.resize(data.len() + pad_len, pad_len as u8);
}

/// Copying form of [`pad_pkcs7`].
#[must_use]
pub fn pkcs7_padded(data: &[u8], block_size: usize) -> Vec<u8> {
    let mut padded = Vec::with_capacity(data.len() + block_size);
    padded.extend_from_slice(data);
    pad_pkcs7(&mut padded, block_size);
    padded
}

/// Strip PKCS#7 padding, returning `None` when the padding is malformed.
///
/// Data that is empty or not a multiple of `block_size` is malformed, as is a final byte outside
/// `1..=block_size` or a padding run whose bytes are not all equal to the final byte.
#[must_use]
pub fn unpad_pkcs7(data: &[u8], block_size: usize) -> Option<&[u8]> {
    if block_size == 0 || data.is_empty() || data.len() % block_size != 0 {
        return None;
    }

    let pad_len = *data.last()?;
    if pad_len == 0 || usize::from(pad_len) > block_size {
        return None;
    }

    let unpadded_len = data.len() - usize::from(pad_len);
    data[unpadded_len..]
        .iter()
        .all(|&x| x == pad_len)
        .then_some(&data[..unpadded_len])
}

#[must_use]
pub fn is_pkcs7_valid(data: &[u8], block_size: usize) -> bool {
    unpad_pkcs7(data, block_size).is_some()
}
