/// Byte-slice helpers shared by the XOR and block-mode code.
pub trait BytesExt {
    /// Xor self with another slice of bytes of equal length
    fn xor<B: AsRef<[u8]>>(&self, other: B) -> Vec<u8>;

    /// Xor with a single byte `n` times, where `n` is the length of the input
    fn xor_single(&self, n: u8) -> Vec<u8>;

    /// Xor with a repeating key
    fn xor_repeating_key<B: AsRef<[u8]>>(&self, key: B) -> Vec<u8>;

    /// Calculate the hamming distance between two slices of bytes
    fn hamming_distance<B: AsRef<[u8]>>(&self, other: B) -> usize;
}

fn assert_same_length(a: &[u8], b: &[u8]) {
    assert_eq!(
        a.len(),
        b.len(),
        "Length mismatch: {} != {}",
        a.len(),
        b.len()
    );
}

impl BytesExt for [u8] {
    /// # Panics
    ///
    /// If the two slices differ in length.
    fn xor<B: AsRef<[u8]>>(&self, other: B) -> Vec<u8> {
        assert_same_length(self, other.as_ref());

        self.iter()
            .zip(other.as_ref().iter())
            .map(|(a, b)| a ^ b)
            .collect()
    }

    fn xor_single(&self, n: u8) -> Vec<u8> {
        self.iter().map(|byte| byte ^ n).collect()
    }

    /// An empty key leaves the input unchanged.
    fn xor_repeating_key<B: AsRef<[u8]>>(&self, key: B) -> Vec<u8> {
        let key = key.as_ref();
        if key.is_empty() {
            return self.to_vec();
        }

        self.iter()
            .zip(key.iter().cycle())
            .map(|(input_byte, key_byte)| input_byte ^ key_byte)
            .collect()
    }

    /// # Panics
    ///
    /// If the two slices differ in length.
    fn hamming_distance<B: AsRef<[u8]>>(&self, other: B) -> usize {
        assert_same_length(self, other.as_ref());

        self.iter()
            .zip(other.as_ref().iter())
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum()
    }
}
