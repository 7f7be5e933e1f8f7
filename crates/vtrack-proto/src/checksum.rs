//! XOR checksum used to seal and verify every binary-variant frame.

/// Bitwise XOR of every byte in `bytes`, seeded with zero.
#[must_use]
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}
