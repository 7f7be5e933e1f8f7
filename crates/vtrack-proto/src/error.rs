//! Error taxonomy for the wire codecs.
//!
//! Every failure mode the codecs can produce is a variant here, matched
//! against the protocol's own error kinds rather than collapsed to a string.
//! Higher layers (`vtrack-core`) wrap this in their own error type; they never
//! need to pattern-match on a formatted message.

use thiserror::Error;

/// Failure decoding or validating a frame on the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Delimiter missing, misplaced, or a transparent-byte escape sequence
    /// was truncated/invalid.
    #[error("framing error: {0}")]
    Framing(String),

    /// Computed XOR checksum did not match the trailing byte.
    #[error("checksum mismatch: computed {computed:#04x}, frame claims {claimed:#04x}")]
    Checksum {
        /// Checksum computed over header + body.
        computed: u8,
        /// Checksum byte carried on the wire.
        claimed: u8,
    },

    /// Declared body length did not match the available bytes, or a
    /// mandatory fixed-layout body was shorter than required.
    #[error("length error: {0}")]
    Length(String),

    /// A TLV's declared length overran the remaining body. Parsing of
    /// further TLVs stops; the fixed prefix already parsed is unaffected.
    #[error("tlv error: tag {tag:#04x} declared length {declared} exceeds {available} remaining bytes")]
    Tlv {
        /// Tag of the offending TLV.
        tag: u8,
        /// Length the TLV claimed.
        declared: usize,
        /// Bytes actually remaining in the body.
        available: usize,
    },
}
