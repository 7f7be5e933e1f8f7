//! Lowercase, space-separated hex rendering for diagnostics and TLV display.

/// Renders `bytes` as lowercase hex pairs separated by single spaces.
#[must_use]
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| hex::encode([*b])).collect::<Vec<_>>().join(" ")
}
