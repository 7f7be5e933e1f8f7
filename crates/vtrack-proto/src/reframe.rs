//! Byte-stream reframing: turns arbitrary chunk boundaries into whole frames.
//!
//! Each reframer owns a single accumulator and is meant to live for exactly
//! one connection. Feeding it chunks of any size yields the same ordered
//! sequence of frames regardless of how the bytes were split on the wire.

const BINARY_DELIMITER: u8 = 0x7E;
const BINARY_MAX_ACCUMULATOR: usize = 65_536;
const BINARY_TRUNCATE_TO: usize = 4_096;

const ASCII_START: u8 = b'*';
const ASCII_END: u8 = b'#';
const ASCII_MAX_ACCUMULATOR: usize = 10_000;
const ASCII_TRUNCATE_TO: usize = 1_000;

/// Reframer for the binary (0x7E-delimited) variant.
#[derive(Debug, Default)]
pub struct BinaryReframer {
    buf: Vec<u8>,
}

impl BinaryReframer {
    /// Creates an empty reframer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and drains every complete frame now available.
    ///
    /// Each returned frame is the interior between two 0x7E bytes, with the
    /// delimiters themselves stripped. Empty frames (adjacent delimiters)
    /// are dropped silently.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = self.buf.iter().position(|&b| b == BINARY_DELIMITER) else {
                self.buf.clear();
                break;
            };

            let Some(end_offset) =
                self.buf[start + 1..].iter().position(|&b| b == BINARY_DELIMITER)
            else {
                if start > 0 {
                    self.buf.drain(..start);
                }
                break;
            };
            let end = start + 1 + end_offset;

            if end > start + 1 {
                frames.push(self.buf[start + 1..end].to_vec());
            }
            self.buf.drain(..=end);
        }

        self.enforce_bound();
        frames
    }

    fn enforce_bound(&mut self) {
        if self.buf.len() > BINARY_MAX_ACCUMULATOR {
            let keep_from = self.buf.len() - BINARY_TRUNCATE_TO;
            self.buf.drain(..keep_from);
        }
    }
}

/// Reframer for the legacy ASCII (`*...#`-delimited) variant.
#[derive(Debug, Default)]
pub struct AsciiReframer {
    buf: Vec<u8>,
}

impl AsciiReframer {
    /// Creates an empty reframer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and drains every complete frame now available.
    ///
    /// Each returned frame includes both the leading `*` and the trailing
    /// `#`. Bytes outside any frame (whitespace, stray newlines) are
    /// discarded as they're skipped over.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = self.buf.iter().position(|&b| b == ASCII_START) else {
                self.buf.clear();
                break;
            };

            let Some(end_offset) = self.buf[start..].iter().position(|&b| b == ASCII_END) else {
                if start > 0 {
                    self.buf.drain(..start);
                }
                break;
            };
            let end = start + end_offset;

            frames.push(self.buf[start..=end].to_vec());
            self.buf.drain(..=end);
        }

        self.enforce_bound();
        frames
    }

    fn enforce_bound(&mut self) {
        if self.buf.len() > ASCII_MAX_ACCUMULATOR {
            let keep_from = self.buf.len() - ASCII_TRUNCATE_TO;
            self.buf.drain(..keep_from);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn single_frame_in_one_chunk() {
        let mut r = BinaryReframer::new();
        let frames = r.push(&[0x7E, 0x01, 0x02, 0x7E]);
        assert_eq!(frames, vec![vec![0x01, 0x02]]);
    }

    #[test]
    fn empty_frame_dropped() {
        let mut r = BinaryReframer::new();
        let frames = r.push(&[0x7E, 0x7E, 0x7E, 0x01, 0x7E]);
        assert_eq!(frames, vec![vec![0x01]]);
    }

    #[test]
    fn leading_garbage_before_first_delimiter_is_discarded() {
        let mut r = BinaryReframer::new();
        let frames = r.push(&[0xFF, 0xFF]);
        assert!(frames.is_empty());
        // Accumulator should now be empty; a fresh frame starts cleanly.
        let frames = r.push(&[0x7E, 0x01, 0x7E]);
        assert_eq!(frames, vec![vec![0x01]]);
    }

    #[test]
    fn ascii_basic_frame() {
        let mut r = AsciiReframer::new();
        let frames = r.push(b"noise*HQ,1#trailing");
        assert_eq!(frames, vec![b"*HQ,1#".to_vec()]);
    }

    proptest! {
        #[test]
        fn chunking_does_not_affect_binary_output(
            frame_bodies in prop::collection::vec(
                prop::collection::vec((0u8..=0xFFu8).prop_filter("no delimiter", |b| *b != 0x7E), 0..32),
                1..8
            ),
            split_seed in any::<u64>(),
        ) {
            let mut whole = Vec::new();
            for body in &frame_bodies {
                whole.push(0x7E);
                whole.extend_from_slice(body);
                whole.push(0x7E);
            }

            let mut one_shot = BinaryReframer::new();
            let expected = one_shot.push(&whole);

            // Split at pseudo-random boundaries derived from split_seed.
            let mut chunked = BinaryReframer::new();
            let mut got = Vec::new();
            let mut offset = 0usize;
            let mut state = split_seed.max(1);
            while offset < whole.len() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let step = 1 + (state % 7) as usize;
                let end = (offset + step).min(whole.len());
                got.extend(chunked.push(&whole[offset..end]));
                offset = end;
            }

            prop_assert_eq!(got, expected);
        }
    }
}
