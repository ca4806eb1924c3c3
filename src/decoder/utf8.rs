//! UTF-8 decoding for the response stream
//!
//! Handles streaming UTF-8 decoding across arbitrary chunk boundaries.
//! Invalid sequences are dropped rather than replaced, and decoding
//! resynchronizes on the next byte that can start a character.

/// UTF-8 decoder state
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    /// Bytes accumulated for current character
    buffer: [u8; 4],
    /// Number of bytes in buffer
    len: usize,
    /// Expected total bytes for current character
    expected: usize,
    /// Sequences dropped since creation
    invalid: u64,
}

/// Result of feeding a byte to the decoder
#[derive(Debug, Clone, PartialEq)]
pub enum Utf8Result {
    /// Need more bytes
    Pending,
    /// Successfully decoded a character
    Char(char),
    /// Invalid sequence, the bytes were dropped
    Invalid,
}

impl Utf8Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the decoder state, discarding any incomplete tail
    pub fn reset(&mut self) {
        self.len = 0;
        self.expected = 0;
    }

    /// Check if decoder is in the middle of a sequence
    pub fn is_pending(&self) -> bool {
        self.len > 0
    }

    /// Number of bytes held in the incomplete tail (never more than 3)
    pub fn pending_len(&self) -> usize {
        self.len
    }

    /// Number of invalid sequences dropped so far
    pub fn invalid_sequences(&self) -> u64 {
        self.invalid
    }

    /// Decode a chunk, prepending any tail left by the previous call.
    ///
    /// Returns all complete characters. Trailing bytes of an unfinished
    /// character are kept until the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut out = String::with_capacity(chunk.len());
        for &byte in chunk {
            match self.feed(byte) {
                Utf8Result::Char(c) => out.push(c),
                Utf8Result::Pending | Utf8Result::Invalid => {},
            }
        }
        out
    }

    /// Finish the stream. An incomplete tail can never become valid
    /// and is dropped.
    pub fn finish(&mut self) {
        if self.is_pending() {
            tracing::debug!(bytes = self.len, "dropping incomplete UTF-8 tail at end of stream");
            self.invalid += 1;
            self.reset();
        }
    }

    /// Feed a byte to the decoder
    pub fn feed(&mut self, byte: u8) -> Utf8Result {
        let result = self.step(byte);
        if result == Utf8Result::Invalid {
            self.invalid += 1;
        }
        result
    }

    fn step(&mut self, byte: u8) -> Utf8Result {
        // ASCII fast path
        if self.len == 0 && byte < 0x80 {
            return Utf8Result::Char(byte as char);
        }

        if self.len == 0 {
            return self.start(byte);
        }

        // Continuation byte
        if byte & 0b1100_0000 != 0b1000_0000 {
            // The unfinished sequence is lost, but this byte may start
            // the next character. Count the drop here and let the
            // caller see the outcome of the restart.
            self.reset();
            self.invalid += 1;
            return if byte < 0x80 {
                Utf8Result::Char(byte as char)
            } else {
                self.start(byte)
            };
        }

        self.buffer[self.len] = byte;
        self.len += 1;

        if self.len < self.expected {
            return Utf8Result::Pending;
        }

        let result = self.complete();
        self.reset();
        result
    }

    /// Begin a multi-byte sequence
    fn start(&mut self, byte: u8) -> Utf8Result {
        let expected = if byte & 0b1110_0000 == 0b1100_0000 {
            2
        } else if byte & 0b1111_0000 == 0b1110_0000 {
            3
        } else if byte & 0b1111_1000 == 0b1111_0000 {
            4
        } else {
            // Stray continuation byte or 0xF8..=0xFF
            return Utf8Result::Invalid;
        };

        self.buffer[0] = byte;
        self.len = 1;
        self.expected = expected;
        Utf8Result::Pending
    }

    /// Decode a complete sequence held in the buffer
    fn complete(&self) -> Utf8Result {
        let b = &self.buffer;
        let cp = match self.expected {
            2 => ((b[0] & 0x1F) as u32) << 6 | (b[1] & 0x3F) as u32,
            3 => {
                ((b[0] & 0x0F) as u32) << 12 | ((b[1] & 0x3F) as u32) << 6 | (b[2] & 0x3F) as u32
            },
            4 => {
                ((b[0] & 0x07) as u32) << 18
                    | ((b[1] & 0x3F) as u32) << 12
                    | ((b[2] & 0x3F) as u32) << 6
                    | (b[3] & 0x3F) as u32
            },
            _ => return Utf8Result::Invalid,
        };

        // Reject overlong encodings
        let min = match self.expected {
            2 => 0x80,
            3 => 0x800,
            _ => 0x10000,
        };
        if cp < min {
            return Utf8Result::Invalid;
        }

        // from_u32 rejects surrogates and anything past U+10FFFF
        char::from_u32(cp)
            .map(Utf8Result::Char)
            .unwrap_or(Utf8Result::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(b'A'), Utf8Result::Char('A'));
        assert_eq!(decoder.feed(b'z'), Utf8Result::Char('z'));
        assert_eq!(decoder.feed(b'0'), Utf8Result::Char('0'));
    }

    #[test]
    fn test_two_byte() {
        let mut decoder = Utf8Decoder::new();
        // 'é' = U+00E9 = 0xC3 0xA9
        assert_eq!(decoder.feed(0xC3), Utf8Result::Pending);
        assert_eq!(decoder.feed(0xA9), Utf8Result::Char('é'));
    }

    #[test]
    fn test_three_byte() {
        let mut decoder = Utf8Decoder::new();
        // '中' = U+4E2D = 0xE4 0xB8 0xAD
        assert_eq!(decoder.feed(0xE4), Utf8Result::Pending);
        assert_eq!(decoder.feed(0xB8), Utf8Result::Pending);
        assert_eq!(decoder.feed(0xAD), Utf8Result::Char('中'));
    }

    #[test]
    fn test_four_byte() {
        let mut decoder = Utf8Decoder::new();
        // '😀' = U+1F600 = 0xF0 0x9F 0x98 0x80
        assert_eq!(decoder.feed(0xF0), Utf8Result::Pending);
        assert_eq!(decoder.feed(0x9F), Utf8Result::Pending);
        assert_eq!(decoder.feed(0x98), Utf8Result::Pending);
        assert_eq!(decoder.feed(0x80), Utf8Result::Char('😀'));
    }

    #[test]
    fn test_invalid_start() {
        let mut decoder = Utf8Decoder::new();
        // 0xFF is never valid in UTF-8
        assert_eq!(decoder.feed(0xFF), Utf8Result::Invalid);
        assert!(!decoder.is_pending());
    }

    #[test]
    fn test_invalid_continuation_resyncs_on_ascii() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(0xC3), Utf8Result::Pending);
        // The broken sequence is dropped but 'x' survives
        assert_eq!(decoder.feed(b'x'), Utf8Result::Char('x'));
        assert_eq!(decoder.invalid_sequences(), 1);
    }

    #[test]
    fn test_invalid_continuation_resyncs_on_start_byte() {
        let mut decoder = Utf8Decoder::new();
        // 0xE4 starts '中' but 0xC3 interrupts it and starts 'é'
        assert_eq!(decoder.decode(&[0xE4, 0xB8, 0xC3, 0xA9]), "é");
        assert_eq!(decoder.invalid_sequences(), 1);
    }

    #[test]
    fn test_overlong_encoding() {
        let mut decoder = Utf8Decoder::new();
        // Overlong encoding of 'A' (should be 0x41, not 0xC1 0x81)
        assert_eq!(decoder.feed(0xC1), Utf8Result::Pending);
        assert_eq!(decoder.feed(0x81), Utf8Result::Invalid);
    }

    #[test]
    fn test_surrogate_rejected() {
        let mut decoder = Utf8Decoder::new();
        // U+D800 encoded as 0xED 0xA0 0x80
        assert_eq!(decoder.decode(&[0xED, 0xA0, 0x80, b'k']), "k");
    }

    #[test]
    fn test_decode_split_across_chunks() {
        let mut decoder = Utf8Decoder::new();
        let bytes = "héllo 世界".as_bytes();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&decoder.decode(std::slice::from_ref(b)));
        }
        assert_eq!(out, "héllo 世界");
        assert!(!decoder.is_pending());
    }

    #[test]
    fn test_tail_never_exceeds_three_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[0xF0, 0x9F, 0x98]), "");
        assert_eq!(decoder.pending_len(), 3);
        assert_eq!(decoder.decode(&[0x80]), "😀");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_empty_chunk() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[0xE4]), "");
        assert_eq!(decoder.decode(&[]), "");
        assert_eq!(decoder.pending_len(), 1);
    }

    #[test]
    fn test_finish_drops_tail() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(&[0xE4, 0xB8]);
        decoder.finish();
        assert!(!decoder.is_pending());
        assert_eq!(decoder.invalid_sequences(), 1);

        // Finishing twice is a no-op
        decoder.finish();
        assert_eq!(decoder.invalid_sequences(), 1);
    }

    #[test]
    fn test_reset() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(0xC3), Utf8Result::Pending);
        assert!(decoder.is_pending());
        decoder.reset();
        assert!(!decoder.is_pending());
    }
}
