//! Incremental text decoding
//!
//! Turns raw response bytes into text, carrying an incomplete
//! multi-byte tail from one chunk to the next.

mod utf8;

pub use utf8::{Utf8Decoder, Utf8Result};
