//! Chat Stream
//!
//! Incremental decoder for token-by-token chat assistant responses
//! delivered over a single long-lived HTTP response body.
//!
//! - `decoder`: UTF-8 decoding across chunk boundaries
//! - `parser`: line framing and `data: ` frame classification
//! - `stream`: the session pull loop, byte sources and cancellation
//! - `app`: configuration
//!
//! ```
//! use chat_stream::stream::{run, ChunkSource};
//!
//! let source = ChunkSource::new(["data: {\"content\":\"Hel", "lo\"}\n", "data: [DONE]\n"]);
//! let mut text = String::new();
//! let outcome = run(source, |fragment| text.push_str(fragment));
//!
//! assert!(outcome.is_completed());
//! assert_eq!(text, "Hello");
//! ```

pub mod app;
pub mod decoder;
pub mod parser;
pub mod stream;
