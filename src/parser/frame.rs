//! Frame classification and encoding
//!
//! Each complete line of the response stream is one frame. Data frames
//! look like `data: {"content":"..."}`; a content of `[DONE]` ends the
//! stream. Everything else is skipped.

use serde::Deserialize;

/// Prefix marking a data frame (case-sensitive)
pub const DATA_PREFIX: &str = "data: ";

/// Token signalling an intentional end of stream
pub const DONE_TOKEN: &str = "[DONE]";

/// A classified line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text fragment to hand to the consumer
    Content(String),
    /// End-of-stream marker embedded in the data
    Sentinel,
    /// A line that is not a usable data frame, kept for diagnostics
    Unrecognized(String),
    /// Empty or whitespace-only line
    Blank,
}

/// JSON body of a data frame
#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    content: Option<String>,
}

impl Frame {
    /// Classify a single line. Never fails: anything malformed becomes
    /// [`Frame::Unrecognized`].
    pub fn parse(line: &str) -> Frame {
        if line.trim().is_empty() {
            return Frame::Blank;
        }

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Frame::Unrecognized(line.to_string());
        };

        if is_done_token(payload) {
            return Frame::Sentinel;
        }

        match serde_json::from_str::<Payload>(payload) {
            Ok(Payload {
                content: Some(content),
            }) => {
                if is_done_token(&content) {
                    Frame::Sentinel
                } else if content.is_empty() {
                    Frame::Unrecognized(line.to_string())
                } else {
                    Frame::Content(content)
                }
            },
            _ => Frame::Unrecognized(line.to_string()),
        }
    }
}

/// Whether `text` reads as the end-of-stream token once trimmed.
///
/// Such text cannot travel as a fragment: it decodes as [`Frame::Sentinel`].
pub fn is_done_token(text: &str) -> bool {
    text.trim() == DONE_TOKEN
}

/// Encode a text fragment as a data frame, including the blank line
/// that separates events.
///
/// Content for which [`is_done_token`] holds is reserved and ends the
/// stream on the receiving side.
pub fn encode_content(content: &str) -> String {
    format!(
        "{DATA_PREFIX}{{\"content\":{}}}\n\n",
        serde_json::Value::from(content)
    )
}

/// Encode the end-of-stream frame
pub fn encode_done() -> String {
    encode_content(DONE_TOKEN)
}
