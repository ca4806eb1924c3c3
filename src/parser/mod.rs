//! Response stream framing
//!
//! Splits decoded text into lines and classifies each line as a frame.

mod frame;
mod lines;

pub use frame::{encode_content, encode_done, is_done_token, Frame, DATA_PREFIX, DONE_TOKEN};
pub use lines::{FramerError, LineFramer, Lines};
