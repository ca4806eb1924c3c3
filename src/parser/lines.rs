//! Line framing over decoded text
//!
//! The framer accumulates text and hands out complete lines. Anything
//! after the last terminator is carried over to the next call.

/// Error raised when the carried-over line grows past the configured limit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramerError {
    #[error("pending line of {len} bytes exceeds limit of {limit} bytes")]
    LineTooLong { len: usize, limit: usize },
}

/// Splits a text stream into `\n`-terminated lines
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: String,
    /// Prefix of `buffer` already known to hold no terminator
    scanned: usize,
    /// Maximum carried-over bytes, 0 for unlimited
    limit: usize,
}

impl LineFramer {
    /// Create a framer without a carry-over limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a framer that rejects carry-over longer than `limit` bytes.
    /// A limit of 0 disables the check.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Append text and iterate over the lines it completes.
    ///
    /// Lines are yielded without their terminator; a trailing `\r` is
    /// stripped as well. Lines not pulled from the iterator stay buffered.
    pub fn feed(&mut self, text: &str) -> Lines<'_> {
        self.buffer.push_str(text);
        let search = self.scanned;
        Lines {
            framer: self,
            pos: 0,
            search,
            exhausted: false,
        }
    }

    /// Text after the last terminator
    pub fn pending(&self) -> &str {
        // buffer[..scanned] never holds a terminator
        match self.buffer[self.scanned..].rfind('\n') {
            Some(idx) => &self.buffer[self.scanned + idx + 1..],
            None => &self.buffer,
        }
    }

    /// Fail if the carried-over text exceeds the limit
    pub fn check_limit(&self) -> Result<(), FramerError> {
        let len = self.pending().len();
        if self.limit > 0 && len > self.limit {
            return Err(FramerError::LineTooLong {
                len,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Take the unterminated remainder as a final line.
    ///
    /// Returns `None` when nothing is buffered, so flushing twice never
    /// yields a second line.
    pub fn flush(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.buffer);
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

/// Lazy iterator over the complete lines in a [`LineFramer`]
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
    /// Start of the next unread line
    pos: usize,
    /// Where the search for the first terminator may start
    search: usize,
    exhausted: bool,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        let from = self.pos.max(self.search);
        let buffer = &self.framer.buffer;
        let Some(offset) = buffer[from..].find('\n') else {
            self.exhausted = true;
            return None;
        };
        let end = from + offset;
        let line = &buffer[self.pos..end];
        let line = line.strip_suffix('\r').unwrap_or(line).to_string();
        self.pos = end + 1;
        Some(line)
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.framer.buffer.drain(..self.pos);
        self.framer.scanned = if self.exhausted {
            self.framer.buffer.len()
        } else {
            0
        };
    }
}
