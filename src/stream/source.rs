//! Byte sources feeding a stream session
//!
//! The transport that opens the HTTP connection lives outside this crate.
//! It only has to hand over raw chunks through [`ByteSource`].

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use super::SourceError;

/// Default read size for [`ReaderSource`]
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// A pull-based supplier of raw response bytes
pub trait ByteSource {
    /// Read the next chunk.
    ///
    /// Returns `Ok(None)` at end of stream. An empty chunk is allowed
    /// and carries no meaning.
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SourceError>;

    /// Close the underlying resource. Called exactly once per session.
    fn release(&mut self);
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        (**self).next_chunk()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Adapts any blocking reader (response body, file, stdin)
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: Option<R>,
    buf: Vec<u8>,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap a reader using the default chunk size
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap a reader, reading at most `chunk_size` bytes per chunk
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader: Some(reader),
            buf: vec![0; chunk_size.max(1)],
        }
    }

    /// Whether the reader has been dropped
    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let reader = self.reader.as_mut().ok_or(SourceError::Released)?;
        loop {
            match reader.read(&mut self.buf) {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(self.buf[..n].to_vec())),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn release(&mut self) {
        // Dropping the reader closes the body
        self.reader = None;
    }
}

/// Replays a scripted sequence of chunks and errors
#[derive(Debug, Default)]
pub struct ChunkSource {
    items: VecDeque<Result<Vec<u8>, SourceError>>,
    released: bool,
}

impl ChunkSource {
    /// Create a source yielding `chunks` and then end of stream
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            items: chunks.into_iter().map(|c| Ok(c.into())).collect(),
            released: false,
        }
    }

    /// Append a chunk
    pub fn chunk(mut self, chunk: impl Into<Vec<u8>>) -> Self {
        self.items.push_back(Ok(chunk.into()));
        self
    }

    /// Append a transport failure
    pub fn error(mut self, err: SourceError) -> Self {
        self.items.push_back(Err(err));
        self
    }

    /// Number of items not yet read
    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    /// Whether [`ByteSource::release`] has been called
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl ByteSource for ChunkSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        if self.released {
            return Err(SourceError::Released);
        }
        self.items.pop_front().transpose()
    }

    fn release(&mut self) {
        self.released = true;
        self.items.clear();
    }
}

/// Owns a source and releases it exactly once, on drop at the latest
#[derive(Debug)]
pub(crate) struct SourceGuard<S: ByteSource> {
    source: S,
    released: bool,
}

impl<S: ByteSource> SourceGuard<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub(crate) fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        if self.released {
            return Err(SourceError::Released);
        }
        self.source.next_chunk()
    }

    pub(crate) fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
            tracing::debug!("byte source released");
        }
    }
}

impl<S: ByteSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}
