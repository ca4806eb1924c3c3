//! The pull loop driving one stream session
//!
//! A session moves from idle (constructed) to streaming (inside
//! [`StreamSession::run`]) to one terminal outcome. `run` consumes the
//! session, so a finished session cannot be restarted.

use tracing::{debug, trace, warn};

use super::source::SourceGuard;
use super::{ByteSource, CancelToken, Outcome, StreamError, StreamReport, StreamStats};
use crate::app::StreamConfig;
use crate::decoder::Utf8Decoder;
use crate::parser::{Frame, LineFramer};

/// One response stream bound to its source, decoder and framer
#[derive(Debug)]
pub struct StreamSession<S: ByteSource> {
    source: SourceGuard<S>,
    decoder: Utf8Decoder,
    framer: LineFramer,
    cancel: CancelToken,
    stats: StreamStats,
}

impl<S: ByteSource> StreamSession<S> {
    /// Create a session with the default configuration
    pub fn new(source: S) -> Self {
        Self::with_config(source, &StreamConfig::default())
    }

    /// Create a session with the given configuration
    pub fn with_config(source: S, config: &StreamConfig) -> Self {
        Self {
            source: SourceGuard::new(source),
            decoder: Utf8Decoder::new(),
            framer: LineFramer::with_limit(config.max_pending_bytes),
            cancel: CancelToken::new(),
            stats: StreamStats::default(),
        }
    }

    /// Use an existing token instead of the session's own
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels this session
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the session to completion.
    ///
    /// `on_fragment` is called synchronously for every content frame, in
    /// stream order. The next chunk is not read until it returns. The
    /// source is released before the report is returned, and also if the
    /// callback panics.
    pub fn run<F>(mut self, mut on_fragment: F) -> StreamReport
    where
        F: FnMut(&str),
    {
        let span = tracing::debug_span!("stream_session");
        let _enter = span.enter();
        debug!("streaming started");

        let outcome = self.pump(&mut on_fragment);
        self.source.release();

        self.stats.invalid_sequences = self.decoder.invalid_sequences();
        debug!(
            outcome = %outcome,
            fragments = self.stats.fragments_dispatched,
            skipped = self.stats.frames_skipped,
            "streaming finished"
        );

        StreamReport {
            outcome,
            stats: self.stats,
        }
    }

    fn pump<F>(&mut self, on_fragment: &mut F) -> Outcome
    where
        F: FnMut(&str),
    {
        loop {
            if self.cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            let chunk = match self.source.next_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return self.finish(on_fragment),
                Err(err) => {
                    warn!("Stream transport failed: {}", err);
                    return Outcome::Failed(StreamError::Transport(err));
                },
            };
            self.stats.chunks_read += 1;
            self.stats.bytes_read += chunk.len() as u64;

            let text = self.decoder.decode(&chunk);
            for line in self.framer.feed(&text) {
                self.stats.lines_framed += 1;
                let frame = Frame::parse(&line);
                if let Some(outcome) = dispatch(frame, &self.cancel, &mut self.stats, on_fragment) {
                    return outcome;
                }
            }

            if let Err(err) = self.framer.check_limit() {
                warn!("Stream line buffer overflow: {}", err);
                return Outcome::Failed(StreamError::BufferOverflow(err));
            }
        }
    }

    /// Handle end of stream: drop any dangling UTF-8 tail and treat the
    /// unterminated remainder as a last line.
    fn finish<F>(&mut self, on_fragment: &mut F) -> Outcome
    where
        F: FnMut(&str),
    {
        self.decoder.finish();
        if let Some(line) = self.framer.flush() {
            self.stats.lines_framed += 1;
            let frame = Frame::parse(&line);
            if let Some(outcome) = dispatch(frame, &self.cancel, &mut self.stats, on_fragment) {
                return outcome;
            }
        }
        Outcome::Completed
    }
}

/// Act on one frame. Returns an outcome when the session must stop.
fn dispatch<F>(
    frame: Frame,
    cancel: &CancelToken,
    stats: &mut StreamStats,
    on_fragment: &mut F,
) -> Option<Outcome>
where
    F: FnMut(&str),
{
    match frame {
        Frame::Content(text) => {
            if cancel.is_cancelled() {
                return Some(Outcome::Cancelled);
            }
            on_fragment(&text);
            stats.fragments_dispatched += 1;
            None
        },
        Frame::Sentinel => {
            stats.sentinel_seen = true;
            Some(Outcome::Completed)
        },
        Frame::Unrecognized(line) => {
            trace!(line = %line, "skipping unrecognized frame");
            stats.frames_skipped += 1;
            None
        },
        Frame::Blank => None,
    }
}

/// Run a session over `source` with the default configuration
pub fn run<S, F>(source: S, on_fragment: F) -> Outcome
where
    S: ByteSource,
    F: FnMut(&str),
{
    StreamSession::new(source).run(on_fragment).outcome
}
