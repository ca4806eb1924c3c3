//! Shared helpers for stream integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chat_stream::parser::{encode_content, encode_done};
use chat_stream::stream::{ByteSource, ChunkSource, SourceError, StreamReport, StreamSession};

/// Counters observed from outside a session that owns the source
#[derive(Debug, Clone, Default)]
pub struct Probe {
    reads: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl Probe {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// A scripted source that records reads and releases
pub struct TrackedSource {
    inner: ChunkSource,
    probe: Probe,
}

impl TrackedSource {
    pub fn new(inner: ChunkSource) -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                inner,
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl ByteSource for TrackedSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.next_chunk()
    }

    fn release(&mut self) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release();
    }
}

/// Wire bytes for the given fragments, optionally closed by the sentinel
pub fn wire(fragments: &[&str], done: bool) -> Vec<u8> {
    let mut out = String::new();
    for fragment in fragments {
        out.push_str(&encode_content(fragment));
    }
    if done {
        out.push_str(&encode_done());
    }
    out.into_bytes()
}

/// Split `bytes` at the given offsets (unsorted, may repeat)
pub fn split_at(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<Vec<u8>> {
    cuts.retain(|&c| c > 0 && c < bytes.len());
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

/// Run a session and collect its fragments
pub fn run_collect<S: ByteSource>(session: StreamSession<S>) -> (Vec<String>, StreamReport) {
    let mut fragments = Vec::new();
    let report = session.run(|text| fragments.push(text.to_string()));
    (fragments, report)
}
