//! Chunked transfer-coding parser.
//!
//! A small state machine nested inside the main parser, entered once the
//! header block says `Transfer-Encoding: chunked`: wait for a size line,
//! stream that many body bytes, then either loop back for the next
//! chunk size or (on a zero-size chunk) consume the optional trailer and
//! finish.

use crate::error::ChunkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the hex chunk-size line (and its CRLF).
    Size,
    /// Streaming `remaining` more body bytes for the current chunk.
    Body { remaining: u64 },
    /// Consumed a chunk's bytes; waiting for the CRLF that follows them.
    ChunkEnd,
    /// Saw the zero-size chunk; consuming trailer headers up to the
    /// final blank line. Trailers themselves are discarded — this engine
    /// has nowhere to attach them once the message head is already
    /// dispatched.
    Trailer,
    Finish,
    Error(ChunkError),
}

/// Result of one [`ChunkedParser::advance`] call.
pub enum ChunkStep {
    /// Needs more input.
    Wait,
    /// `len` bytes of body starting at the parser's current input
    /// position belong to a chunk; the caller should treat them as body
    /// bytes and call `advance` again with the remainder.
    Body { len: u64 },
    /// The terminating zero-size chunk and any trailer have been fully
    /// consumed; `consumed` is how many bytes of the input belonged to
    /// framing (size lines, CRLFs, trailer) at this step.
    Finish { consumed: usize },
    Error(ChunkError),
}

pub struct ChunkedParser {
    state: State,
}

impl ChunkedParser {
    pub fn new() -> Self {
        ChunkedParser { state: State::Size }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finish)
    }

    pub fn is_errored(&self) -> bool {
        matches!(self.state, State::Error(_))
    }

    /// Advances the parser using `data`, the bytes available starting
    /// right after wherever the parser left off. Returns one step at a
    /// time; callers loop until `Wait` to drain everything currently
    /// buffered.
    pub fn advance(&mut self, data: &[u8]) -> (usize, ChunkStep) {
        match self.state {
            State::Size => self.advance_size(data),
            State::Body { remaining } => self.advance_body(data, remaining),
            State::ChunkEnd => self.advance_chunk_end(data),
            State::Trailer => self.advance_trailer(data),
            State::Finish => (0, ChunkStep::Finish { consumed: 0 }),
            State::Error(e) => (0, ChunkStep::Error(e)),
        }
    }

    fn advance_size(&mut self, data: &[u8]) -> (usize, ChunkStep) {
        let line_end = match find_crlf(data) {
            Some(p) => p,
            None => return (0, ChunkStep::Wait),
        };
        let line = &data[..line_end];
        // chunk extensions (";name=value") are accepted and ignored.
        let hex_end = line.iter().position(|&b| b == b';').unwrap_or(line.len());
        let size = match std::str::from_utf8(&line[..hex_end])
            .ok()
            .and_then(|s| u64::from_str_radix(s.trim_end(), 16).ok())
        {
            Some(s) => s,
            None => {
                self.state = State::Error(ChunkError::InvalidSizeLine);
                // Skip past the malformed size line itself so a caller
                // that recovers by resuming parsing after this point
                // doesn't re-read the broken bytes as something else.
                return (line_end + 2, ChunkStep::Error(ChunkError::InvalidSizeLine));
            }
        };
        let consumed = line_end + 2;
        if size == 0 {
            self.state = State::Trailer;
        } else {
            self.state = State::Body { remaining: size };
        }
        (consumed, ChunkStep::Wait)
    }

    fn advance_body(&mut self, data: &[u8], remaining: u64) -> (usize, ChunkStep) {
        if data.is_empty() {
            return (0, ChunkStep::Wait);
        }
        let take = remaining.min(data.len() as u64);
        let left = remaining - take;
        self.state = if left == 0 {
            State::ChunkEnd
        } else {
            State::Body { remaining: left }
        };
        (0, ChunkStep::Body { len: take })
    }

    fn advance_chunk_end(&mut self, data: &[u8]) -> (usize, ChunkStep) {
        if data.len() < 2 {
            return (0, ChunkStep::Wait);
        }
        if &data[..2] != b"\r\n" {
            self.state = State::Error(ChunkError::InvalidSizeLine);
            return (2, ChunkStep::Error(ChunkError::InvalidSizeLine));
        }
        self.state = State::Size;
        (2, ChunkStep::Wait)
    }

    fn advance_trailer(&mut self, data: &[u8]) -> (usize, ChunkStep) {
        // A bare CRLF ends the (possibly empty) trailer block; anything
        // else is a trailer header line to be skipped.
        let line_end = match find_crlf(data) {
            Some(p) => p,
            None => return (0, ChunkStep::Wait),
        };
        let consumed = line_end + 2;
        if line_end == 0 {
            self.state = State::Finish;
            return (consumed, ChunkStep::Finish { consumed });
        }
        (consumed, ChunkStep::Wait)
    }
}

impl Default for ChunkedParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}
