//! The core incremental parser: the state machine that turns a stream of
//! `feed()` calls into a sequence of acceptor callbacks.
//!
//! The container only ever holds bytes the parser hasn't finished with
//! yet: head and header bytes are trimmed the moment the corresponding
//! message is dispatched to the acceptor, and body bytes are trimmed
//! chunk-by-chunk as they're handed out. A pipelined connection that
//! never pauses between messages never grows the buffer past one
//! message's headers plus whatever body bytes arrived in the same read.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::chunked::{ChunkStep, ChunkedParser};
use crate::container::{ByteContainer, HeaderEntry};
use crate::error::{ChunkError, ParseError};
use crate::head::{self, HeadLine};
use crate::headers::{HeaderBlockParser, HeaderStep, HeaderView};
use crate::message::{self, BodyFraming, Message};

/// Size limits the parser enforces before any body byte is accepted,
/// guarding against a client that never sends a terminator.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Longest allowed request/status line, in bytes, CRLF excluded.
    pub max_head_line: usize,
    /// Longest allowed header block, in bytes, including every `\r\n`
    /// but excluding the request/status line itself.
    pub max_header_block: usize,
    /// A sized body under this many bytes is delivered to the acceptor
    /// as a single `on_body_chunk` call once it's fully buffered; a
    /// larger one is streamed out in fragments of up to this many bytes
    /// each, so the connection buffer never has to hold an entire
    /// oversize body at once.
    pub max_body_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_head_line: head::DEFAULT_MAX_HEAD_LINE,
            max_header_block: 8 * 1024,
            max_body_size: 4096,
        }
    }
}

/// Whether this parser reads requests or responses.
///
/// A response's body framing depends on the method of the request it
/// answers (a `HEAD` response never has a body regardless of its
/// headers) and HTTP pipelines requests and responses independently, so
/// a client-mode parser needs to be told each method as it's sent, in
/// order, via [`Parser::note_request`].
pub enum Role {
    Server,
    Client { pending_methods: VecDeque<Vec<u8>> },
}

impl Role {
    pub fn client() -> Self {
        Role::Client { pending_methods: VecDeque::new() }
    }
}

enum StoredHead {
    Request(head::RequestHead),
    Response(head::ResponseHead),
}

enum BodyKind {
    /// `total` is the declared `Content-Length`; `delivered` is how many
    /// bytes have already been handed to the acceptor — only nonzero once
    /// a body has needed more than one streamed fragment.
    Sized { total: u64, delivered: u64 },
    Chunked(ChunkedParser),
    /// An "upgrade-only" body: no `Content-Length`, not chunked, but
    /// `Upgrade`/`Connection: Upgrade` present. Bytes are forwarded to
    /// the acceptor as they arrive but the parser never leaves `Body` —
    /// see `DESIGN.md` for why: the handshake response's own protocol
    /// takes over the connection one layer above this crate.
    Upgrade,
}

enum State {
    Head,
    Headers {
        stored: StoredHead,
        head_end: usize,
        parser: HeaderBlockParser,
        headers: Vec<HeaderEntry>,
    },
    Body(BodyKind),
}

/// Callbacks the parser drives as messages arrive.
///
/// Unlike `rotor-http`'s `Server`/`Client` traits, this is a single small
/// interface covering both roles — the distinction is made by
/// [`Parser::role`], not by the trait the acceptor implements.
pub trait Acceptor {
    /// The head and headers of a message are fully available. `container`
    /// is only valid for the duration of this call; don't retain slices
    /// resolved from it.
    fn on_head(&mut self, message: &Message, container: &[u8]);
    /// A chunk of body payload. May be called zero or more times between
    /// `on_head` and `on_message_end`; a message with no body never gets
    /// one of these at all. `tail` is how many more body bytes are
    /// still outstanding after this chunk: always `0` for a chunked
    /// body or a sized body that fit under `Limits::max_body_size`, and
    /// strictly decreasing to `0` on the final fragment of a streamed
    /// oversize sized body.
    fn on_body_chunk(&mut self, data: &[u8], tail: u64);
    /// The message (head, body, and any chunked trailer) is complete.
    fn on_message_end(&mut self);
    /// A non-fatal, per-message error (currently only [`ChunkError`]).
    fn on_error(&mut self, error: ChunkError);
}

/// A chain of acceptors, each claiming messages it recognizes via
/// [`ChainableAcceptor::can_accept`].
///
/// The chain is searched once, when a head arrives, and whichever
/// acceptor claims it receives every subsequent callback for that
/// message.
pub trait ChainableAcceptor: Acceptor {
    fn can_accept(&self, message: &Message, container: &[u8]) -> bool;
}

#[derive(Default)]
pub struct AcceptorChain {
    acceptors: Vec<Box<dyn ChainableAcceptor>>,
    active: Option<usize>,
}

impl AcceptorChain {
    pub fn new() -> Self {
        AcceptorChain { acceptors: Vec::new(), active: None }
    }

    /// Acceptors are searched in the order they were added; the first
    /// one whose `can_accept` returns `true` wins.
    pub fn add(&mut self, acceptor: Box<dyn ChainableAcceptor>) {
        self.acceptors.push(acceptor);
    }

    pub fn len(&self) -> usize {
        self.acceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acceptors.is_empty()
    }
}

impl Acceptor for AcceptorChain {
    fn on_head(&mut self, message: &Message, container: &[u8]) {
        self.active = self
            .acceptors
            .iter()
            .position(|a| a.can_accept(message, container));
        if let Some(i) = self.active {
            self.acceptors[i].on_head(message, container);
        }
    }

    fn on_body_chunk(&mut self, data: &[u8], tail: u64) {
        if let Some(i) = self.active {
            self.acceptors[i].on_body_chunk(data, tail);
        }
    }

    fn on_message_end(&mut self) {
        if let Some(i) = self.active.take() {
            self.acceptors[i].on_message_end();
        }
    }

    fn on_error(&mut self, error: ChunkError) {
        if let Some(i) = self.active {
            self.acceptors[i].on_error(error);
        }
    }
}

enum Progress {
    Made,
    NeedMoreData,
}

/// The incremental HTTP/1.1 message parser.
///
/// Generic over the byte container so an embedder can plug in pooled or
/// ring-buffer storage instead of a plain `Vec<u8>`; header storage is
/// always a `Vec<HeaderEntry>` since headers are per-message and don't
/// benefit from the same pooling concerns as the connection-spanning
/// byte buffer.
pub struct Parser<B: ByteContainer = Vec<u8>> {
    bytes: B,
    limits: Limits,
    role: Role,
    state: State,
    /// Bytes reserved by [`Parser::create_buf`] but not yet committed by
    /// a matching [`Parser::trim_buf`].
    reserved: usize,
}

impl<B: ByteContainer + Default> Parser<B> {
    pub fn new(role: Role) -> Self {
        Parser {
            bytes: B::default(),
            limits: Limits::default(),
            role,
            state: State::Head,
            reserved: 0,
        }
    }

    pub fn with_limits(role: Role, limits: Limits) -> Self {
        Parser { bytes: B::default(), limits, role, state: State::Head, reserved: 0 }
    }
}

impl<B: ByteContainer> Parser<B> {
    /// Records that a request with the given method was just sent on
    /// this connection. Only meaningful (and only necessary) for
    /// [`Role::Client`] parsers; a `HEAD` response has no body no matter
    /// what its headers claim, and this is the only way the parser can
    /// know a response answers a `HEAD`.
    pub fn note_request(&mut self, method: &[u8]) {
        if let Role::Client { pending_methods } = &mut self.role {
            pending_methods.push_back(method.to_vec());
        }
    }

    /// How many bytes are currently buffered awaiting a complete head,
    /// header block, or body chunk.
    pub fn buffered_len(&self) -> usize {
        self.bytes.len()
    }

    /// Appends `data` and runs the state machine as far forward as it
    /// will go, calling back into `acceptor` for every head, body chunk,
    /// and message completion this unlocks.
    pub fn feed<A: Acceptor>(&mut self, data: &[u8], acceptor: &mut A) -> Result<(), ParseError> {
        self.bytes.extend(data);
        self.run(acceptor)
    }

    /// Reserves `n` zero-filled bytes at the tail of the internal buffer
    /// and returns a mutable slice over them, so a caller reading off a
    /// transport (a socket `read()`) can read directly into the parser's
    /// own buffer instead of through an intermediate scratch buffer and a
    /// copy via [`Parser::feed`] — the zero-copy ingress path.
    ///
    /// Must be followed by exactly one [`Parser::trim_buf`] call before
    /// any other mutating call (`feed`, another `create_buf`, `eof`) —
    /// the reservation is not itself visible to the state machine until
    /// trimmed down to the bytes actually read.
    pub fn create_buf(&mut self, n: usize) -> &mut [u8] {
        self.reserved = n;
        self.bytes.reserve_tail(n)
    }

    /// Commits `actual_len` of the region reserved by the last
    /// [`Parser::create_buf`] call (discarding the unused remainder) and
    /// drives the state machine forward over the committed bytes.
    ///
    /// Fails with [`ParseError::InvalidTrim`] if `actual_len` is larger
    /// than what was reserved.
    pub fn trim_buf<A: Acceptor>(&mut self, actual_len: usize, acceptor: &mut A) -> Result<(), ParseError> {
        if actual_len > self.reserved {
            return Err(ParseError::InvalidTrim);
        }
        let unused = self.reserved - actual_len;
        self.bytes.truncate_tail(unused);
        self.reserved = 0;
        self.run(acceptor)
    }

    fn run<A: Acceptor>(&mut self, acceptor: &mut A) -> Result<(), ParseError> {
        loop {
            match self.advance(acceptor)? {
                Progress::Made => continue,
                Progress::NeedMoreData => return Ok(()),
            }
        }
    }

    fn advance<A: Acceptor>(&mut self, acceptor: &mut A) -> Result<Progress, ParseError> {
        match &mut self.state {
            State::Head => self.advance_head(),
            State::Headers { .. } => self.advance_headers(acceptor),
            State::Body(_) => self.advance_body(acceptor),
        }
    }

    fn advance_head(&mut self) -> Result<Progress, ParseError> {
        let data = self.bytes.as_bytes();
        let line_end = match find_crlf(data) {
            Some(p) => p,
            None => {
                if data.len() > self.limits.max_head_line {
                    warn!("head line exceeded {} bytes with no CRLF", self.limits.max_head_line);
                    return Err(ParseError::HeadTooLarge);
                }
                return Ok(Progress::NeedMoreData);
            }
        };
        if line_end > self.limits.max_head_line {
            warn!("head line of {} bytes exceeds limit of {}", line_end, self.limits.max_head_line);
            return Err(ParseError::HeadTooLarge);
        }
        let stored = match head::classify(0, &data[..line_end])? {
            HeadLine::Request { method, target, version } => {
                trace!("parsed request line");
                StoredHead::Request(head::RequestHead::new(method, target, version))
            }
            HeadLine::Response { version, code, reason } => {
                trace!("parsed status line");
                StoredHead::Response(head::ResponseHead::new(version, code, reason))
            }
        };
        self.state = State::Headers {
            stored,
            head_end: line_end + 2,
            parser: HeaderBlockParser::new(),
            headers: Vec::new(),
        };
        Ok(Progress::Made)
    }

    fn advance_headers<A: Acceptor>(&mut self, acceptor: &mut A) -> Result<Progress, ParseError> {
        let head_end = match &self.state {
            State::Headers { head_end, .. } => *head_end,
            _ => unreachable!(),
        };
        let step = {
            let data = self.bytes.as_bytes();
            let State::Headers { parser, headers, .. } = &mut self.state else {
                unreachable!()
            };
            parser.parse(&data[head_end..], head_end, headers)
        };
        let headers_end = match step {
            HeaderStep::Wait => {
                if self.bytes.len().saturating_sub(head_end) > self.limits.max_header_block {
                    return Err(ParseError::HeadTooLarge);
                }
                return Ok(Progress::NeedMoreData);
            }
            HeaderStep::Finish { consumed } => head_end + consumed,
        };

        let (stored, headers) = match std::mem::replace(&mut self.state, State::Head) {
            State::Headers { stored, headers, .. } => (stored, headers),
            _ => unreachable!(),
        };

        let data = self.bytes.as_bytes();
        let view = HeaderView::new(&headers, data);
        let framing = match (&stored, &mut self.role) {
            (StoredHead::Request(_), _) => message::request_body_framing(&view),
            (StoredHead::Response(resp), Role::Client { pending_methods }) => {
                let method = pending_methods.pop_front();
                let code = resp.code_num(data).unwrap_or(0);
                message::response_body_framing(method.as_deref(), code, &view)
            }
            (StoredHead::Response(resp), Role::Server) => {
                // A server-mode parser seeing a status line is a misuse
                // of the API; fall back to treating it like a client
                // response with no known request rather than panicking.
                let code = resp.code_num(data).unwrap_or(0);
                message::response_body_framing(None, code, &view)
            }
        };

        let message = match stored {
            StoredHead::Request(h) => Message::Request(h, headers),
            StoredHead::Response(h) => Message::Response(h, headers),
        };
        debug!("head complete, body framing: {:?}", framing);
        acceptor.on_head(&message, data);

        self.bytes.trim_front(headers_end);

        match framing {
            BodyFraming::None => {
                acceptor.on_message_end();
                self.state = State::Head;
            }
            BodyFraming::Sized(total) => {
                self.state = State::Body(BodyKind::Sized { total, delivered: 0 });
            }
            BodyFraming::Chunked => {
                self.state = State::Body(BodyKind::Chunked(ChunkedParser::new()));
            }
            BodyFraming::Upgrade => {
                self.state = State::Body(BodyKind::Upgrade);
            }
        }
        Ok(Progress::Made)
    }

    fn advance_body<A: Acceptor>(&mut self, acceptor: &mut A) -> Result<Progress, ParseError> {
        match &mut self.state {
            State::Body(BodyKind::Sized { total, delivered }) => {
                let avail = self.bytes.len() as u64;
                let need = total.saturating_sub(*delivered);
                if need == 0 {
                    acceptor.on_message_end();
                    self.state = State::Head;
                    return Ok(Progress::Made);
                }
                if need <= avail {
                    // The whole rest of the body is already buffered:
                    // one final chunk, tail=0, message complete.
                    let take = need as usize;
                    acceptor.on_body_chunk(&self.bytes.as_bytes()[..take], 0);
                    self.bytes.trim_front(take);
                    acceptor.on_message_end();
                    self.state = State::Head;
                    Ok(Progress::Made)
                } else if avail > 0 && avail >= self.limits.max_body_size as u64 {
                    // More bytes are still coming, but we've buffered at
                    // least a full `max_body_size` fragment's worth:
                    // stream it out rather than let the body grow
                    // unbounded in the container.
                    let take = avail as usize;
                    let tail = need - avail;
                    acceptor.on_body_chunk(&self.bytes.as_bytes()[..take], tail);
                    self.bytes.trim_front(take);
                    *delivered += avail;
                    Ok(Progress::Made)
                } else {
                    Ok(Progress::NeedMoreData)
                }
            }
            State::Body(BodyKind::Chunked(chunked)) => {
                let data = self.bytes.as_bytes();
                let (consumed, step) = chunked.advance(data);
                match step {
                    ChunkStep::Wait => {
                        if consumed > 0 {
                            self.bytes.trim_front(consumed);
                            Ok(Progress::Made)
                        } else {
                            Ok(Progress::NeedMoreData)
                        }
                    }
                    ChunkStep::Body { len } => {
                        acceptor.on_body_chunk(&data[consumed..consumed + len as usize], 0);
                        self.bytes.trim_front(consumed + len as usize);
                        Ok(Progress::Made)
                    }
                    ChunkStep::Finish { consumed } => {
                        self.bytes.trim_front(consumed);
                        acceptor.on_message_end();
                        self.state = State::Head;
                        Ok(Progress::Made)
                    }
                    ChunkStep::Error(e) => {
                        // A broken chunk framing is surfaced via
                        // `on_error` but is not fatal to the connection —
                        // the parser drops back to `Head` so a pipelined
                        // message after the broken one can still recover.
                        warn!("chunked body framing broke: {}", e);
                        self.bytes.trim_front(consumed);
                        acceptor.on_error(e);
                        self.state = State::Head;
                        Ok(Progress::Made)
                    }
                }
            }
            State::Body(BodyKind::Upgrade) => {
                // No length to count down to and no terminator to wait
                // for: everything buffered so far is forwarded as it
                // arrives, and the state never advances past `Body` —
                // the connection now belongs to whatever protocol the
                // upgrade negotiated.
                if self.bytes.is_empty() {
                    Ok(Progress::NeedMoreData)
                } else {
                    let data = self.bytes.as_bytes();
                    acceptor.on_body_chunk(data, 0);
                    let len = data.len();
                    self.bytes.trim_front(len);
                    Ok(Progress::NeedMoreData)
                }
            }
            _ => unreachable!(),
        }
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}
