//! Fluent builder for outgoing request and status lines, headers, and
//! body framing.
//!
//! Walks a head → headers → body progression, writing straight into the
//! connection's output buffer rather than building a `String` first:
//! every call appends directly to an internal `Vec<u8>`, and ordering or
//! duplicate-framing mistakes become [`GenError`] variants rather than
//! panics.

use std::fmt::Write as _;

use crate::error::{GenError, ParseError};
use crate::uri;

/// Methods recognized for an outgoing request line.
const METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "TRACE", "PATCH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    /// No `Content-Length` or `Transfer-Encoding` committed yet.
    Undecided,
    Sized,
    Chunked,
}

/// Mirrors `rotor-http`'s response-side `Body` classification
/// (`Normal`/`Ignored`/`Denied`): some status codes never carry a body no
/// matter what the caller asks for, and one (`304`) is allowed to declare
/// framing headers but must not actually carry body bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyPolicy {
    Normal,
    /// `304 Not Modified`: framing headers may still be declared (to
    /// describe the representation that would have been sent), but
    /// `body`/`reserve_body` writes are silently dropped.
    Ignored,
    /// `101 Switching Protocols`, `204 No Content`: no body, framed or
    /// not, is permitted at all.
    Denied,
}

fn body_policy_for(code: i64) -> BodyPolicy {
    match code {
        101 | 204 => BodyPolicy::Denied,
        304 => BodyPolicy::Ignored,
        _ => BodyPolicy::Normal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Headers,
    /// Writing a fixed-size body; `remaining` counts down as bytes are
    /// appended via [`Generator::body`], so a caller can't write past
    /// the length it declared.
    Body { remaining: u64 },
    ChunkedBody,
    Done,
}

/// Which kind of start line this generator is building, and therefore
/// which of [`Generator::method`]/[`Generator::uri`] vs.
/// [`Generator::response`] are still valid to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// No start line written yet (built via [`Generator::new`]).
    Unstarted,
    Request,
    Response,
}

/// Builds one HTTP/1.1 message (request or response) into an internal
/// buffer, enforcing the head → headers → body ordering and rejecting
/// the header combinations that would produce ambiguous framing.
pub struct Generator {
    method: String,
    buf: Vec<u8>,
    /// How many bytes at the front of `buf` belong to the start line
    /// (and, for a request built through [`Generator::uri`], the `Host`
    /// header written alongside it) — what a later call to `uri` needs
    /// to discard and rewrite without touching headers already
    /// appended after it.
    start_line_len: usize,
    kind: Kind,
    state: State,
    body_mode: BodyMode,
    /// The length passed to [`Generator::add_length`], held until
    /// [`Generator::done_headers`] moves it into `State::Body`.
    pending_length: Option<u64>,
    /// Set from the status code by [`Generator::response`]; stays
    /// `Normal` for a request, which has no such restrictions.
    body_policy: BodyPolicy,
    /// The status code passed to [`Generator::response`], kept around
    /// only to report in [`GenError::BodyDenied`]; `0` for a request.
    status_code: i64,
}

impl Generator {
    /// An empty builder with no start line yet: `method` defaults to
    /// `GET` until [`Generator::method`] or [`Generator::uri`] (which
    /// also commits the request line) is called.
    pub fn new() -> Self {
        Generator {
            method: "GET".to_string(),
            buf: Vec::new(),
            start_line_len: 0,
            kind: Kind::Unstarted,
            state: State::Headers,
            body_mode: BodyMode::Undecided,
            pending_length: None,
            body_policy: BodyPolicy::Normal,
            status_code: 0,
        }
    }

    /// Sets the request verb. Only valid before a start line has been
    /// committed by [`Generator::request`]/[`Generator::uri`]/
    /// [`Generator::response`].
    pub fn method(&mut self, m: &str) -> Result<&mut Self, GenError> {
        if self.kind != Kind::Unstarted {
            return Err(GenError::OutOfOrder);
        }
        let canonical = METHODS
            .iter()
            .find(|cand| cand.eq_ignore_ascii_case(m))
            .ok_or_else(|| GenError::InvalidMethod(m.to_string()))?;
        self.method = canonical.to_string();
        Ok(self)
    }

    /// Starts a request line: `METHOD target HTTP/1.1\r\n`, writing
    /// `target` verbatim rather than parsing it as a URI. Use
    /// [`Generator::uri`] instead when `target` should be parsed and a
    /// `Host` header derived from its authority.
    pub fn request(method: &str, target: &str) -> Self {
        let mut buf = Vec::with_capacity(method.len() + target.len() + 16);
        buf.extend_from_slice(method.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(target.as_bytes());
        buf.extend_from_slice(b" HTTP/1.1\r\n");
        let start_line_len = buf.len();
        Generator {
            method: method.to_string(),
            buf,
            start_line_len,
            kind: Kind::Request,
            state: State::Headers,
            body_mode: BodyMode::Undecided,
            pending_length: None,
            body_policy: BodyPolicy::Normal,
            status_code: 0,
        }
    }

    /// Parses `target` (absolute or origin-form) and (re)writes
    /// the request line as `METHOD (path[?query]) HTTP/1.1\r\n`,
    /// followed by a `Host: <host>` header when `target` carries an
    /// authority. Discards whatever start line a previous call to
    /// [`Generator::request`]/[`Generator::uri`] wrote; headers already
    /// appended via [`Generator::header`] are untouched.
    pub fn uri(&mut self, target: &str) -> Result<&mut Self, GenError> {
        if self.kind == Kind::Response {
            return Err(GenError::OutOfOrder);
        }
        self.expect_headers()?;
        let bytes = target.as_bytes();
        let parts = uri::parse(bytes).map_err(|e| match e {
            ParseError::UriParse(reason) => GenError::InvalidUri(reason),
            _ => GenError::InvalidUri("malformed URI"),
        })?;
        let mut line = Vec::with_capacity(self.method.len() + bytes.len() + 32);
        line.extend_from_slice(self.method.as_bytes());
        line.push(b' ');
        line.extend_from_slice(parts.path(bytes));
        if let Some(query) = parts.query(bytes) {
            line.push(b'?');
            line.extend_from_slice(query);
        }
        line.extend_from_slice(b" HTTP/1.1\r\n");
        if let Some(host) = parts.host(bytes) {
            line.extend_from_slice(b"Host: ");
            line.extend_from_slice(host);
            if let Some(port) = parts.port(bytes) {
                line.push(b':');
                line.extend_from_slice(port);
            }
            line.extend_from_slice(b"\r\n");
        }
        self.buf.splice(0..self.start_line_len, line.iter().copied());
        self.start_line_len = line.len();
        self.kind = Kind::Request;
        Ok(self)
    }

    /// Starts a status line: `HTTP/1.1 code reason\r\n`.
    pub fn response(code: i64, reason: &str) -> Result<Self, GenError> {
        if !(100..=999).contains(&code) {
            return Err(GenError::InvalidStatusCode(code));
        }
        let mut buf = Vec::with_capacity(reason.len() + 24);
        buf.extend_from_slice(b"HTTP/1.1 ");
        let _ = write!(buf_as_string(&mut buf), "{}", code);
        buf.push(b' ');
        buf.extend_from_slice(reason.as_bytes());
        buf.extend_from_slice(b"\r\n");
        let start_line_len = buf.len();
        Ok(Generator {
            method: String::new(),
            buf,
            start_line_len,
            kind: Kind::Response,
            state: State::Headers,
            body_mode: BodyMode::Undecided,
            pending_length: None,
            body_policy: body_policy_for(code),
            status_code: code,
        })
    }

    /// Appends an arbitrary header line. `Content-Length` and
    /// `Transfer-Encoding` must go through [`Generator::add_length`] and
    /// [`Generator::make_chunked`] instead, so the generator always
    /// knows which framing mode is in effect.
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self, GenError> {
        self.expect_headers()?;
        if name.eq_ignore_ascii_case("Content-Length") || name.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err(GenError::BodyLengthHeader);
        }
        self.write_header(name, value);
        Ok(self)
    }

    /// Declares a fixed-length body via `Content-Length`.
    pub fn add_length(&mut self, length: u64) -> Result<&mut Self, GenError> {
        self.expect_headers()?;
        if self.body_policy == BodyPolicy::Denied {
            return Err(GenError::BodyDenied(self.status_code()));
        }
        match self.body_mode {
            BodyMode::Undecided => {}
            BodyMode::Sized => return Err(GenError::DuplicateContentLength),
            BodyMode::Chunked => return Err(GenError::ContentLengthAfterChunked),
        }
        self.write_header("Content-Length", &length.to_string());
        self.body_mode = BodyMode::Sized;
        self.pending_length = Some(length);
        Ok(self)
    }

    /// Declares `Transfer-Encoding: chunked`.
    pub fn make_chunked(&mut self) -> Result<&mut Self, GenError> {
        self.expect_headers()?;
        if self.body_policy == BodyPolicy::Denied {
            return Err(GenError::BodyDenied(self.status_code()));
        }
        match self.body_mode {
            BodyMode::Undecided => {}
            BodyMode::Chunked => return Err(GenError::DuplicateTransferEncoding),
            BodyMode::Sized => return Err(GenError::ChunkedAfterContentLength),
        }
        self.write_header("Transfer-Encoding", "chunked");
        self.body_mode = BodyMode::Chunked;
        Ok(self)
    }

    /// Ends the header block (`\r\n`) and moves to body-writing state.
    /// A message with neither `add_length` nor `make_chunked` called is
    /// left with an implicit zero-length body, matching `Content-Length:
    /// 0` semantics without writing the header out.
    pub fn done_headers(&mut self) -> Result<&mut Self, GenError> {
        self.expect_headers()?;
        self.buf.extend_from_slice(b"\r\n");
        self.state = match self.body_mode {
            BodyMode::Chunked => State::ChunkedBody,
            BodyMode::Sized => State::Body { remaining: self.pending_length.unwrap_or(0) },
            BodyMode::Undecided => State::Body { remaining: 0 },
        };
        Ok(self)
    }

    /// Appends body bytes. Under `Content-Length` framing this fails if
    /// `data` would overrun the declared length; under chunked framing
    /// each call becomes its own chunk.
    pub fn body(&mut self, data: &[u8]) -> Result<&mut Self, GenError> {
        if self.body_policy == BodyPolicy::Denied {
            return Err(GenError::BodyDenied(self.status_code()));
        }
        let ignored = self.body_policy == BodyPolicy::Ignored;
        match &mut self.state {
            State::Body { remaining } => {
                if data.len() as u64 > *remaining {
                    return Err(GenError::BodyOverrun);
                }
                *remaining -= data.len() as u64;
                if !ignored {
                    self.buf.extend_from_slice(data);
                }
                Ok(self)
            }
            State::ChunkedBody => {
                if !ignored {
                    let _ = write!(buf_as_string(&mut self.buf), "{:x}", data.len());
                    self.buf.extend_from_slice(b"\r\n");
                    self.buf.extend_from_slice(data);
                    self.buf.extend_from_slice(b"\r\n");
                }
                Ok(self)
            }
            State::Headers => Err(GenError::OutOfOrder),
            State::Done => Err(GenError::OutOfOrder),
        }
    }

    /// Writes the framing bytes for a body of `size` bytes and returns a
    /// mutable slice the caller can fill in afterward — the zero-copy
    /// egress path symmetrical to [`crate::parser::Parser::create_buf`]:
    /// a caller that already has the body bytes sitting elsewhere (e.g.
    /// a buffer pool, a file read) can write straight into the
    /// generator's own output buffer instead of handing a second copy to
    /// [`Generator::body`].
    ///
    /// Under `Content-Length` framing this reserves `size` zero-filled
    /// bytes directly; under chunked framing it writes the chunk-size
    /// line and trailing CRLF around the reserved region, exactly as
    /// `body(data)` would for a chunk of that length.
    ///
    /// Rejected outright (rather than silently discarding the written
    /// bytes afterward) for a response whose [`BodyPolicy`] denies or
    /// ignores a body — unlike [`Generator::body`], the caller here
    /// writes straight into the live output buffer, so there's no point
    /// after the fact to drop the write from.
    pub fn reserve_body(&mut self, size: usize) -> Result<&mut [u8], GenError> {
        if self.body_policy != BodyPolicy::Normal {
            return Err(GenError::BodyDenied(self.status_code()));
        }
        match &mut self.state {
            State::Body { remaining } => {
                if size as u64 > *remaining {
                    return Err(GenError::BodyOverrun);
                }
                *remaining -= size as u64;
                let start = self.buf.len();
                self.buf.resize(start + size, 0);
                Ok(&mut self.buf[start..])
            }
            State::ChunkedBody => {
                let _ = write!(buf_as_string(&mut self.buf), "{:x}", size);
                self.buf.extend_from_slice(b"\r\n");
                let start = self.buf.len();
                self.buf.resize(start + size, 0);
                self.buf.extend_from_slice(b"\r\n");
                Ok(&mut self.buf[start..start + size])
            }
            State::Headers => Err(GenError::OutOfOrder),
            State::Done => Err(GenError::OutOfOrder),
        }
    }

    /// Closes out the message: pads the remainder of a `Content-Length`
    /// body with nothing (it must already be fully written) or emits the
    /// terminating `0\r\n\r\n` chunk for a chunked body.
    pub fn finish(&mut self) -> &[u8] {
        match self.state {
            State::ChunkedBody => self.buf.extend_from_slice(b"0\r\n\r\n"),
            _ => {}
        }
        self.state = State::Done;
        &self.buf
    }

    /// The bytes written so far, regardless of state. Useful for writing
    /// headers out to a transport incrementally rather than waiting for
    /// [`Generator::finish`].
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_header(&mut self, name: &str, value: &str) {
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(b": ");
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }

    fn expect_headers(&self) -> Result<(), GenError> {
        match self.state {
            State::Headers => Ok(()),
            _ => Err(GenError::OutOfOrder),
        }
    }

    fn status_code(&self) -> i64 {
        self.status_code
    }
}

/// Adapts a `Vec<u8>` to `std::fmt::Write` for formatting integers
/// straight into the output buffer without an intermediate `String`.
fn buf_as_string(buf: &mut Vec<u8>) -> VecWriter<'_> {
    VecWriter(buf)
}

struct VecWriter<'a>(&'a mut Vec<u8>);

impl std::fmt::Write for VecWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_request() {
        let mut gen = Generator::request("GET", "/");
        gen.header("Host", "example.com").unwrap();
        gen.done_headers().unwrap();
        let out = gen.finish();
        assert_eq!(out, b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");
    }

    #[test]
    fn sized_response_body() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.add_length(5).unwrap();
        gen.done_headers().unwrap();
        gen.body(b"hello").unwrap();
        let out = gen.finish();
        assert_eq!(out, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    }

    #[test]
    fn chunked_response_body() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.make_chunked().unwrap();
        gen.done_headers().unwrap();
        gen.body(b"Wiki").unwrap();
        gen.body(b"pedia").unwrap();
        let out = gen.finish();
        assert_eq!(
            out,
            &b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n"[..]
        );
    }

    #[test]
    fn no_body_defaults_to_zero_length() {
        let mut gen = Generator::response(204, "No Content").unwrap();
        gen.done_headers().unwrap();
        let out = gen.finish();
        assert_eq!(out, b"HTTP/1.1 204 No Content\r\n\r\n");
    }

    #[test]
    fn no_content_204_denies_a_body() {
        let mut gen = Generator::response(204, "No Content").unwrap();
        assert!(matches!(gen.add_length(5), Err(GenError::BodyDenied(204))));
        assert!(matches!(gen.make_chunked(), Err(GenError::BodyDenied(204))));
        assert!(matches!(gen.body(b"hello"), Err(GenError::BodyDenied(204))));
    }

    #[test]
    fn switching_protocols_101_denies_a_body() {
        let mut gen = Generator::response(101, "Switching Protocols").unwrap();
        assert!(matches!(gen.add_length(5), Err(GenError::BodyDenied(101))));
    }

    #[test]
    fn not_modified_304_allows_content_length_but_ignores_body_bytes() {
        let mut gen = Generator::response(304, "Not Modified").unwrap();
        gen.add_length(5).unwrap();
        gen.done_headers().unwrap();
        gen.body(b"hello").unwrap();
        let out = gen.finish();
        assert_eq!(out, b"HTTP/1.1 304 Not Modified\r\nContent-Length: 5\r\n\r\n");
    }

    #[test]
    fn not_modified_304_rejects_reserve_body() {
        let mut gen = Generator::response(304, "Not Modified").unwrap();
        gen.add_length(5).unwrap();
        gen.done_headers().unwrap();
        assert!(matches!(gen.reserve_body(5), Err(GenError::BodyDenied(304))));
    }

    #[test]
    fn rejects_invalid_status_code() {
        assert!(Generator::response(42, "Nope").is_err());
        assert!(Generator::response(1000, "Nope").is_err());
    }

    #[test]
    fn rejects_content_length_header_set_directly() {
        let mut gen = Generator::request("GET", "/");
        assert!(gen.header("Content-Length", "5").is_err());
    }

    #[test]
    fn rejects_duplicate_length_declaration() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.add_length(5).unwrap();
        assert!(matches!(gen.add_length(10), Err(GenError::DuplicateContentLength)));
    }

    #[test]
    fn rejects_chunked_after_content_length() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.add_length(5).unwrap();
        assert!(matches!(gen.make_chunked(), Err(GenError::ChunkedAfterContentLength)));
    }

    #[test]
    fn rejects_body_overrunning_content_length() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.add_length(2).unwrap();
        gen.done_headers().unwrap();
        assert!(gen.body(b"too long").is_err());
    }

    #[test]
    fn reserve_body_writes_sized_framing_then_lets_caller_fill_it_in() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.add_length(5).unwrap();
        gen.done_headers().unwrap();
        {
            let spare = gen.reserve_body(5).unwrap();
            spare.copy_from_slice(b"hello");
        }
        let out = gen.finish();
        assert_eq!(out, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    }

    #[test]
    fn reserve_body_writes_chunk_framing_around_the_reserved_region() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.make_chunked().unwrap();
        gen.done_headers().unwrap();
        {
            let spare = gen.reserve_body(4).unwrap();
            spare.copy_from_slice(b"Wiki");
        }
        let out = gen.finish();
        assert_eq!(
            out,
            &b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n0\r\n\r\n"[..]
        );
    }

    #[test]
    fn reserve_body_rejects_overrunning_content_length() {
        let mut gen = Generator::response(200, "OK").unwrap();
        gen.add_length(2).unwrap();
        gen.done_headers().unwrap();
        assert!(gen.reserve_body(3).is_err());
    }

    #[test]
    fn uri_derives_target_and_host_header() {
        let mut gen = Generator::new();
        gen.method("post").unwrap();
        gen.uri("http://example.com:8080/a/b?x=1").unwrap();
        gen.done_headers().unwrap();
        let out = gen.finish();
        assert_eq!(
            out,
            &b"POST /a/b?x=1 HTTP/1.1\r\nHost: example.com:8080\r\n\r\n"[..]
        );
    }

    #[test]
    fn uri_without_authority_omits_host_header() {
        let mut gen = Generator::new();
        gen.method("GET").unwrap();
        gen.uri("/search?q=rust").unwrap();
        gen.done_headers().unwrap();
        let out = gen.finish();
        assert_eq!(out, b"GET /search?q=rust HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn uri_called_twice_rewrites_start_line_only() {
        let mut gen = Generator::new();
        gen.method("GET").unwrap();
        gen.uri("http://first.example/one").unwrap();
        gen.header("X-Trace", "abc").unwrap();
        gen.uri("http://second.example/two").unwrap();
        gen.done_headers().unwrap();
        let out = gen.finish();
        assert_eq!(
            out,
            &b"GET /two HTTP/1.1\r\nHost: second.example\r\nX-Trace: abc\r\n\r\n"[..]
        );
    }

    #[test]
    fn method_rejects_unknown_verb() {
        let mut gen = Generator::new();
        assert!(matches!(gen.method("FOO"), Err(GenError::InvalidMethod(_))));
    }

    #[test]
    fn method_after_start_line_committed_is_out_of_order() {
        let mut gen = Generator::request("GET", "/");
        assert!(matches!(gen.method("POST"), Err(GenError::OutOfOrder)));
    }

    #[test]
    fn uri_rejects_malformed_target() {
        let mut gen = Generator::new();
        assert!(matches!(gen.uri("http://"), Err(GenError::InvalidUri(_))));
    }

    #[test]
    fn uri_round_trips_through_parser() {
        use crate::error::ChunkError;
        use crate::message::Message;
        use crate::parser::{Acceptor, Parser, Role};

        #[derive(Default)]
        struct Rec {
            host: Option<String>,
            path: Option<String>,
            query: Option<String>,
        }
        impl Acceptor for Rec {
            fn on_head(&mut self, message: &Message, container: &[u8]) {
                if let Message::Request(head, _) = message {
                    let view = message.headers(container);
                    self.host = view.find(b"Host").map(|v| String::from_utf8_lossy(v).into_owned());
                    if let Ok(parts) = head.uri(container) {
                        let target = head.raw_target(container);
                        self.path = Some(String::from_utf8_lossy(parts.path(target)).into_owned());
                        self.query = parts.query(target).map(|q| String::from_utf8_lossy(q).into_owned());
                    }
                }
            }
            fn on_body_chunk(&mut self, _data: &[u8], _tail: u64) {}
            fn on_message_end(&mut self) {}
            fn on_error(&mut self, _error: ChunkError) {}
        }

        let mut gen = Generator::new();
        gen.method("GET").unwrap();
        gen.uri("http://g.c/p?a=1").unwrap();
        gen.done_headers().unwrap();
        let bytes = gen.finish().to_vec();

        let mut parser: Parser = Parser::new(Role::Server);
        let mut rec = Rec::default();
        parser.feed(&bytes, &mut rec).unwrap();

        assert_eq!(rec.host.as_deref(), Some("g.c"));
        assert_eq!(rec.path.as_deref(), Some("/p"));
        assert_eq!(rec.query.as_deref(), Some("a=1"));
    }
}
