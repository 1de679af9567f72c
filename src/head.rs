//! Request/status line classification.
//!
//! A single pass over the first line of a message that tells a request
//! line (`METHOD target HTTP/x.y`) apart from a status line (`HTTP/x.y
//! code reason`) and slices out the three fields of whichever one it
//! found. Anything that isn't cleanly one or the other collapses to a
//! single [`ParseError::BadHead`] since upgrade negotiation happens one
//! layer up, in the acceptor.

use std::cell::OnceCell;

use crate::error::ParseError;
use crate::uri::{self, UriParts};
use crate::view::View;

/// Room for a long method/target plus a little slack for the version
/// token and whitespace. Requests with a head line longer than this are
/// rejected rather than letting a client force unbounded buffering
/// before any headers are even seen.
pub const DEFAULT_MAX_HEAD_LINE: usize = 256 + 9 + 9;

/// The three fields of a parsed first line, as `View`s into the
/// connection's byte container.
#[derive(Debug, Clone, Copy)]
pub enum HeadLine {
    Request {
        method: View,
        target: View,
        version: View,
    },
    Response {
        version: View,
        code: View,
        reason: View,
    },
}

/// Splits `line` (the bytes of the first line, without its trailing
/// CRLF) into method/target/version or version/code/reason views,
/// deciding which based on whether the first token is `HTTP/`.
pub fn classify(base_offset: usize, line: &[u8]) -> Result<HeadLine, ParseError> {
    if line.starts_with(b"HTTP/") {
        parse_status_line(base_offset, line)
    } else {
        parse_request_line(base_offset, line)
    }
}

fn parse_request_line(base_offset: usize, line: &[u8]) -> Result<HeadLine, ParseError> {
    let sp1 = find(line, b' ', 0).ok_or(ParseError::BadHead)?;
    let sp2 = find(line, b' ', sp1 + 1).ok_or(ParseError::BadHead)?;
    if sp1 == 0 || sp2 == sp1 + 1 || sp2 + 1 >= line.len() {
        return Err(ParseError::BadHead);
    }
    let version = &line[sp2 + 1..];
    if !is_request_version(version) {
        return Err(ParseError::BadHead);
    }
    Ok(HeadLine::Request {
        method: View::new(base_offset, sp1),
        target: View::new(base_offset + sp1 + 1, sp2 - sp1 - 1),
        version: View::new(base_offset + sp2 + 1, line.len() - sp2 - 1),
    })
}

fn parse_status_line(base_offset: usize, line: &[u8]) -> Result<HeadLine, ParseError> {
    let sp1 = find(line, b' ', 0).ok_or(ParseError::BadHead)?;
    if !is_response_version(&line[..sp1]) {
        return Err(ParseError::BadHead);
    }
    let sp2 = find(line, b' ', sp1 + 1).unwrap_or(line.len());
    let code = &line[sp1 + 1..sp2];
    if code.len() != 3 || !code.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::BadHead);
    }
    let reason_start = (sp2 + 1).min(line.len());
    Ok(HeadLine::Response {
        version: View::new(base_offset, sp1),
        code: View::new(base_offset + sp1 + 1, sp2 - sp1 - 1),
        reason: View::new(base_offset + reason_start, line.len() - reason_start),
    })
}

/// A request line's version token: any `HTTP/1.x`, minor version
/// unchecked beyond a single digit.
fn is_request_version(v: &[u8]) -> bool {
    v.len() == 8 && v.starts_with(b"HTTP/1.") && v[7].is_ascii_digit()
}

/// A status line's version token: only the exact `HTTP/1.1`, since this
/// engine never generates or expects to receive an `HTTP/1.0` response.
fn is_response_version(v: &[u8]) -> bool {
    v == b"HTTP/1.1"
}

fn find(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    haystack[from..].iter().position(|&b| b == needle).map(|p| p + from)
}

/// A request head: method, still-raw request target, and HTTP version,
/// plus whatever header block the caller attaches.
///
/// The request target is parsed into [`UriParts`] lazily, the first time
/// [`RequestHead::uri`] is called, since most handlers never need
/// anything beyond [`RequestHead::raw_target`].
pub struct RequestHead {
    pub method: View,
    pub target: View,
    pub version: View,
    uri: OnceCell<Result<UriParts, ParseError>>,
}

impl RequestHead {
    pub fn new(method: View, target: View, version: View) -> Self {
        RequestHead {
            method,
            target,
            version,
            uri: OnceCell::new(),
        }
    }

    pub fn method<'a>(&self, container: &'a [u8]) -> &'a [u8] {
        self.method.resolve(container)
    }

    pub fn raw_target<'a>(&self, container: &'a [u8]) -> &'a [u8] {
        self.target.resolve(container)
    }

    pub fn version<'a>(&self, container: &'a [u8]) -> &'a [u8] {
        self.version.resolve(container)
    }

    /// Parses (and caches) the request target. The same `container` must
    /// be passed on every call; passing a different one after the
    /// container has been trimmed produces nonsense, not a panic, since
    /// `UriParts` stores plain byte ranges rather than a `View`.
    pub fn uri<'a>(&self, container: &'a [u8]) -> Result<&UriParts, &ParseError> {
        self.uri
            .get_or_init(|| uri::parse(self.raw_target(container)))
            .as_ref()
    }
}

/// A status head: HTTP version, status code, and reason phrase.
#[derive(Debug, Clone, Copy)]
pub struct ResponseHead {
    pub version: View,
    pub code: View,
    pub reason: View,
}

impl ResponseHead {
    pub fn new(version: View, code: View, reason: View) -> Self {
        ResponseHead { version, code, reason }
    }

    pub fn version<'a>(&self, container: &'a [u8]) -> &'a [u8] {
        self.version.resolve(container)
    }

    pub fn reason<'a>(&self, container: &'a [u8]) -> &'a [u8] {
        self.reason.resolve(container)
    }

    /// The numeric status code, or `None` if it somehow isn't
    /// three ASCII digits (can't happen via [`classify`], but callers may
    /// construct a `ResponseHead` by hand in tests).
    pub fn code_num(&self, container: &[u8]) -> Option<u16> {
        std::str::from_utf8(self.code.resolve(container))
            .ok()
            .and_then(|s| s.parse().ok())
    }
}
