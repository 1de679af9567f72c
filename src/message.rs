//! The message model handed to acceptors, and the body-framing rules
//! that decide how many bytes (if any) follow a head.
//!
//! The same classification that decides what a client should expect back
//! for a given request/response pair applies symmetrically on the
//! request side (a server deciding whether a request has a body), so it
//! lives here once rather than being duplicated per role.

use crate::container::HeaderEntry;
use crate::head::{RequestHead, ResponseHead};
use crate::headers::HeaderView;

/// A fully-classified head: which kind it is, plus the headers that
/// arrived with it.
pub enum Message {
    Request(RequestHead, Vec<HeaderEntry>),
    Response(ResponseHead, Vec<HeaderEntry>),
}

impl Message {
    pub fn headers<'a>(&'a self, container: &'a [u8]) -> HeaderView<'a> {
        match self {
            Message::Request(_, h) => HeaderView::new(h, container),
            Message::Response(_, h) => HeaderView::new(h, container),
        }
    }
}

/// How the body bytes following a head are framed, decided once the
/// full header block is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body follows at all: a `HEAD` response, a `1xx`/`204`/`304`
    /// response, or a request with neither `Content-Length` nor
    /// `Transfer-Encoding: chunked`.
    None,
    /// Exactly `0` bytes follow, as opposed to `None` meaning the
    /// concept of a body doesn't apply. Kept distinct from `None` so a
    /// generator round-trip can tell "no body header at all" apart from
    /// "Content-Length: 0".
    Sized(u64),
    Chunked,
    /// No `Content-Length` and no chunked encoding, but an `Upgrade`
    /// header naming a protocol and a `Connection: Upgrade` token. The
    /// parser forwards bytes as they arrive and never fires
    /// `on_message_end`; see `DESIGN.md` for why.
    Upgrade,
}

/// Classifies the body that follows a request head.
///
/// `Transfer-Encoding: chunked` wins over `Content-Length` if both are
/// somehow present (a smuggling-prone combination some servers reject
/// outright; this engine follows the `chunked`-wins rule and lets the
/// embedder add stricter validation if its deployment requires it).
pub fn request_body_framing(headers: &HeaderView) -> BodyFraming {
    if headers.is_chunked() {
        return BodyFraming::Chunked;
    }
    match headers.content_length() {
        Some(Ok(len)) => return BodyFraming::Sized(len),
        Some(Err(())) => return BodyFraming::None,
        None => {}
    }
    if headers.is_upgrade() && headers.upgrade_protocol().is_some() {
        return BodyFraming::Upgrade;
    }
    BodyFraming::None
}

/// Classifies the body that follows a response head, given the method of
/// the request it answers (`None` if this connection never sent one,
/// e.g. this engine is being used purely as a server-side parser).
///
/// `1xx`, `204`, and responses to a `HEAD` request never carry a body no
/// matter what the headers claim; everything else falls back to sized,
/// chunked, upgrade-only, or no body at all when none of those framing
/// headers are present (this engine has no connection lifecycle to hang
/// an EOF-terminated body on).
pub fn response_body_framing(
    request_method: Option<&[u8]>,
    status_code: u16,
    headers: &HeaderView,
) -> BodyFraming {
    if request_method == Some(b"HEAD") {
        return BodyFraming::None;
    }
    // 101 is a `1xx` informational status, but one that specifically
    // hands the connection to another protocol — check upgrade framing
    // before the blanket "1xx never has a body" rule swallows it.
    if status_code == 101 && headers.is_upgrade() && headers.upgrade_protocol().is_some() {
        return BodyFraming::Upgrade;
    }
    if (100..200).contains(&status_code) || status_code == 204 || status_code == 304 {
        return BodyFraming::None;
    }
    if headers.is_chunked() {
        return BodyFraming::Chunked;
    }
    match headers.content_length() {
        Some(Ok(len)) => return BodyFraming::Sized(len),
        _ => {}
    }
    if headers.is_upgrade() && headers.upgrade_protocol().is_some() {
        return BodyFraming::Upgrade;
    }
    BodyFraming::None
}
