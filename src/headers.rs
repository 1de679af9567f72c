//! The header block parser and the parsed header collection it produces.
//!
//! A small state machine over `name: value\r\n` lines that stops the
//! moment it sees the blank line terminating the block, folding multiple
//! calls across a `feed`/`feed`/`feed` boundary the same way the rest of
//! the engine does. Lookups against the parsed collection are
//! byte-exact on the raw header name view rather than case-insensitive;
//! see `DESIGN.md` for why.

use crate::container::{HeaderContainer, HeaderEntry};
use crate::view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the first byte of a new line: either the start of a
    /// header name, or the `\r` of the block-terminating blank line.
    LineStart,
    /// Scanning for the `:` that ends the header name.
    Name,
    /// Skipping optional whitespace between `:` and the value.
    Space,
    /// Scanning for the `\r` that ends the value.
    Value,
    /// Saw the blank line's `\r`; waiting for its `\n`.
    Finish,
}

/// Incremental parser for the header block following a request or status
/// line, up to and including the blank line that ends it.
pub struct HeaderBlockParser {
    state: State,
    /// How many bytes of `data` (counted from the block's start) have
    /// already been scanned, so a later call with a longer `data` slice
    /// resumes instead of rescanning and re-pushing entries.
    cursor: usize,
    name_start: usize,
    value_start: usize,
}

/// Outcome of one [`HeaderBlockParser::parse`] call.
pub enum HeaderStep {
    /// Needs more bytes; no full header block yet.
    Wait,
    /// The header block is complete. `consumed` is the number of bytes
    /// (from the parser's original starting position) that belong to the
    /// block, including the terminating CRLF.
    Finish { consumed: usize },
}

impl HeaderBlockParser {
    pub fn new() -> Self {
        HeaderBlockParser {
            state: State::LineStart,
            cursor: 0,
            name_start: 0,
            value_start: 0,
        }
    }

    /// Feeds the full, currently-available tail of the connection buffer
    /// starting at the position this header block began, appending
    /// parsed entries to `headers` as lines complete. `base_offset` is
    /// where `data` begins within the container the produced `View`s
    /// should be expressed against.
    ///
    /// `data` must be the same bytes on every call, just possibly longer
    /// (the caller appended more to the end) — the parser resumes from
    /// its own cursor rather than rescanning from the start.
    pub fn parse<H: HeaderContainer>(
        &mut self,
        data: &[u8],
        base_offset: usize,
        headers: &mut H,
    ) -> HeaderStep {
        let mut i = self.cursor;
        loop {
            match self.state {
                State::LineStart => {
                    if i >= data.len() {
                        break;
                    }
                    if data[i] == b'\r' {
                        self.state = State::Finish;
                        continue;
                    }
                    self.name_start = i;
                    self.state = State::Name;
                    continue;
                }
                State::Name => {
                    while i < data.len() && data[i] != b':' {
                        i += 1;
                    }
                    if i >= data.len() {
                        break;
                    }
                    headers.push(HeaderEntry::new(
                        View::new(base_offset + self.name_start, i - self.name_start),
                        View::new(base_offset + i, 0),
                    ));
                    i += 1;
                    self.state = State::Space;
                    continue;
                }
                State::Space => {
                    while i < data.len() && (data[i] == b' ' || data[i] == b'\t') {
                        i += 1;
                    }
                    if i >= data.len() {
                        break;
                    }
                    self.value_start = i;
                    self.state = State::Value;
                    continue;
                }
                State::Value => {
                    while i < data.len() && data[i] != b'\r' {
                        i += 1;
                    }
                    if i >= data.len() {
                        break;
                    }
                    let value_end = i;
                    if let Some(entry) = headers.last_mut() {
                        entry.value = View::new(
                            base_offset + self.value_start,
                            value_end - self.value_start,
                        );
                    }
                    i += 1;
                    if i >= data.len() || data[i] != b'\n' {
                        // rewind to the '\r' so the next call re-derives
                        // value_end instead of trusting a half-applied one
                        i -= 1;
                        break;
                    }
                    i += 1;
                    self.state = State::LineStart;
                    continue;
                }
                State::Finish => {
                    // `data[i]` is the '\r' of the blank line.
                    if i + 1 >= data.len() || data[i + 1] != b'\n' {
                        break;
                    }
                    return HeaderStep::Finish { consumed: i + 2 };
                }
            }
        }
        self.cursor = i;
        HeaderStep::Wait
    }
}

impl Default for HeaderBlockParser {
    fn default() -> Self {
        Self::new()
    }
}

/// The header predicates the body-framing logic needs, looked up
/// against a parsed header collection and its backing container.
pub struct HeaderView<'a> {
    entries: &'a [HeaderEntry],
    container: &'a [u8],
}

impl<'a> HeaderView<'a> {
    pub fn new(entries: &'a [HeaderEntry], container: &'a [u8]) -> Self {
        HeaderView { entries, container }
    }

    pub fn entries(&self) -> &'a [HeaderEntry] {
        self.entries
    }

    /// The value of the first header whose name matches `name`
    /// byte-for-byte, or `None` if there isn't one.
    pub fn find(&self, name: &[u8]) -> Option<&'a [u8]> {
        self.entries
            .iter()
            .find(|e| e.name.eq_bytes(self.container, name))
            .map(|e| e.value.resolve(self.container))
    }

    pub fn content_length(&self) -> Option<Result<u64, ()>> {
        self.find(b"Content-Length")
            .map(|v| std::str::from_utf8(v).ok().and_then(|s| s.parse().ok()).ok_or(()))
    }

    pub fn is_chunked(&self) -> bool {
        self.find(b"Transfer-Encoding")
            .map(|v| v.eq_ignore_ascii_case(b"chunked"))
            .unwrap_or(false)
    }

    pub fn is_upgrade(&self) -> bool {
        self.find(b"Connection")
            .map(|v| contains_token(v, b"upgrade"))
            .unwrap_or(false)
    }

    pub fn upgrade_protocol(&self) -> Option<&'a [u8]> {
        self.find(b"Upgrade")
    }

    pub fn is_close(&self) -> bool {
        self.find(b"Connection")
            .map(|v| contains_token(v, b"close"))
            .unwrap_or(false)
    }
}

fn contains_token(value: &[u8], token: &[u8]) -> bool {
    value
        .split(|&b| b == b',')
        .map(trim)
        .any(|part| part.eq_ignore_ascii_case(token))
}

fn trim(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&b| b != b' ' && b != b'\t').unwrap_or(data.len());
    let end = data.iter().rposition(|&b| b != b' ' && b != b'\t').map(|p| p + 1).unwrap_or(start);
    &data[start..end]
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_all(data: &[u8]) -> (Vec<HeaderEntry>, usize) {
        let mut parser = HeaderBlockParser::new();
        let mut headers = Vec::new();
        match parser.parse(data, 0, &mut headers) {
            HeaderStep::Finish { consumed } => (headers, consumed),
            HeaderStep::Wait => panic!("expected the block to finish in one call"),
        }
    }

    #[test]
    fn parses_simple_block() {
        let data = b"Host: example.com\r\nContent-Length: 5\r\n\r\n";
        let (headers, consumed) = parse_all(data);
        assert_eq!(consumed, data.len());
        assert_eq!(headers.len(), 2);
        let view = HeaderView::new(&headers, data);
        assert_eq!(view.find(b"Host"), Some(&b"example.com"[..]));
        assert_eq!(view.content_length().unwrap().unwrap(), 5);
    }

    #[test]
    fn empty_block_is_just_the_blank_line() {
        let data = b"\r\n";
        let (headers, consumed) = parse_all(data);
        assert!(headers.is_empty());
        assert_eq!(consumed, 2);
    }

    #[test]
    fn split_across_feed_calls() {
        let data = b"Host: example.com\r\nX-A: 1\r\n\r\n";
        let mut parser = HeaderBlockParser::new();
        let mut headers = Vec::new();
        let cut = 10;
        match parser.parse(&data[..cut], 0, &mut headers) {
            HeaderStep::Wait => {}
            HeaderStep::Finish { .. } => panic!("should not finish on a partial block"),
        }
        match parser.parse(data, 0, &mut headers) {
            HeaderStep::Finish { consumed } => assert_eq!(consumed, data.len()),
            HeaderStep::Wait => panic!("expected completion on the second call"),
        }
    }

    #[test]
    fn header_name_matching_is_case_sensitive() {
        let data = b"content-length: 5\r\n\r\n";
        let (headers, _) = parse_all(data);
        let view = HeaderView::new(&headers, data);
        assert_eq!(view.find(b"Content-Length"), None);
        assert_eq!(view.find(b"content-length"), Some(&b"5"[..]));
    }

    #[test]
    fn detects_chunked_and_upgrade() {
        let data = b"Transfer-Encoding: chunked\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n";
        let (headers, _) = parse_all(data);
        let view = HeaderView::new(&headers, data);
        assert!(view.is_chunked());
        assert!(view.is_upgrade());
        assert_eq!(view.upgrade_protocol(), Some(&b"websocket"[..]));
    }
}
