//! Error types for the parsing core and the generator.
//!
//! Mirrors the shape of `rotor-http`'s own `HeaderError` and
//! `RequestError`: one `quick_error!` enum per failure domain rather than
//! a single kitchen-sink error, so callers can match narrowly.

quick_error! {
    /// The crate-wide error enum: fatal parsing failures returned
    /// directly from [`crate::Parser::feed`], plus the range- and
    /// URI-parsing errors raised by the position-view and URI helpers
    /// that feed into it. One enum rather than three lets a caller
    /// propagate any of them with a single `?`.
    #[derive(Debug)]
    pub enum ParseError {
        /// Head line or header block exceeded the configured size limit.
        HeadTooLarge {
            description("head line or headers exceed the configured limit")
        }
        /// The first line was not a recognizable request or status line.
        BadHead {
            description("malformed request or status line")
        }
        /// `trim_buf` was called with a length larger than the reserved
        /// region from the matching `create_buf`.
        InvalidTrim {
            description("trim length exceeds reserved buffer length")
        }
        /// Raised lazily the first time a request head's URI is parsed.
        UriParse(reason: &'static str) {
            description("malformed URI")
            display("malformed URI: {}", reason)
        }
        /// A [`crate::view::View`] was resolved against a container
        /// shorter than the range it names — a programming error in the
        /// caller rather than malformed input.
        InvalidRange(offset: usize, len: usize, container_len: usize) {
            description("position view out of range for its container")
            display("offset {} + length {} exceeds container length {}",
                    offset, len, container_len)
        }
    }
}

quick_error! {
    /// Framing errors inside a chunked body.
    ///
    /// Delivered to the acceptor's `on_error` rather than returned from
    /// `feed` directly, since the failure is about this one message's
    /// body, not the connection as a whole: the parser trims past the
    /// broken chunk and resumes looking for the next message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ChunkError {
        InvalidSizeLine {
            description("chunk size line is malformed or missing its CRLF")
        }
    }
}

quick_error! {
    /// Errors raised while building an outgoing message with
    /// [`crate::generator::Generator`].
    #[derive(Debug)]
    pub enum GenError {
        /// `response(code, ..)` was called with a code outside `100..=999`.
        InvalidStatusCode(code: i64) {
            description("status code must be in the range 100..=999")
            display("invalid status code: {}", code)
        }
        /// `method(m)` was called with a verb outside the fixed set
        /// `GET|HEAD|POST|PUT|DELETE|CONNECT|TRACE|PATCH`.
        InvalidMethod(method: String) {
            description("method is not one of the recognized HTTP/1.1 verbs")
            display("invalid method: {}", method)
        }
        /// `uri(u)` was given a target [`crate::uri::parse`] rejected.
        InvalidUri(reason: &'static str) {
            description("URI could not be parsed for the generator's start line")
            display("invalid URI: {}", reason)
        }
        /// `Content-Length` or `Transfer-Encoding` passed to `header()`
        /// directly; these must go through `add_length`/`make_chunked`.
        BodyLengthHeader {
            description("Content-Length and Transfer-Encoding must be set \
                         through their dedicated methods")
        }
        DuplicateContentLength {
            description("Content-Length was already set for this message")
        }
        DuplicateTransferEncoding {
            description("Transfer-Encoding was already set for this message")
        }
        ContentLengthAfterChunked {
            description("Content-Length set after make_chunked()")
        }
        ChunkedAfterContentLength {
            description("make_chunked() called after Content-Length was set")
        }
        /// A header, length, or body call arrived in the wrong phase —
        /// e.g. `header()` after `done_headers()`, or `body()` before it.
        OutOfOrder {
            description("generator method called out of sequence")
        }
        /// `body()` was called with more bytes than the declared
        /// `Content-Length` leaves room for.
        BodyOverrun {
            description("body write would exceed the declared Content-Length")
        }
        /// `add_length`/`make_chunked`/`body`/`reserve_body` was called on
        /// a response whose status code denies a body outright (`101`,
        /// `204`).
        BodyDenied(code: i64) {
            description("this status code must not carry a body")
            display("status code {} must not carry a body", code)
        }
    }
}
