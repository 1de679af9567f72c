//! End-to-end scenarios driven entirely through the public API rather
//! than any module's internals.

use http1_engine::{Acceptor, ChunkError, Generator, Limits, Message, Parser, Role};

#[derive(Default)]
struct Recorder {
    heads: usize,
    bodies: Vec<Vec<u8>>,
    tails: Vec<u64>,
    ends: usize,
    errors: Vec<ChunkError>,
}

impl Acceptor for Recorder {
    fn on_head(&mut self, _message: &Message, _container: &[u8]) {
        self.heads += 1;
    }
    fn on_body_chunk(&mut self, data: &[u8], tail: u64) {
        self.bodies.push(data.to_vec());
        self.tails.push(tail);
    }
    fn on_message_end(&mut self) {
        self.ends += 1;
    }
    fn on_error(&mut self, error: ChunkError) {
        self.errors.push(error);
    }
}

/// A request with no body, fed one byte at a time, still produces
/// exactly one head and one message end regardless of the split.
#[test]
fn simple_request_split_byte_by_byte() {
    let mut parser: Parser = Parser::new(Role::Server);
    let mut rec = Recorder::default();
    let raw = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n";
    for byte in raw {
        parser.feed(&[*byte], &mut rec).unwrap();
    }
    assert_eq!(rec.heads, 1);
    assert_eq!(rec.ends, 1);
    assert!(rec.bodies.is_empty());
    assert_eq!(parser.buffered_len(), 0);
}

/// A sized body arriving in two independent `feed` calls is buffered
/// and handed to the acceptor as a single whole chunk with `tail: 0`.
#[test]
fn sized_body_across_two_feeds() {
    let mut parser: Parser = Parser::new(Role::Server);
    let mut rec = Recorder::default();
    parser
        .feed(b"POST /up HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello ", &mut rec)
        .unwrap();
    assert_eq!(rec.heads, 1);
    assert_eq!(rec.ends, 0);
    parser.feed(b"world", &mut rec).unwrap();
    assert_eq!(rec.ends, 1);
    assert_eq!(rec.bodies, vec![b"hello world".to_vec()]);
    assert_eq!(rec.tails, vec![0]);
}

/// A chunked body with several chunks and a trailer is reassembled into
/// one `on_message_end`, one body fragment per chunk the server sent.
#[test]
fn chunked_body_multiple_chunks_with_trailer() {
    let mut parser: Parser = Parser::new(Role::Server);
    let mut rec = Recorder::default();
    parser
        .feed(
            b"POST /up HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
              4\r\nWiki\r\n5\r\npedia\r\n0\r\nX-Trailer: done\r\n\r\n",
            &mut rec,
        )
        .unwrap();
    assert_eq!(rec.heads, 1);
    assert_eq!(rec.ends, 1);
    assert_eq!(rec.bodies, vec![b"Wiki".to_vec(), b"pedia".to_vec()]);
}

/// Streamed-oversize-body scenario: `MaxBodySize=100`,
/// `Content-Length: 120`, fed as 80/38/2 bytes. The first two feeds
/// accumulate in the container; the third pushes the buffered total
/// over `max_body_size` and triggers an early fragment with the
/// correct `tail`, then the final 2 bytes complete the message.
#[test]
fn streamed_oversize_body_reports_exact_tail_counts() {
    let limits = Limits { max_body_size: 100, ..Limits::default() };
    let mut parser: Parser = Parser::with_limits(Role::Server, limits);
    let mut rec = Recorder::default();
    let body = vec![b'x'; 120];
    parser
        .feed(b"POST /up HTTP/1.1\r\nContent-Length: 120\r\n\r\n", &mut rec)
        .unwrap();
    parser.feed(&body[..80], &mut rec).unwrap();
    assert!(rec.bodies.is_empty());
    parser.feed(&body[80..118], &mut rec).unwrap();
    assert_eq!(rec.bodies.len(), 1);
    assert_eq!(rec.bodies[0].len(), 118);
    assert_eq!(rec.tails[0], 2);
    assert_eq!(rec.ends, 0);
    parser.feed(&body[118..120], &mut rec).unwrap();
    assert_eq!(rec.bodies.len(), 2);
    assert_eq!(rec.bodies[1], vec![b'x'; 2]);
    assert_eq!(rec.tails[1], 0);
    assert_eq!(rec.ends, 1);
}

/// Two pipelined requests delivered in one `feed` call each produce
/// their own head/end pair, in order, with nothing left buffered.
#[test]
fn pipelined_requests_preserve_order() {
    let mut parser: Parser = Parser::new(Role::Server);
    let mut rec = Recorder::default();
    parser
        .feed(
            b"GET /first HTTP/1.1\r\n\r\nPOST /second HTTP/1.1\r\nContent-Length: 3\r\n\r\nfoo",
            &mut rec,
        )
        .unwrap();
    assert_eq!(rec.heads, 2);
    assert_eq!(rec.ends, 2);
    assert_eq!(rec.bodies, vec![b"foo".to_vec()]);
    assert_eq!(parser.buffered_len(), 0);
}

/// A message built with `Generator::uri` round-trips through the
/// parser: the derived `Host` header and the split path/query land
/// exactly where the generator put them.
#[test]
fn generator_uri_round_trips_through_parser() {
    let mut gen = Generator::new();
    gen.method("POST").unwrap();
    gen.uri("http://api.example.com/widgets?page=2").unwrap();
    gen.header("Accept", "application/json").unwrap();
    gen.add_length(4).unwrap();
    gen.done_headers().unwrap();
    gen.body(b"body").unwrap();
    let bytes = gen.finish().to_vec();

    let mut parser: Parser = Parser::new(Role::Server);
    let mut rec = Recorder::default();
    parser.feed(&bytes, &mut rec).unwrap();

    assert_eq!(rec.heads, 1);
    assert_eq!(rec.ends, 1);
    assert_eq!(rec.bodies, vec![b"body".to_vec()]);

    let text = String::from_utf8_lossy(&bytes);
    assert!(text.starts_with("POST /widgets?page=2 HTTP/1.1\r\n"));
    assert!(text.contains("Host: api.example.com\r\n"));
}

/// A broken chunk framing is surfaced via `on_error` but does not wedge
/// the connection: a well-formed pipelined request right after it is
/// still parsed normally.
#[test]
fn chunk_error_allows_pipelined_recovery() {
    let mut parser: Parser = Parser::new(Role::Server);
    let mut rec = Recorder::default();
    parser
        .feed(
            b"POST /broken HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n\
              GET /next HTTP/1.1\r\n\r\n",
            &mut rec,
        )
        .unwrap();
    assert_eq!(rec.heads, 2);
    assert_eq!(rec.errors.len(), 1);
    assert_eq!(rec.ends, 1);
}

/// A websocket-style upgrade request (no `Content-Length`, not chunked,
/// `Connection: Upgrade` + `Upgrade: websocket`) streams whatever bytes
/// follow the head as body chunks and never reaches `on_message_end` —
/// the connection now belongs to the upgraded protocol.
#[test]
fn upgrade_request_never_completes_as_http() {
    let mut parser: Parser = Parser::new(Role::Server);
    let mut rec = Recorder::default();
    parser
        .feed(
            b"GET /chat HTTP/1.1\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n\x81\x05hello",
            &mut rec,
        )
        .unwrap();
    assert_eq!(rec.heads, 1);
    assert_eq!(rec.ends, 0);
    assert_eq!(rec.bodies, vec![b"\x81\x05hello".to_vec()]);
}

/// A client-mode parser correlates a `HEAD` request with its response
/// and still reports the response's head and end even though the
/// response carries a `Content-Length` it must ignore.
#[test]
fn client_head_response_ignores_content_length() {
    let mut parser: Parser = Parser::new(Role::client());
    parser.note_request(b"HEAD");
    let mut rec = Recorder::default();
    parser
        .feed(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n", &mut rec)
        .unwrap();
    assert_eq!(rec.heads, 1);
    assert_eq!(rec.ends, 1);
    assert!(rec.bodies.is_empty());
}
