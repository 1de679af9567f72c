//! An incremental, allocation-aware HTTP/1.1 message parser and
//! generator.
//!
//! This crate owns no transport and no scheduling: it consumes bytes
//! handed to it by [`Parser::feed`], calls back into an [`Acceptor`] as
//! requests or responses become available, and builds outgoing messages
//! through [`Generator`]. Embedding it into an event loop, a
//! thread-per-connection server, or an async runtime is the caller's
//! job — the same split `rotor-http` draws between its `rotor`-driven
//! connection state machines and its protocol-level parsing.

#[macro_use]
extern crate quick_error;

pub mod chunked;
pub mod container;
pub mod error;
pub mod generator;
pub mod head;
pub mod headers;
pub mod message;
pub mod parser;
pub mod uri;
pub mod view;

pub use container::{ByteContainer, HeaderContainer, HeaderEntry};
pub use error::{ChunkError, GenError, ParseError};
pub use generator::Generator;
pub use message::{BodyFraming, Message};
pub use parser::{Acceptor, AcceptorChain, ChainableAcceptor, Limits, Parser, Role};
pub use view::View;
