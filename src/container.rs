//! Pluggable storage for parsed bytes and header entries.
//!
//! The original parser took its containers as template parameters
//! (`DataContainerFactory`, `ContainerFactory`) so embedders could swap in
//! their own buffer types. Rust has no templates, but the same seam maps
//! onto a pair of traits, in the spirit of `rotor-stream`'s `Buf`: the
//! engine is generic over anything that looks like an append-only,
//! trimmable byte vector (see [`Parser`](crate::parser::Parser)'s `B`
//! parameter, built via `B::default()`). Header storage is always a
//! `Vec<HeaderEntry>`, reset per-message rather than pooled, so it needs
//! no separate factory indirection of its own.

use crate::view::View;

/// An append-only, front-trimmable byte buffer.
///
/// [`Vec<u8>`] is the default and the only implementation this crate
/// ships, but the trait exists so an embedder can plug in a ring buffer
/// or a pooled allocation instead without touching the parser itself.
pub trait ByteContainer {
    fn as_bytes(&self) -> &[u8];
    fn len(&self) -> usize {
        self.as_bytes().len()
    }
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn extend(&mut self, data: &[u8]);
    /// Drops the first `n` bytes, shifting everything after them to the
    /// front. Callers are responsible for rebasing any [`View`] still
    /// referencing offsets into this container.
    fn trim_front(&mut self, n: usize);
    fn clear(&mut self);
    /// Grows the container by `n` zero-filled bytes and returns a mutable
    /// slice over just the newly reserved tail, the zero-copy ingress
    /// path behind [`crate::parser::Parser::create_buf`]: a caller
    /// reading off a socket can read straight into this slice instead of
    /// reading into a scratch buffer and then calling
    /// [`ByteContainer::extend`] to copy it in.
    fn reserve_tail(&mut self, n: usize) -> &mut [u8];
    /// Removes `n` bytes from the very end of the container — the unused
    /// remainder of a [`ByteContainer::reserve_tail`] reservation a
    /// socket read didn't fill.
    fn truncate_tail(&mut self, n: usize);
}

impl ByteContainer for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn extend(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }

    fn trim_front(&mut self, n: usize) {
        self.drain(..n);
    }

    fn clear(&mut self) {
        Vec::clear(self)
    }

    fn reserve_tail(&mut self, n: usize) -> &mut [u8] {
        let start = self.len();
        self.resize(start + n, 0);
        &mut self[start..]
    }

    fn truncate_tail(&mut self, n: usize) {
        let new_len = self.len().saturating_sub(n);
        self.truncate(new_len);
    }
}

/// One parsed header as a pair of views into the byte container that was
/// current when the header block was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: View,
    pub value: View,
}

impl HeaderEntry {
    pub fn new(name: View, value: View) -> Self {
        HeaderEntry { name, value }
    }
}

/// Storage for a message's parsed header entries.
///
/// Kept separate from [`ByteContainer`] because headers are a sequence of
/// `(name, value)` view pairs, not raw bytes, and because a message's
/// header storage is reset per-message while the byte container spans the
/// whole connection.
pub trait HeaderContainer {
    fn push(&mut self, entry: HeaderEntry);
    fn entries(&self) -> &[HeaderEntry];
    fn last_mut(&mut self) -> Option<&mut HeaderEntry>;
    fn clear(&mut self);
}

impl HeaderContainer for Vec<HeaderEntry> {
    fn push(&mut self, entry: HeaderEntry) {
        Vec::push(self, entry)
    }

    fn entries(&self) -> &[HeaderEntry] {
        self
    }

    fn last_mut(&mut self) -> Option<&mut HeaderEntry> {
        self.last_mut()
    }

    fn clear(&mut self) {
        Vec::clear(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vec_byte_container_trims_front() {
        let mut buf = Vec::new();
        ByteContainer::extend(&mut buf, b"hello world");
        buf.trim_front(6);
        assert_eq!(buf.as_bytes(), b"world");
    }

    #[test]
    fn reserve_tail_then_truncate_unused() {
        let mut buf = Vec::new();
        ByteContainer::extend(&mut buf, b"GET / ");
        {
            let spare = buf.reserve_tail(8);
            spare[..4].copy_from_slice(b"HTTP");
        }
        // only 4 of the 8 reserved bytes were actually filled.
        buf.truncate_tail(4);
        assert_eq!(buf.as_bytes(), b"GET / HTTP");
    }

    #[test]
    fn vec_header_container_tracks_last() {
        let mut headers: Vec<HeaderEntry> = Vec::new();
        headers.push(HeaderEntry::new(View::new(0, 4), View::new(5, 3)));
        headers.push(HeaderEntry::new(View::new(10, 6), View::new(18, 1)));
        assert_eq!(HeaderContainer::entries(&headers).len(), 2);
        let last = HeaderContainer::last_mut(&mut headers).unwrap();
        last.value = View::new(18, 2);
        assert_eq!(headers[1].value.len(), 2);
    }
}
