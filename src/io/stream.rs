//! Cursor-tracking byte stream shared by all section readers.
//!
//! A [`MeshStream`] wraps any `BufRead + Seek` source (a buffered file or an
//! in-memory `Cursor`) and adds the two pieces of state the section framing
//! relies on: the absolute cursor offset and an *exhausted* flag. Once the
//! flag is raised every extraction observes end-of-stream until the stream is
//! repositioned, which is how "end of section" is surfaced to code that keeps
//! reading past a `$EndName` sigil.

use crate::mesh_error::MeshSieveError;
use std::io::{BufRead, Seek, SeekFrom};

/// A seekable mesh byte stream with sticky end-of-stream state.
#[derive(Debug)]
pub struct MeshStream<R> {
    inner: R,
    offset: u64,
    exhausted: bool,
}

impl<R: BufRead + Seek> MeshStream<R> {
    /// Wrap `inner`, starting from its current position.
    pub fn new(mut inner: R) -> Result<Self, MeshSieveError> {
        let offset = inner.stream_position()?;
        Ok(Self {
            inner,
            offset,
            exhausted: false,
        })
    }

    /// Consume the wrapper and return the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Absolute offset of the cursor.
    #[inline]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// `true` once a read ran into the physical end or the end was forced.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Reset the exhausted flag without moving the cursor.
    #[inline]
    pub fn clear(&mut self) {
        self.exhausted = false;
    }

    /// Clear the exhausted flag and move to the absolute offset `pos`.
    pub fn seek_to(&mut self, pos: u64) -> Result<(), MeshSieveError> {
        self.clear();
        self.offset = self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Clear the exhausted flag and move back to the origin.
    pub fn rewind(&mut self) -> Result<(), MeshSieveError> {
        self.seek_to(0)
    }

    /// Jump to the physical end and mark the stream exhausted.
    pub fn force_end(&mut self) -> Result<(), MeshSieveError> {
        self.offset = self.inner.seek(SeekFrom::End(0))?;
        self.exhausted = true;
        Ok(())
    }

    /// Extract the next whitespace-delimited token.
    ///
    /// Returns `Ok(None)` if the stream is exhausted or holds only whitespace.
    /// A token terminated by the physical end is returned, but the stream is
    /// marked exhausted.
    pub fn next_token(&mut self) -> Result<Option<String>, MeshSieveError> {
        if self.exhausted {
            return Ok(None);
        }

        // Skip leading whitespace.
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                self.exhausted = true;
                return Ok(None);
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let exhausted_buf = skip == buf.len();
            self.consume(skip);
            if !exhausted_buf {
                break;
            }
        }

        let mut token = Vec::new();
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                self.exhausted = true;
                break;
            }
            let take = buf.iter().take_while(|b| !b.is_ascii_whitespace()).count();
            token.extend_from_slice(&buf[..take]);
            let done = take < buf.len();
            self.consume(take);
            if done {
                break;
            }
        }

        Ok(Some(String::from_utf8_lossy(&token).into_owned()))
    }

    /// Read one line, without its terminator (`\n` or `\r\n`).
    pub fn read_line(&mut self) -> Result<Option<String>, MeshSieveError> {
        if self.exhausted {
            return Ok(None);
        }
        let mut raw = Vec::new();
        let n = self.inner.read_until(b'\n', &mut raw)?;
        self.offset += n as u64;
        if n == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        } else {
            self.exhausted = true;
        }
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }

    /// Fill `dst` with raw bytes. Returns `false` on a short read, in which
    /// case the stream is left exhausted.
    pub fn read_raw(&mut self, dst: &mut [u8]) -> Result<bool, MeshSieveError> {
        if self.exhausted {
            return Ok(dst.is_empty());
        }
        let mut filled = 0;
        while filled < dst.len() {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                self.exhausted = true;
                return Ok(false);
            }
            let take = buf.len().min(dst.len() - filled);
            dst[filled..filled + take].copy_from_slice(&buf[..take]);
            self.consume(take);
            filled += take;
        }
        Ok(true)
    }

    /// Discard up to `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), MeshSieveError> {
        let mut left = n;
        while left > 0 && !self.exhausted {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                self.exhausted = true;
                break;
            }
            let take = buf.len().min(left);
            self.consume(take);
            left -= take;
        }
        Ok(())
    }

    #[inline]
    fn consume(&mut self, n: usize) {
        self.inner.consume(n);
        self.offset += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(text: &str) -> MeshStream<Cursor<Vec<u8>>> {
        MeshStream::new(Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn tokens_track_offsets() {
        let mut s = stream("  ab\tcd\n ef");
        assert_eq!(s.next_token().unwrap().as_deref(), Some("ab"));
        assert_eq!(s.position(), 4);
        assert_eq!(s.next_token().unwrap().as_deref(), Some("cd"));
        assert!(!s.is_exhausted());
        assert_eq!(s.next_token().unwrap().as_deref(), Some("ef"));
        assert!(s.is_exhausted(), "token ending at physical end exhausts");
        assert_eq!(s.next_token().unwrap(), None);
    }

    #[test]
    fn trailing_whitespace_yields_none() {
        let mut s = stream("x \n");
        assert_eq!(s.next_token().unwrap().as_deref(), Some("x"));
        assert!(!s.is_exhausted());
        assert_eq!(s.next_token().unwrap(), None);
        assert!(s.is_exhausted());
    }

    #[test]
    fn forced_end_is_sticky_until_seek() {
        let mut s = stream("a b c");
        s.force_end().unwrap();
        assert_eq!(s.next_token().unwrap(), None);
        assert_eq!(s.read_line().unwrap(), None);
        s.seek_to(2).unwrap();
        assert_eq!(s.next_token().unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn lines_strip_terminators() {
        let mut s = stream("4.1 0 8\r\nnext\nlast");
        assert_eq!(s.read_line().unwrap().as_deref(), Some("4.1 0 8"));
        assert_eq!(s.read_line().unwrap().as_deref(), Some("next"));
        assert_eq!(s.read_line().unwrap().as_deref(), Some("last"));
        assert!(s.is_exhausted());
    }

    #[test]
    fn raw_reads_and_short_reads() {
        let mut s = stream("\x01\x02\x03");
        let mut two = [0u8; 2];
        assert!(s.read_raw(&mut two).unwrap());
        assert_eq!(two, [1, 2]);
        assert!(!s.read_raw(&mut two).unwrap());
        assert!(s.is_exhausted());
    }

    #[test]
    fn skip_advances_cursor() {
        let mut s = stream("\nabc");
        s.skip(1).unwrap();
        assert_eq!(s.position(), 1);
        assert_eq!(s.next_token().unwrap().as_deref(), Some("abc"));
    }
}
