//! Section framing for GMSH streams.
//!
//! GMSH file sections are bracketed by `$Name` and `$EndName` sigils. These
//! are textual even when the section payload is binary, so end-of-section
//! detection lives here, once, independent of the decode [`Mode`].
//!
//! A [`SectionFramer`] remembers where its section starts in a shared
//! [`MeshStream`] and hands out tokens, lines and raw bytes from that point
//! on. Reading the end sigil as a word or a line forces the stream to its
//! physical end, so any reader still pulling data past the section observes
//! the same exhaustion a real end-of-file would produce.
//!
//! [`Mode`]: crate::io::scalar::Mode

use crate::io::stream::MeshStream;
use crate::mesh_error::MeshSieveError;
use std::io::{BufRead, Seek};
use std::str::FromStr;

/// Locates and bounds one named section of a mesh stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFramer {
    name: String,
    start_sigil: String,
    end_sigil: String,
    start: u64,
}

impl SectionFramer {
    /// Locate section `name` in `stream`.
    ///
    /// The search starts at the current cursor; if the sigil is not found
    /// before the stream runs out it is repeated once from the origin, since
    /// the stream may already have been read past the section.
    ///
    /// On success the cursor is left just after the start sigil.
    pub fn new<R: BufRead + Seek>(
        name: &str,
        stream: &mut MeshStream<R>,
    ) -> Result<Self, MeshSieveError> {
        let start_sigil = format!("${name}");
        let end_sigil = format!("$End{name}");

        let start = match Self::search(stream, &start_sigil)? {
            Some(pos) => pos,
            None => {
                log::debug!("{start_sigil} not found ahead of cursor, rescanning from origin");
                stream.rewind()?;
                Self::search(stream, &start_sigil)?
                    .ok_or_else(|| MeshSieveError::SectionNotFound(start_sigil.clone()))?
            }
        };
        log::debug!("located {start_sigil} at offset {start}");

        Ok(Self {
            name: name.to_string(),
            start_sigil,
            end_sigil,
            start,
        })
    }

    /// Scan forward for `sigil`, returning the offset just before it.
    fn search<R: BufRead + Seek>(
        stream: &mut MeshStream<R>,
        sigil: &str,
    ) -> Result<Option<u64>, MeshSieveError> {
        loop {
            let pos = stream.position();
            match stream.next_token()? {
                Some(word) if word == sigil => return Ok(Some(pos)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Section name, e.g. `Nodes`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `$Name` sigil.
    pub fn start_sigil(&self) -> &str {
        &self.start_sigil
    }

    /// The `$EndName` sigil.
    pub fn end_sigil(&self) -> &str {
        &self.end_sigil
    }

    /// Offset of the position immediately preceding the start sigil.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Clear the stream's flags and move to `start + offset`.
    pub fn seek<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
        offset: u64,
    ) -> Result<(), MeshSieveError> {
        stream.seek_to(self.start + offset)
    }

    /// Position the stream on the section body, i.e. just past the start sigil.
    pub fn enter<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
    ) -> Result<(), MeshSieveError> {
        self.seek(stream, 0)?;
        match stream.next_token()? {
            Some(word) if word == self.start_sigil => Ok(()),
            Some(word) => Err(MeshSieveError::MeshIoParse(format!(
                "expected `{}` at section start, found `{word}`",
                self.start_sigil
            ))),
            None => Err(MeshSieveError::PrematureEnd(self.end_sigil.clone())),
        }
    }

    /// Pop one word from the section.
    ///
    /// Returns the end sigil itself when it is read, after forcing the stream
    /// to its end; later calls return `Ok(None)`. Reaching the physical end
    /// without having seen the end sigil is an error.
    pub fn pop_word<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
    ) -> Result<Option<String>, MeshSieveError> {
        self.ffwd(stream)?;
        if stream.is_exhausted() {
            return Ok(None);
        }
        match stream.next_token()? {
            Some(word) if self.is_section_end(&word) => {
                stream.force_end()?;
                Ok(Some(word))
            }
            Some(_) | None if stream.is_exhausted() => {
                Err(MeshSieveError::PrematureEnd(self.end_sigil.clone()))
            }
            other => Ok(other),
        }
    }

    /// Pop one typed value from the section text.
    ///
    /// No sentinel comparison is made: callers know how many values to read
    /// from the section header.
    pub fn pop<T, R>(&self, stream: &mut MeshStream<R>) -> Result<T, MeshSieveError>
    where
        T: FromStr,
        R: BufRead + Seek,
    {
        self.ffwd(stream)?;
        let word = stream
            .next_token()?
            .ok_or_else(|| MeshSieveError::PrematureEnd(self.end_sigil.clone()))?;
        word.parse::<T>().map_err(|_| {
            MeshSieveError::MeshIoParse(format!(
                "invalid {} value `{word}` in {} section",
                std::any::type_name::<T>(),
                self.name
            ))
        })
    }

    /// Fill `dst` with raw section bytes.
    pub fn read_raw<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
        dst: &mut [u8],
    ) -> Result<(), MeshSieveError> {
        self.ffwd(stream)?;
        if stream.read_raw(dst)? {
            Ok(())
        } else {
            Err(MeshSieveError::PrematureEnd(self.end_sigil.clone()))
        }
    }

    /// Read one line from the section, forcing the end when the line is the
    /// end sigil.
    pub fn read_line<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
    ) -> Result<Option<String>, MeshSieveError> {
        self.ffwd(stream)?;
        let line = stream.read_line()?;
        if let Some(l) = &line {
            if self.is_section_end(l.trim()) {
                stream.force_end()?;
            }
        }
        Ok(line)
    }

    /// Require the next word to be the end sigil.
    pub fn expect_end<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
    ) -> Result<(), MeshSieveError> {
        match self.pop_word(stream)? {
            Some(word) if self.is_section_end(&word) => Ok(()),
            found => Err(MeshSieveError::SectionEndMismatch {
                section: self.name.clone(),
                expected: self.end_sigil.clone(),
                found: found.unwrap_or_default(),
            }),
        }
    }

    /// Whether `word` closes this section.
    #[inline]
    pub fn is_section_end(&self, word: &str) -> bool {
        word == self.end_sigil
    }

    fn ffwd<R: BufRead + Seek>(&self, stream: &mut MeshStream<R>) -> Result<(), MeshSieveError> {
        if stream.position() < self.start {
            self.seek(stream, 0)?;
        }
        Ok(())
    }
}
