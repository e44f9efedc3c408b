//! Generic header → data → validate pipeline for one mesh section.
//!
//! Each section type is obtained by plugging four small collaborators into a
//! [`SectionPipeline`]:
//! - a [`HeaderDecoder`] producing the section's global description;
//! - a [`DataDecoder`] streaming the record blocks, given the header and an
//!   environment (e.g. the parallel descriptor used to pick records);
//! - the environment value itself;
//! - a [`Validator`] checking the decoded records against the header.
//!
//! The pipeline returns data only once every stage has succeeded.

use crate::io::scalar::Mode;
use crate::io::section::SectionFramer;
use crate::io::stream::MeshStream;
use crate::mesh_error::MeshSieveError;
use std::io::{BufRead, Seek};

/// Decodes the global header of a section body.
pub trait HeaderDecoder {
    /// Header produced by this decoder.
    type Header;

    fn decode<R: BufRead + Seek>(
        &self,
        framer: &SectionFramer,
        stream: &mut MeshStream<R>,
        mode: Mode,
    ) -> Result<Self::Header, MeshSieveError>;
}

/// Decodes the record blocks following a section header.
pub trait DataDecoder<H, E> {
    /// Decoded records.
    type Output;

    fn decode<R: BufRead + Seek>(
        &self,
        framer: &SectionFramer,
        stream: &mut MeshStream<R>,
        mode: Mode,
        header: &H,
        environment: &E,
    ) -> Result<Self::Output, MeshSieveError>;
}

/// Structural checks on decoded records.
pub trait Validator<T, H> {
    fn validate(&self, data: &T, header: &H) -> Result<(), MeshSieveError>;
}

/// One section-reading operation assembled from four collaborators.
#[derive(Clone, Debug)]
pub struct SectionPipeline<HD, DD, E, V> {
    name: &'static str,
    header_decoder: HD,
    data_decoder: DD,
    environment: E,
    validator: V,
}

impl<HD, DD, E, V> SectionPipeline<HD, DD, E, V>
where
    HD: HeaderDecoder,
    DD: DataDecoder<HD::Header, E>,
    V: Validator<DD::Output, HD::Header>,
{
    pub fn new(
        name: &'static str,
        header_decoder: HD,
        data_decoder: DD,
        environment: E,
        validator: V,
    ) -> Self {
        Self {
            name,
            header_decoder,
            data_decoder,
            environment,
            validator,
        }
    }

    /// Section name this pipeline reads, e.g. `Nodes`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Environment handed to the data decoder.
    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// Decode header and data from the current cursor, then validate.
    pub fn read_in<R: BufRead + Seek>(
        &self,
        framer: &SectionFramer,
        stream: &mut MeshStream<R>,
        mode: Mode,
    ) -> Result<DD::Output, MeshSieveError> {
        let header = self.header_decoder.decode(framer, stream, mode)?;
        let data = self
            .data_decoder
            .decode(framer, stream, mode, &header, &self.environment)?;
        self.validator.validate(&data, &header)?;
        Ok(data)
    }

    /// Locate the section, decode and validate its body, then require the
    /// closing sigil.
    pub fn read<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
        mode: Mode,
    ) -> Result<DD::Output, MeshSieveError> {
        log::info!("Reading {}", self.name);
        let framer = SectionFramer::new(self.name, stream)?;
        framer.enter(stream)?;
        let data = self.read_in(&framer, stream, mode)?;
        framer.expect_end(stream)?;
        Ok(data)
    }
}
