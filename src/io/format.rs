//! Mesh file format detection and the GMSH `$MeshFormat` header.

use crate::io::scalar::Mode;
use crate::mesh_error::MeshSieveError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Mesh formats this crate reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshFormat {
    Gmsh,
}

/// Determines the format of a mesh file from its first line.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatDetector;

impl FormatDetector {
    pub fn detect(path: &Path) -> Result<MeshFormat, MeshSieveError> {
        if !path.exists() {
            return Err(MeshSieveError::MissingFile(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(MeshSieveError::UnknownFormat(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let first = first_line(path)?;
        if is_gmsh_header(&first) {
            Ok(MeshFormat::Gmsh)
        } else {
            Err(MeshSieveError::UnknownFormat(format!(
                "could not determine format of {}",
                path.display()
            )))
        }
    }
}

/// Whether `line` opens a GMSH file, allowing one space on either side.
pub fn is_gmsh_header(line: &str) -> bool {
    let line = line.strip_prefix(' ').unwrap_or(line);
    let line = line.strip_suffix(' ').unwrap_or(line);
    line == "$MeshFormat"
}

fn first_line(path: &Path) -> Result<String, MeshSieveError> {
    nth_line(path, 0)
}

/// Line `n` of `path` without its terminator; empty if the file is shorter.
fn nth_line(path: &Path, n: usize) -> Result<String, MeshSieveError> {
    let reader = BufReader::new(File::open(path)?);
    match reader.lines().nth(n) {
        Some(line) => Ok(line?.trim_end_matches('\r').to_string()),
        None => Ok(String::new()),
    }
}

/// Contents of the `$MeshFormat` header line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmshHeader {
    pub version: String,
    pub binary: bool,
    pub data_size: usize,
}

impl GmshHeader {
    /// Decode mode of the section payloads.
    pub fn mode(&self) -> Mode {
        if self.binary { Mode::Binary } else { Mode::Ascii }
    }
}

/// Parses `<version> <binary flag> <data size>` against an expected version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GmshHeaderParser {
    version: String,
}

impl GmshHeaderParser {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn parse_header(&self, line: &str) -> Result<GmshHeader, MeshSieveError> {
        let mut parts = line.split_whitespace();
        let version = parts.next().unwrap_or_default();
        let flag = parts.next().unwrap_or_default();
        let data_size = parts.next();

        if version != self.version {
            return Err(MeshSieveError::VersionMismatch {
                expected: self.version.clone(),
                found: version.to_string(),
            });
        }
        let binary = parse_flag(flag)?;
        let data_size = data_size
            .ok_or_else(|| MeshSieveError::MeshIoParse("missing mesh format data size".into()))?
            .parse::<usize>()
            .map_err(|e| MeshSieveError::MeshIoParse(format!("invalid data size: {e}")))?;

        let header = GmshHeader {
            version: version.to_string(),
            binary,
            data_size,
        };
        check_float_width(&header)?;
        Ok(header)
    }

    /// Parse the header on line 2 of `path`.
    pub fn read_header(&self, path: &Path) -> Result<GmshHeader, MeshSieveError> {
        self.parse_header(&nth_line(path, 1)?)
    }
}

/// Only the literal strings `"0"` and `"1"` are valid flags.
fn parse_flag(s: &str) -> Result<bool, MeshSieveError> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(MeshSieveError::MalformedBoolean(other.to_string())),
    }
}

/// Binary coordinates are decoded as `f64`; other widths cannot be read.
fn check_float_width(header: &GmshHeader) -> Result<(), MeshSieveError> {
    const WIDTH: usize = std::mem::size_of::<f64>();
    if header.data_size == WIDTH {
        return Ok(());
    }
    if header.binary {
        return Err(MeshSieveError::UnsupportedFloatWidth(header.data_size));
    }
    log::warn!(
        "ASCII mesh declares {}-byte floats; coordinates are read as f64",
        header.data_size
    );
    Ok(())
}
