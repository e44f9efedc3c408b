//! Mesh I/O: section framing, decoding and the GMSH reader.
//!
//! Readers are layered bottom-up:
//! - [`stream`] tracks the cursor and end-of-stream state;
//! - [`section`] locates `$Name` … `$EndName` sections;
//! - [`scalar`] decodes single values in ASCII or binary [`Mode`];
//! - [`pipeline`] composes header, data and validation stages;
//! - [`nodes`] and [`elements`] plug concrete stages into the pipeline;
//! - [`format`] and [`gmsh`] detect and orchestrate whole files.

pub mod elements;
pub mod format;
pub mod gmsh;
pub mod nodes;
pub mod pipeline;
pub mod scalar;
pub mod section;
pub mod stream;

pub use gmsh::{GmshMesh, GmshReadOptions, GmshReader};
pub use scalar::Mode;
