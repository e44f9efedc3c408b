#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-sieve-gmsh
//!
//! mesh-sieve-gmsh reads GMSH 4.1 `.msh` files for distributed PDE codes.
//! Every rank decodes the file's sections and keeps only the records its
//! partition assigns to it, so no communication is needed while reading.
//!
//! ## Features
//! - `$Name` … `$EndName` section framing over any `BufRead + Seek` source
//! - ASCII and binary payloads through one mode-agnostic scalar decoder
//! - Header → data → validation pipelines for `$Nodes` and `$Elements`
//! - Rank-count invariant global node numbering
//! - Local/halo cell and node connectivity in CSR storage
//! - Optional MPI integration (`mpi-support`) for obtaining rank and size
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-sieve-gmsh = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! ```no_run
//! use mesh_sieve_gmsh::prelude::*;
//! use std::path::Path;
//!
//! let reader = GmshReader::new(GmshReadOptions::default());
//! let mesh = reader.read(Path::new("box.msh"), Parallel::serial())?;
//! println!("read {} nodes", mesh.nodes.len());
//! # Ok::<(), MeshSieveError>(())
//! ```
//!
//! ## Logging
//! Progress is reported through the [`log`] facade; install any logger to
//! see it.

pub mod algs;
pub mod data;
pub mod io;
pub mod mesh_error;
pub mod utils;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, Parallel};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::partition::{NaivePartition, Partition, PartitionPolicy};
    pub use crate::data::nested::NestedVector;
    pub use crate::io::elements::{Element, Topology};
    pub use crate::io::format::{FormatDetector, GmshHeader, GmshHeaderParser, MeshFormat};
    pub use crate::io::gmsh::{GmshMesh, GmshReadOptions, GmshReader};
    pub use crate::io::nodes::Node;
    pub use crate::io::pipeline::{DataDecoder, HeaderDecoder, SectionPipeline, Validator};
    pub use crate::io::scalar::Mode;
    pub use crate::io::section::SectionFramer;
    pub use crate::io::stream::MeshStream;
    pub use crate::mesh_error::MeshSieveError;
}
