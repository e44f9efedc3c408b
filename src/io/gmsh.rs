//! Gmsh `.msh` reader.
//!
//! # Supported format
//! - `.msh` version **4.1**, ASCII or binary.
//! - Binary payloads must use 8-byte floats in the host byte order.
//! - Element types: first- and second-order lines, surfaces and volumes,
//!   plus points (see [`nodes_per_element`]).
//!
//! # Distributed reads
//! Every rank opens the file and decodes the full `$Nodes` section, keeping
//! only the nodes its [`PartitionPolicy`] assigns to it. When topology is
//! requested the `$Elements` section is then decoded against those nodes.
//!
//! [`nodes_per_element`]: crate::io::elements::nodes_per_element

use crate::algs::communicator::Parallel;
use crate::algs::partition::PartitionPolicy;
use crate::io::elements::{ElementEnvironment, Topology, read_topology};
use crate::io::format::{FormatDetector, GmshHeader, GmshHeaderParser, MeshFormat};
use crate::io::nodes::{Node, NodeEnvironment, read_nodes};
use crate::io::scalar::Mode;
use crate::io::stream::MeshStream;
use crate::mesh_error::MeshSieveError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

/// Options controlling [`GmshReader`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmshReadOptions {
    /// Required `$MeshFormat` version.
    pub version: String,
    /// How nodes are distributed across ranks.
    pub partition: PartitionPolicy,
    /// Also read `$Elements` and build the rank's topology.
    pub read_topology: bool,
}

impl Default for GmshReadOptions {
    fn default() -> Self {
        Self {
            version: "4.1".to_string(),
            partition: PartitionPolicy::default(),
            read_topology: false,
        }
    }
}

/// Mesh data read by one rank.
#[derive(Clone, Debug, PartialEq)]
pub struct GmshMesh {
    pub header: GmshHeader,
    /// Nodes owned by this rank, in file order.
    pub nodes: Vec<Node>,
    /// Present when [`GmshReadOptions::read_topology`] is set.
    pub topology: Option<Topology>,
}

/// Gmsh `.msh` reader for v4.1 meshes.
#[derive(Debug, Default, Clone)]
pub struct GmshReader {
    options: GmshReadOptions,
}

impl GmshReader {
    pub fn new(options: GmshReadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GmshReadOptions {
        &self.options
    }

    /// Read the share of `path` belonging to `parallel`.
    pub fn read(&self, path: &Path, parallel: Parallel) -> Result<GmshMesh, MeshSieveError> {
        log::info!("Reading mesh file {}", path.display());
        match FormatDetector::detect(path)? {
            MeshFormat::Gmsh => {}
        }
        let header = GmshHeaderParser::new(self.options.version.as_str()).read_header(path)?;
        let mode = header.mode();

        let mut stream = MeshStream::new(BufReader::new(File::open(path)?))?;
        let nodes = self.read_nodes_in(&mut stream, mode, parallel)?;
        let topology = if self.options.read_topology {
            Some(read_topology(
                &mut stream,
                mode,
                ElementEnvironment::from_nodes(&nodes),
            )?)
        } else {
            None
        };

        Ok(GmshMesh {
            header,
            nodes,
            topology,
        })
    }

    /// Read this rank's nodes from an already opened stream.
    pub fn read_nodes_from<R: BufRead + Seek>(
        &self,
        reader: R,
        mode: Mode,
        parallel: Parallel,
    ) -> Result<Vec<Node>, MeshSieveError> {
        let mut stream = MeshStream::new(reader)?;
        self.read_nodes_in(&mut stream, mode, parallel)
    }

    fn read_nodes_in<R: BufRead + Seek>(
        &self,
        stream: &mut MeshStream<R>,
        mode: Mode,
        parallel: Parallel,
    ) -> Result<Vec<Node>, MeshSieveError> {
        read_nodes(
            stream,
            mode,
            NodeEnvironment::new(parallel, self.options.partition),
        )
    }
}
