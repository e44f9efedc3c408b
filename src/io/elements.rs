//! The `$Elements` section and the local/halo topology built from it.
//!
//! The section has the same block layout as `$Nodes`:
//! ```text
//! $Elements
//! [1 reserved byte if binary]
//! <block_count> <element_count> <min_tag> <max_tag>
//!   per block: <dim:int> <tag:int> <element_type:int> <n:size>
//!              n × (<element tag> <node tag> …)
//! $EndElements
//! ```
//!
//! Every rank decodes every element. Only blocks of the highest entity
//! dimension become cells, and a rank retains a cell when it owns at least one
//! of its nodes. A retained cell is *local* when the rank owns its smallest
//! node tag and *halo* otherwise, so each cell is local on exactly one rank.

use crate::data::nested::NestedVector;
use crate::io::nodes::Node;
use crate::io::pipeline::{DataDecoder, HeaderDecoder, SectionPipeline, Validator};
use crate::io::scalar::{Mode, decode};
use crate::io::section::SectionFramer;
use crate::io::stream::MeshStream;
use crate::mesh_error::MeshSieveError;
use hashbrown::HashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Seek};

/// Section name of the element data.
pub const ELEMENTS: &str = "Elements";

/// Number of nodes of a GMSH element type.
///
/// Covers first and second order types and the common higher-order
/// Lagrange and serendipity families.
pub fn nodes_per_element(element_type: i32) -> Result<usize, MeshSieveError> {
    let n = match element_type {
        1 => 2,   // line
        2 => 3,   // triangle
        3 => 4,   // quadrangle
        4 => 4,   // tetrahedron
        5 => 8,   // hexahedron
        6 => 6,   // prism
        7 => 5,   // pyramid
        8 => 3,   // line, 2nd order
        9 => 6,   // triangle, 2nd order
        10 => 9,  // quadrangle, 2nd order
        11 => 10, // tetrahedron, 2nd order
        12 => 27, // hexahedron, 2nd order
        13 => 18, // prism, 2nd order
        14 => 14, // pyramid, 2nd order
        15 => 1,  // point
        16 => 8,  // serendipity quadrangle
        17 => 20, // serendipity hexahedron
        18 => 15, // serendipity prism
        19 => 13, // serendipity pyramid
        20 => 9,  // triangle, 3rd order incomplete
        21 => 10, // triangle, 3rd order
        22 => 12, // triangle, 4th order incomplete
        23 => 15, // triangle, 4th order
        24 => 15, // triangle, 5th order incomplete
        25 => 21, // triangle, 5th order
        26 => 4,  // line, 3rd order
        27 => 5,  // line, 4th order
        28 => 6,  // line, 5th order
        29 => 20, // tetrahedron, 3rd order
        30 => 35, // tetrahedron, 4th order
        31 => 56, // tetrahedron, 5th order
        36 => 16, // quadrangle, 3rd order
        37 => 25, // quadrangle, 4th order
        38 => 36, // quadrangle, 5th order
        39 => 12, // serendipity quadrangle, 3rd order
        40 => 16, // serendipity quadrangle, 4th order
        41 => 20, // serendipity quadrangle, 5th order
        92 => 64,  // hexahedron, 3rd order
        93 => 125, // hexahedron, 4th order
        other => return Err(MeshSieveError::UnsupportedElementType(other)),
    };
    Ok(n)
}

/// Global description of the Elements section. Counts span all dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHeader {
    pub count: usize,
    pub block_count: usize,
    pub min_tag: usize,
    pub max_tag: usize,
}

/// Small header preceding each element block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementBlockHeader {
    pub dim: i32,
    pub tag: i32,
    pub element_type: i32,
    pub count: usize,
}

/// One decoded element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    tag: usize,
    element_type: i32,
    nodes: Vec<usize>,
}

impl Element {
    pub fn new(tag: usize, element_type: i32, nodes: Vec<usize>) -> Self {
        Self {
            tag,
            element_type,
            nodes,
        }
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn element_type(&self) -> i32 {
        self.element_type
    }

    /// Natural node tags, in GMSH ordering.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    fn touches(&self, owned: &HashSet<usize>) -> bool {
        self.nodes.iter().any(|n| owned.contains(n))
    }

    fn is_local(&self, owned: &HashSet<usize>) -> bool {
        self.nodes.iter().min().is_some_and(|n| owned.contains(n))
    }
}

/// Cell/node connectivity of one rank.
///
/// - `cells()`: one row per retained cell (local rows first), holding the
///   cell's natural node tags;
/// - `nodes()`: one row per node referenced by a retained cell (owned rows
///   first, each group ascending by tag), holding row indices into `cells()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topology {
    cells: NestedVector<usize>,
    nodes: NestedVector<usize>,
    cell_tags: Vec<usize>,
    node_tags: Vec<usize>,
}

impl Topology {
    /// Build the topology of the rank owning `owned` from candidate cells.
    pub fn build<'a, I>(cells: I, owned: &HashSet<usize>) -> Self
    where
        I: IntoIterator<Item = &'a Element>,
    {
        let (local, halo): (Vec<&Element>, Vec<&Element>) = cells
            .into_iter()
            .filter(|e| e.touches(owned))
            .partition(|e| e.is_local(owned));

        let ordered = local.iter().chain(&halo).copied().collect_vec();
        let mut incident: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (row, element) in ordered.iter().enumerate() {
            for &node in element.nodes.iter().unique() {
                incident.entry(node).or_default().push(row);
            }
        }
        let (owned_nodes, halo_nodes): (Vec<_>, Vec<_>) =
            incident.into_iter().partition(|(n, _)| owned.contains(n));

        Self {
            cells: NestedVector::from_rows(
                local.iter().map(|&e| e.nodes.iter().copied()),
                halo.iter().map(|&e| e.nodes.iter().copied()),
            ),
            cell_tags: ordered.iter().map(|e| e.tag).collect(),
            node_tags: owned_nodes.iter().chain(&halo_nodes).map(|(n, _)| *n).collect(),
            nodes: NestedVector::from_rows(
                owned_nodes.into_iter().map(|(_, c)| c),
                halo_nodes.into_iter().map(|(_, c)| c),
            ),
        }
    }

    /// Cell → nodes adjacency.
    pub fn cells(&self) -> &NestedVector<usize> {
        &self.cells
    }

    /// Node → incident cells adjacency.
    pub fn nodes(&self) -> &NestedVector<usize> {
        &self.nodes
    }

    /// Element tag of each `cells()` row.
    pub fn cell_tags(&self) -> &[usize] {
        &self.cell_tags
    }

    /// Natural node tag of each `nodes()` row.
    pub fn node_tags(&self) -> &[usize] {
        &self.node_tags
    }
}

/// Natural tags of the nodes this rank owns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementEnvironment {
    owned: HashSet<usize>,
}

impl ElementEnvironment {
    pub fn from_tags<I: IntoIterator<Item = usize>>(tags: I) -> Self {
        Self {
            owned: tags.into_iter().collect(),
        }
    }

    pub fn from_nodes(nodes: &[Node]) -> Self {
        Self::from_tags(nodes.iter().map(Node::natural_idx))
    }

    pub fn owned(&self) -> &HashSet<usize> {
        &self.owned
    }
}

/// Decoded Elements section: the rank's topology plus what validation needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementSection {
    decoded: usize,
    tag_range: Option<(usize, usize)>,
    topology: Topology,
}

impl ElementSection {
    /// Number of elements decoded across all blocks and dimensions.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Smallest and largest element tag seen.
    pub fn tag_range(&self) -> Option<(usize, usize)> {
        self.tag_range
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn into_topology(self) -> Topology {
        self.topology
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ElementHeaderDecoder;

impl HeaderDecoder for ElementHeaderDecoder {
    type Header = ElementHeader;

    fn decode<R: BufRead + Seek>(
        &self,
        framer: &SectionFramer,
        stream: &mut MeshStream<R>,
        mode: Mode,
    ) -> Result<ElementHeader, MeshSieveError> {
        if mode == Mode::Binary {
            framer.read_raw(stream, &mut [0u8; 1])?;
        }
        let block_count = decode::<usize, R>(framer, stream, mode)?;
        let count = decode::<usize, R>(framer, stream, mode)?;
        let min_tag = decode::<usize, R>(framer, stream, mode)?;
        let max_tag = decode::<usize, R>(framer, stream, mode)?;
        Ok(ElementHeader {
            count,
            block_count,
            min_tag,
            max_tag,
        })
    }
}

/// Running state while folding over element blocks.
#[derive(Default)]
struct BlockScan {
    decoded: usize,
    tag_range: Option<(usize, usize)>,
    top_dim: Option<i32>,
    /// Highest `(dim, element_type)` of a non-empty block with an unknown type.
    unknown: Option<(i32, i32)>,
    candidates: Vec<(i32, Element)>,
}

impl BlockScan {
    fn absorb(&mut self, block: &ElementBlockHeader, elements: Vec<Element>, owned: &HashSet<usize>) {
        self.decoded += elements.len();
        if block.count > 0 {
            self.top_dim = self.top_dim.max(Some(block.dim));
            if nodes_per_element(block.element_type).is_err() {
                self.unknown = self.unknown.max(Some((block.dim, block.element_type)));
            }
        }
        for element in elements {
            self.tag_range = Some(match self.tag_range {
                None => (element.tag, element.tag),
                Some((lo, hi)) => (lo.min(element.tag), hi.max(element.tag)),
            });
            if element.touches(owned) {
                self.candidates.push((block.dim, element));
            }
        }
    }
}

/// Decodes every element block and keeps the cells touching owned nodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ElementDataDecoder;

impl DataDecoder<ElementHeader, ElementEnvironment> for ElementDataDecoder {
    type Output = ElementSection;

    fn decode<R: BufRead + Seek>(
        &self,
        framer: &SectionFramer,
        stream: &mut MeshStream<R>,
        mode: Mode,
        header: &ElementHeader,
        environment: &ElementEnvironment,
    ) -> Result<ElementSection, MeshSieveError> {
        let scan = (0..header.block_count).try_fold(BlockScan::default(), |mut scan, i| {
            let (block, elements) = decode_block(framer, stream, mode)?;
            log::debug!(
                "element block {i}: dim {} type {} with {} elements",
                block.dim,
                block.element_type,
                block.count
            );
            scan.absorb(&block, elements, environment.owned());
            Ok::<_, MeshSieveError>(scan)
        })?;

        // Unknown types are only tolerated below the cell dimension.
        if let Some((dim, element_type)) = scan.unknown {
            if Some(dim) == scan.top_dim {
                return Err(MeshSieveError::UnsupportedElementType(element_type));
            }
        }

        let cells = scan
            .candidates
            .iter()
            .filter(|(dim, _)| Some(*dim) == scan.top_dim)
            .map(|(_, e)| e);
        let topology = Topology::build(cells, environment.owned());
        log::info!(
            "retained {} local and {} halo cells",
            topology.cells().local().size(),
            topology.cells().halo().size()
        );

        Ok(ElementSection {
            decoded: scan.decoded,
            tag_range: scan.tag_range,
            topology,
        })
    }
}

/// Decode one element block: descriptor followed by its elements.
///
/// In ASCII mode a block of unknown type is still decoded, one element per
/// line; in binary mode its length cannot be known and the read fails.
pub fn decode_block<R: BufRead + Seek>(
    framer: &SectionFramer,
    stream: &mut MeshStream<R>,
    mode: Mode,
) -> Result<(ElementBlockHeader, Vec<Element>), MeshSieveError> {
    let block = ElementBlockHeader {
        dim: decode::<i32, R>(framer, stream, mode)?,
        tag: decode::<i32, R>(framer, stream, mode)?,
        element_type: decode::<i32, R>(framer, stream, mode)?,
        count: decode::<usize, R>(framer, stream, mode)?,
    };
    let elements = match nodes_per_element(block.element_type) {
        Ok(npe) => (0..block.count)
            .map(|_| {
                let tag = decode::<usize, R>(framer, stream, mode)?;
                let nodes = (0..npe)
                    .map(|_| decode::<usize, R>(framer, stream, mode))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Element::new(tag, block.element_type, nodes))
            })
            .collect::<Result<Vec<_>, MeshSieveError>>()?,
        Err(err) if mode == Mode::Binary => return Err(err),
        Err(_) => {
            log::warn!(
                "element type {} in dim {} block has unknown node count, reading by line",
                block.element_type,
                block.dim
            );
            (0..block.count)
                .map(|_| decode_row(framer, stream, block.element_type))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok((block, elements))
}

/// Decode one ASCII element line: its tag followed by any number of nodes.
fn decode_row<R: BufRead + Seek>(
    framer: &SectionFramer,
    stream: &mut MeshStream<R>,
    element_type: i32,
) -> Result<Element, MeshSieveError> {
    let premature = || MeshSieveError::PrematureEnd(framer.end_sigil().to_string());
    loop {
        let line = framer.read_line(stream)?.ok_or_else(premature)?;
        if framer.is_section_end(line.trim()) {
            return Err(premature());
        }
        let mut values = line.split_whitespace().map(|word| {
            word.parse::<usize>().map_err(|_| {
                MeshSieveError::MeshIoParse(format!(
                    "invalid node tag `{word}` in {} section",
                    framer.name()
                ))
            })
        });
        // Skips the remainder of the block header line.
        let Some(tag) = values.next() else {
            continue;
        };
        let nodes = values.collect::<Result<Vec<_>, _>>()?;
        return Ok(Element::new(tag?, element_type, nodes));
    }
}

/// Checks the decoded element count and tag range against the header.
#[derive(Clone, Copy, Debug, Default)]
pub struct ElementValidator;

impl Validator<ElementSection, ElementHeader> for ElementValidator {
    fn validate(&self, data: &ElementSection, header: &ElementHeader) -> Result<(), MeshSieveError> {
        if data.decoded != header.count {
            return Err(MeshSieveError::RetainedCountMismatch {
                section: ELEMENTS.into(),
                expected: header.count,
                found: data.decoded,
            });
        }
        if let Some((lo, hi)) = data.tag_range {
            if let Some(tag) = [lo, hi]
                .into_iter()
                .find(|t| *t < header.min_tag || *t > header.max_tag)
            {
                return Err(MeshSieveError::RangeViolation {
                    section: ELEMENTS.into(),
                    tag,
                    min_tag: header.min_tag,
                    max_tag: header.max_tag,
                });
            }
        }
        Ok(())
    }
}

/// Pipeline reading the Elements section.
pub type ElementStrategy =
    SectionPipeline<ElementHeaderDecoder, ElementDataDecoder, ElementEnvironment, ElementValidator>;

pub fn element_strategy(environment: ElementEnvironment) -> ElementStrategy {
    SectionPipeline::new(
        ELEMENTS,
        ElementHeaderDecoder,
        ElementDataDecoder,
        environment,
        ElementValidator,
    )
}

/// Read this rank's topology from `stream`.
pub fn read_topology<R: BufRead + Seek>(
    stream: &mut MeshStream<R>,
    mode: Mode,
    environment: ElementEnvironment,
) -> Result<Topology, MeshSieveError> {
    element_strategy(environment)
        .read(stream, mode)
        .map(ElementSection::into_topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TETS: &str = "$Elements
4 23 1 23
0 1 15 5
1 1
2 2
3 3
4 4
5 5
1 2 1 9
6 1 2
7 1 3
8 1 4
9 2 3
10 3 4
11 4 2
12 2 5
13 3 5
14 4 5
2 3 2 7
15 1 2 3
16 1 3 4
17 1 4 2
18 2 3 4
19 2 5 3
20 3 5 4
21 4 5 2
3 3 4 2
22 1 2 3 4
23 2 3 4 5
$EndElements
";

    fn topology(owned: &[usize]) -> Topology {
        let mut s = MeshStream::new(Cursor::new(TETS.as_bytes().to_vec())).unwrap();
        read_topology(
            &mut s,
            Mode::Ascii,
            ElementEnvironment::from_tags(owned.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn no_owned_nodes_gives_empty_topology() {
        assert_eq!(topology(&[]).nodes().size(), 0);
        assert_eq!(topology(&[42]).nodes().size(), 0);
    }

    #[test]
    fn single_owned_node() {
        let topo = topology(&[1]);
        let nodes = topo.nodes();
        assert_eq!(nodes.size(), 4);
        assert_eq!(nodes.local().size(), 1);
        assert_eq!(nodes.halo().size(), 3);
        assert_eq!(topo.node_tags(), &[1, 2, 3, 4]);

        assert_eq!(topo.cells().local().size(), 1);
        assert!(topo.cells().halo().is_empty());
        assert_eq!(topo.cell_tags(), &[22]);
        assert_eq!(topo.cells().row(0), Some(&[1, 2, 3, 4][..]));
    }

    #[test]
    fn halo_cells_follow_local_cells() {
        let topo = topology(&[5]);
        // Tet 23 touches node 5 but its smallest node (2) is not owned.
        assert!(topo.cells().local().is_empty());
        assert_eq!(topo.cells().halo().size(), 1);
        assert_eq!(topo.cell_tags(), &[23]);
        assert_eq!(topo.node_tags(), &[5, 2, 3, 4]);

        let topo = topology(&[1, 2, 3, 4, 5]);
        assert_eq!(topo.cells().local().size(), 2);
        assert_eq!(topo.nodes().local().size(), 5);
        // Nodes shared by both tets list both cell rows.
        assert_eq!(topo.nodes().row(1), Some(&[0, 1][..]));
        assert_eq!(topo.nodes().row(0), Some(&[0][..]));
    }

    #[test]
    fn element_count_is_validated() {
        let text = TETS.replacen("4 23 1 23", "4 24 1 24", 1);
        let mut s = MeshStream::new(Cursor::new(text.into_bytes())).unwrap();
        let err = read_topology(&mut s, Mode::Ascii, ElementEnvironment::default()).unwrap_err();
        assert_eq!(
            err,
            MeshSieveError::RetainedCountMismatch {
                section: ELEMENTS.into(),
                expected: 24,
                found: 23
            }
        );
    }

    #[test]
    fn element_tags_are_range_checked() {
        let text = TETS.replacen("4 23 1 23", "4 23 2 23", 1);
        let mut s = MeshStream::new(Cursor::new(text.into_bytes())).unwrap();
        let err = read_topology(&mut s, Mode::Ascii, ElementEnvironment::default()).unwrap_err();
        assert!(matches!(err, MeshSieveError::RangeViolation { tag: 1, .. }));
    }

    #[test]
    fn unknown_element_type() {
        let text = "$Elements\n1 1 1 1\n2 1 99 1\n1 1 2 3\n$EndElements\n";
        let mut s = MeshStream::new(Cursor::new(text.as_bytes().to_vec())).unwrap();
        let err = read_topology(&mut s, Mode::Ascii, ElementEnvironment::default()).unwrap_err();
        assert_eq!(err, MeshSieveError::UnsupportedElementType(99));
        assert_eq!(nodes_per_element(11), Ok(10));
        assert_eq!(nodes_per_element(29), Ok(20));
        assert_eq!(nodes_per_element(92), Ok(64));
    }

    #[test]
    fn unknown_type_below_cell_dimension_is_skipped() {
        let text = TETS
            .replacen("4 23 1 23", "5 24 1 24", 1)
            .replacen("3 3 4 2\n", "1 7 99 1\n24 1 2 3 4 5\n3 3 4 2\n", 1);
        let mut s = MeshStream::new(Cursor::new(text.into_bytes())).unwrap();
        let env = ElementEnvironment::from_tags([1]);
        let section = element_strategy(env).read(&mut s, Mode::Ascii).unwrap();
        assert_eq!(section.decoded(), 24);
        assert_eq!(section.tag_range(), Some((1, 24)));
        assert_eq!(section.topology(), &topology(&[1]));
    }

    #[test]
    fn unknown_type_in_binary_fails() {
        let mut bytes = b"$Elements\n".to_vec();
        for v in [1usize, 1, 1, 1] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        for v in [1i32, 1, 99] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        bytes.extend_from_slice(&1usize.to_ne_bytes());
        bytes.extend_from_slice(b"\n$EndElements\n");
        let mut s = MeshStream::new(Cursor::new(bytes)).unwrap();
        let err = read_topology(&mut s, Mode::Binary, ElementEnvironment::default()).unwrap_err();
        assert_eq!(err, MeshSieveError::UnsupportedElementType(99));
    }
}
