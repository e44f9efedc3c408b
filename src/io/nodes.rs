//! The `$Nodes` section: records, decoders and structural validation.
//!
//! # Wire layout
//! ```text
//! $Nodes
//! [1 reserved byte if binary]
//! <block_count> <node_count> <min_tag> <max_tag>
//!   per block: <dim:int> <tag:int> <parametric:int> <n:size>
//!              n natural tags (size)
//!              n coordinate triples (3 × double)
//! $EndNodes
//! ```
//!
//! Every record gets a zero-based `global_idx` from one counter spanning the
//! whole section, *before* the partition decides whether this rank keeps it.
//! Global indices are therefore identical whatever the number of ranks.

use crate::algs::communicator::Parallel;
use crate::algs::partition::{Partition, PartitionPolicy};
use crate::io::pipeline::{DataDecoder, HeaderDecoder, SectionPipeline, Validator};
use crate::io::scalar::{Mode, decode, decode_flag};
use crate::io::section::SectionFramer;
use crate::io::stream::MeshStream;
use crate::mesh_error::MeshSieveError;
use crate::utils::{append, test_stride};
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Seek};

/// Section name of the node data.
pub const NODES: &str = "Nodes";

/// A mesh node: file tag, section-wide insertion index and coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    natural_idx: usize,
    global_idx: usize,
    x: [f64; 3],
}

impl Node {
    pub const fn new(natural_idx: usize, global_idx: usize, x: [f64; 3]) -> Self {
        Self {
            natural_idx,
            global_idx,
            x,
        }
    }

    /// Tag given in the file (not necessarily dense).
    #[inline]
    pub const fn natural_idx(&self) -> usize {
        self.natural_idx
    }

    /// Zero-based position across all blocks of the section.
    #[inline]
    pub const fn global_idx(&self) -> usize {
        self.global_idx
    }

    /// Coordinates `(x, y, z)`.
    #[inline]
    pub const fn coords(&self) -> [f64; 3] {
        self.x
    }
}

/// Global description of the Nodes section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHeader {
    /// Number of nodes in the mesh.
    pub count: usize,
    /// Number of node blocks.
    pub block_count: usize,
    /// Smallest node tag.
    pub min_tag: usize,
    /// Largest node tag.
    pub max_tag: usize,
}

impl NodeHeader {
    /// Whether the tag range exactly covers the node count, i.e. tags are
    /// expected to be dense.
    pub fn expects_contiguous(&self) -> bool {
        self.max_tag
            .checked_add(1)
            .and_then(|m| m.checked_sub(self.min_tag))
            == Some(self.count)
    }
}

/// Small header preceding each node block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeBlockHeader {
    pub dim: i32,
    pub tag: i32,
    pub parametric: bool,
    pub count: usize,
}

/// Parallel context for decoding and validating nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEnvironment {
    pub parallel: Parallel,
    pub policy: PartitionPolicy,
}

impl NodeEnvironment {
    pub fn new(parallel: Parallel, policy: PartitionPolicy) -> Self {
        Self { parallel, policy }
    }
}

/// Decodes `{block_count, node_count, min_tag, max_tag}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeHeaderDecoder;

impl HeaderDecoder for NodeHeaderDecoder {
    type Header = NodeHeader;

    fn decode<R: BufRead + Seek>(
        &self,
        framer: &SectionFramer,
        stream: &mut MeshStream<R>,
        mode: Mode,
    ) -> Result<NodeHeader, MeshSieveError> {
        if mode == Mode::Binary {
            framer.read_raw(stream, &mut [0u8; 1])?;
        }
        let block_count = decode::<usize, R>(framer, stream, mode)?;
        let count = decode::<usize, R>(framer, stream, mode)?;
        let min_tag = decode::<usize, R>(framer, stream, mode)?;
        let max_tag = decode::<usize, R>(framer, stream, mode)?;
        Ok(NodeHeader {
            count,
            block_count,
            min_tag,
            max_tag,
        })
    }
}

/// Decodes every node block and keeps the nodes this rank owns.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeDataDecoder;

impl DataDecoder<NodeHeader, NodeEnvironment> for NodeDataDecoder {
    type Output = Vec<Node>;

    fn decode<R: BufRead + Seek>(
        &self,
        framer: &SectionFramer,
        stream: &mut MeshStream<R>,
        mode: Mode,
        header: &NodeHeader,
        environment: &NodeEnvironment,
    ) -> Result<Vec<Node>, MeshSieveError> {
        let partition = environment.policy.build(&environment.parallel, header.count);

        let (nodes, _) = (0..header.block_count).try_fold(
            (Vec::new(), 0usize),
            |(mut nodes, next_global), block| {
                let (kept, next_global) =
                    decode_block(framer, stream, mode, next_global, &partition)?;
                log::debug!("node block {block}: kept {} nodes", kept.len());
                append(&mut nodes, kept);
                Ok::<_, MeshSieveError>((nodes, next_global))
            },
        )?;

        log::info!(
            "rank {} read {} out of {} nodes",
            environment.parallel.rank(),
            nodes.len(),
            header.count
        );
        Ok(nodes)
    }
}

/// Decode one block's descriptor.
pub fn decode_block_header<R: BufRead + Seek>(
    framer: &SectionFramer,
    stream: &mut MeshStream<R>,
    mode: Mode,
) -> Result<NodeBlockHeader, MeshSieveError> {
    Ok(NodeBlockHeader {
        dim: decode::<i32, R>(framer, stream, mode)?,
        tag: decode::<i32, R>(framer, stream, mode)?,
        parametric: decode_flag(framer, stream, mode)?,
        count: decode::<usize, R>(framer, stream, mode)?,
    })
}

/// Decode one block starting at global index `first_global`.
///
/// Returns the nodes `partition` keeps, in block order, and the global index
/// following the block.
pub fn decode_block<R, P>(
    framer: &SectionFramer,
    stream: &mut MeshStream<R>,
    mode: Mode,
    first_global: usize,
    partition: &P,
) -> Result<(Vec<Node>, usize), MeshSieveError>
where
    R: BufRead + Seek,
    P: Partition,
{
    let block = decode_block_header(framer, stream, mode)?;
    let tags = (0..block.count)
        .map(|_| decode::<usize, R>(framer, stream, mode))
        .collect::<Result<Vec<_>, _>>()?;
    let coords = (0..block.count)
        .map(|_| {
            Ok([
                decode::<f64, R>(framer, stream, mode)?,
                decode::<f64, R>(framer, stream, mode)?,
                decode::<f64, R>(framer, stream, mode)?,
            ])
        })
        .collect::<Result<Vec<_>, MeshSieveError>>()?;

    let kept = assemble_nodes(&tags, &coords, first_global)
        .filter(|node| partition.pick(node.global_idx))
        .collect();
    Ok((kept, first_global + block.count))
}

/// Zip tags and coordinates positionally, numbering from `first_global`.
fn assemble_nodes<'a>(
    tags: &'a [usize],
    coords: &'a [[f64; 3]],
    first_global: usize,
) -> impl Iterator<Item = Node> + 'a {
    tags.iter()
        .zip(coords)
        .enumerate()
        .map(move |(i, (&tag, &x))| Node::new(tag, first_global + i, x))
}

/// Structural checks on the retained nodes of one rank.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeValidator {
    environment: NodeEnvironment,
}

impl NodeValidator {
    pub fn new(environment: NodeEnvironment) -> Self {
        Self { environment }
    }
}

impl Validator<Vec<Node>, NodeHeader> for NodeValidator {
    fn validate(&self, data: &Vec<Node>, header: &NodeHeader) -> Result<(), MeshSieveError> {
        let expected = self
            .environment
            .policy
            .expected_count(&self.environment.parallel, header.count);
        validate_nodes(data, header, expected)
    }
}

/// Check count, tag range and tag strides of `nodes`.
pub fn validate_nodes(
    nodes: &[Node],
    header: &NodeHeader,
    expected: usize,
) -> Result<(), MeshSieveError> {
    if nodes.len() != expected {
        return Err(MeshSieveError::RetainedCountMismatch {
            section: NODES.into(),
            expected,
            found: nodes.len(),
        });
    }

    let (lo, hi) = match nodes.iter().map(Node::natural_idx).minmax() {
        MinMaxResult::NoElements => return Ok(()),
        MinMaxResult::OneElement(tag) => (tag, tag),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    for tag in [lo, hi] {
        if tag < header.min_tag || tag > header.max_tag {
            return Err(MeshSieveError::RangeViolation {
                section: NODES.into(),
                tag,
                min_tag: header.min_tag,
                max_tag: header.max_tag,
            });
        }
    }

    validate_strides(nodes, header)
}

/// Dense headers require unit strides between sorted tags; sparse ones
/// require unique tags.
pub fn validate_strides(nodes: &[Node], header: &NodeHeader) -> Result<(), MeshSieveError> {
    let sorted: Vec<usize> = nodes.iter().map(Node::natural_idx).sorted_unstable().collect();
    let stride = |a: &usize, b: &usize| b - a;

    if header.expects_contiguous() {
        if !test_stride(&sorted, stride, 1) {
            return Err(MeshSieveError::ContiguityViolation(NODES.into()));
        }
    } else if sorted.iter().tuple_windows().any(|(a, b)| stride(a, b) == 0) {
        return Err(MeshSieveError::DuplicateIndex(NODES.into()));
    }
    Ok(())
}

/// Pipeline reading the Nodes section.
pub type NodeStrategy =
    SectionPipeline<NodeHeaderDecoder, NodeDataDecoder, NodeEnvironment, NodeValidator>;

/// Assemble the Nodes pipeline for `environment`.
pub fn node_strategy(environment: NodeEnvironment) -> NodeStrategy {
    SectionPipeline::new(
        NODES,
        NodeHeaderDecoder,
        NodeDataDecoder,
        environment,
        NodeValidator::new(environment),
    )
}

/// Read this rank's nodes from `stream`.
pub fn read_nodes<R: BufRead + Seek>(
    stream: &mut MeshStream<R>,
    mode: Mode,
    environment: NodeEnvironment,
) -> Result<Vec<Node>, MeshSieveError> {
    node_strategy(environment).read(stream, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(text: &str) -> MeshStream<Cursor<Vec<u8>>> {
        MeshStream::new(Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    fn header(count: usize, min_tag: usize, max_tag: usize) -> NodeHeader {
        NodeHeader {
            count,
            block_count: 1,
            min_tag,
            max_tag,
        }
    }

    fn nodes_with_tags(tags: &[usize]) -> Vec<Node> {
        tags.iter()
            .enumerate()
            .map(|(i, &t)| Node::new(t, i, [1.0, 2.0, 3.0]))
            .collect()
    }

    #[test]
    fn parse_node_header() {
        let mut s = stream("$Nodes\n1 2 7 5");
        let framer = SectionFramer::new(NODES, &mut s).unwrap();
        let hdr = NodeHeaderDecoder.decode(&framer, &mut s, Mode::Ascii).unwrap();
        assert_eq!(
            hdr,
            NodeHeader {
                count: 2,
                block_count: 1,
                min_tag: 7,
                max_tag: 5
            }
        );
    }

    #[test]
    fn parse_node_blocks_serial() {
        let mut s = stream(
            "$Nodes\n0 1 0 1\n1\n0 0 1\n1 1 0 5\n9\n10\n11\n12\n13\n0 0 0.1\n0 0 0.3\n0 0 0.5\n0 0 0.7\n0 0 0.8",
        );
        let framer = SectionFramer::new(NODES, &mut s).unwrap();
        let hdr = NodeHeader {
            count: 6,
            block_count: 2,
            min_tag: 1,
            max_tag: 13,
        };
        let env = NodeEnvironment::new(Parallel::serial(), PartitionPolicy::Serial);
        let nodes = NodeDataDecoder
            .decode(&framer, &mut s, Mode::Ascii, &hdr, &env)
            .unwrap();

        let tags: Vec<_> = nodes.iter().map(Node::natural_idx).collect();
        assert_eq!(tags, vec![1, 9, 10, 11, 12, 13]);
        let globals: Vec<_> = nodes.iter().map(Node::global_idx).collect();
        assert_eq!(globals, vec![0, 1, 2, 3, 4, 5]);
        let zs: Vec<_> = nodes.iter().map(|n| n.coords()).collect();
        assert_eq!(
            zs,
            vec![
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 0.1],
                [0.0, 0.0, 0.3],
                [0.0, 0.0, 0.5],
                [0.0, 0.0, 0.7],
                [0.0, 0.0, 0.8],
            ]
        );
        assert!(validate_nodes(&nodes, &hdr, 6).is_ok());
    }

    #[test]
    fn parametric_flag_is_nonzero() {
        let mut s = stream("$Nodes\n2 5 7 0\n");
        let framer = SectionFramer::new(NODES, &mut s).unwrap();
        let block = decode_block_header(&framer, &mut s, Mode::Ascii).unwrap();
        assert_eq!(
            block,
            NodeBlockHeader {
                dim: 2,
                tag: 5,
                parametric: true,
                count: 0
            }
        );
    }

    #[test]
    fn global_index_spans_blocks_for_every_rank() {
        let text = "$Nodes\n0 1 0 2\n1\n2\n0 0 0\n1 0 0\n1 1 0 3\n3\n4\n5\n2 0 0\n3 0 0\n4 0 0\n";
        for rank in 0..2 {
            let mut s = stream(text);
            let framer = SectionFramer::new(NODES, &mut s).unwrap();
            let hdr = NodeHeader {
                count: 5,
                block_count: 2,
                min_tag: 1,
                max_tag: 5,
            };
            let env = NodeEnvironment::new(Parallel::new(rank, 2).unwrap(), PartitionPolicy::Naive);
            let nodes = NodeDataDecoder
                .decode(&framer, &mut s, Mode::Ascii, &hdr, &env)
                .unwrap();
            for node in &nodes {
                assert_eq!(node.global_idx(), node.natural_idx() - 1);
                assert_eq!(node.coords()[0], node.global_idx() as f64);
            }
            let expect: Vec<usize> = if rank == 0 { vec![1, 2, 3] } else { vec![4, 5] };
            assert_eq!(nodes.iter().map(Node::natural_idx).collect::<Vec<_>>(), expect);
        }
    }

    #[test]
    fn validate_contiguous() {
        let nodes = nodes_with_tags(&[27, 28, 29]);
        assert!(validate_nodes(&nodes, &header(3, 27, 29), 3).is_ok());
        assert!(matches!(
            validate_nodes(&nodes, &header(3, 28, 29), 3),
            Err(MeshSieveError::RangeViolation { tag: 27, .. })
        ));
        assert!(matches!(
            validate_nodes(&nodes, &header(3, 27, 28), 3),
            Err(MeshSieveError::RangeViolation { tag: 29, .. })
        ));
    }

    #[test]
    fn validate_discontinuous() {
        let nodes = nodes_with_tags(&[27, 29, 31]);
        assert!(validate_nodes(&nodes, &header(3, 27, 31), 3).is_ok());
        assert!(validate_nodes(&nodes, &header(3, 28, 31), 3).is_err());
        assert!(validate_nodes(&nodes, &header(3, 27, 30), 3).is_err());

        let dup = nodes_with_tags(&[27, 29, 29]);
        assert_eq!(
            validate_nodes(&dup, &header(3, 27, 31), 3),
            Err(MeshSieveError::DuplicateIndex(NODES.into()))
        );
    }

    #[test]
    fn dense_header_with_gaps_is_rejected() {
        // Range [1, 4] covers 4 nodes but only 3 retained on this "rank".
        let nodes = nodes_with_tags(&[1, 2, 4]);
        assert_eq!(
            validate_strides(&nodes, &header(4, 1, 4)),
            Err(MeshSieveError::ContiguityViolation(NODES.into()))
        );
    }

    #[test]
    fn retained_count_is_checked_first() {
        let nodes = nodes_with_tags(&[1, 2]);
        assert_eq!(
            validate_nodes(&nodes, &header(3, 1, 3), 3),
            Err(MeshSieveError::RetainedCountMismatch {
                section: NODES.into(),
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn empty_share_is_valid() {
        assert!(validate_nodes(&[], &header(1, 1, 1), 0).is_ok());
    }
}
