#![allow(dead_code)]
use std::path::PathBuf;

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Write `bytes` to a per-process file in the temp dir and return its path.
pub fn temp_mesh(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "mesh-sieve-gmsh-{}-{name}.msh",
        std::process::id()
    ));
    std::fs::write(&path, bytes).unwrap();
    path
}

pub struct NodeBlock {
    pub dim: i32,
    pub tag: i32,
    pub nodes: Vec<(usize, [f64; 3])>,
}

pub struct ElementBlock {
    pub dim: i32,
    pub tag: i32,
    pub element_type: i32,
    pub elements: Vec<(usize, Vec<usize>)>,
}

/// Same mesh as `fixtures/box-txt.msh`.
pub fn box_nodes() -> Vec<NodeBlock> {
    vec![
        NodeBlock {
            dim: 3,
            tag: 1,
            nodes: vec![
                (1, [0.0, 0.0, 0.0]),
                (2, [1.0, 0.0, 0.0]),
                (3, [0.0, 1.0, 0.0]),
            ],
        },
        NodeBlock {
            dim: 3,
            tag: 1,
            nodes: vec![(4, [0.0, 0.0, 1.0]), (5, [1.0, 1.0, 1.0])],
        },
    ]
}

pub fn box_elements() -> Vec<ElementBlock> {
    let points = (1..=5).map(|t| (t, vec![t])).collect();
    let lines = [(1, 2), (1, 3), (1, 4), (2, 3), (3, 4), (4, 2), (2, 5), (3, 5), (4, 5)]
        .iter()
        .zip(6..)
        .map(|(&(a, b), tag)| (tag, vec![a, b]))
        .collect();
    let tris = [
        [1, 2, 3],
        [1, 3, 4],
        [1, 4, 2],
        [2, 3, 4],
        [2, 5, 3],
        [3, 5, 4],
        [4, 5, 2],
    ]
    .iter()
    .zip(15..)
    .map(|(nodes, tag)| (tag, nodes.to_vec()))
    .collect();
    vec![
        ElementBlock { dim: 0, tag: 1, element_type: 15, elements: points },
        ElementBlock { dim: 1, tag: 2, element_type: 1, elements: lines },
        ElementBlock { dim: 2, tag: 3, element_type: 2, elements: tris },
        ElementBlock {
            dim: 3,
            tag: 3,
            element_type: 4,
            elements: vec![(22, vec![1, 2, 3, 4]), (23, vec![2, 3, 4, 5])],
        },
    ]
}

/// Native-endian GMSH 4.1 binary mesh builder.
pub struct BinaryMesh {
    buf: Vec<u8>,
}

impl BinaryMesh {
    pub fn new() -> Self {
        Self::with_float_width(8)
    }

    pub fn with_float_width(width: usize) -> Self {
        let mut buf = format!("$MeshFormat\n4.1 1 {width}\n").into_bytes();
        buf.extend_from_slice(&1i32.to_ne_bytes());
        buf.extend_from_slice(b"\n$EndMeshFormat\n");
        Self { buf }
    }

    fn size(&mut self, v: usize) {
        self.buf.extend_from_slice(&v.to_ne_bytes());
    }

    fn int(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_ne_bytes());
    }

    fn header<I: Iterator<Item = usize> + Clone>(&mut self, blocks: usize, tags: I) {
        self.size(blocks);
        self.size(tags.clone().count());
        self.size(tags.clone().min().unwrap_or(0));
        self.size(tags.max().unwrap_or(0));
    }

    pub fn nodes(mut self, blocks: &[NodeBlock]) -> Self {
        // The newline after the sigil is the reserved byte.
        self.buf.extend_from_slice(b"$Nodes\n");
        self.header(
            blocks.len(),
            blocks.iter().flat_map(|b| b.nodes.iter().map(|n| n.0)),
        );
        for block in blocks {
            self.int(block.dim);
            self.int(block.tag);
            self.int(0);
            self.size(block.nodes.len());
            for (tag, _) in &block.nodes {
                self.size(*tag);
            }
            for (_, x) in &block.nodes {
                for c in x {
                    self.buf.extend_from_slice(&c.to_ne_bytes());
                }
            }
        }
        self.buf.extend_from_slice(b"\n$EndNodes\n");
        self
    }

    pub fn elements(mut self, blocks: &[ElementBlock]) -> Self {
        self.buf.extend_from_slice(b"$Elements\n");
        self.header(
            blocks.len(),
            blocks.iter().flat_map(|b| b.elements.iter().map(|e| e.0)),
        );
        for block in blocks {
            self.int(block.dim);
            self.int(block.tag);
            self.int(block.element_type);
            self.size(block.elements.len());
            for (tag, nodes) in &block.elements {
                self.size(*tag);
                for n in nodes {
                    self.size(*n);
                }
            }
        }
        self.buf.extend_from_slice(b"\n$EndElements\n");
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
