//! Record-ownership predicates for distributed reads.
//!
//! Every rank decodes the full section and keeps only the records whose
//! zero-based global index its [`Partition`] picks. For any `size ≥ 1` the
//! picks of ranks `0..size` over `[0, n)` are pairwise disjoint and cover the
//! whole range, so the union of all ranks' output is exactly the section.

use crate::algs::communicator::Parallel;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Ownership predicate over global record indices.
pub trait Partition {
    /// Whether the record with global index `idx` belongs to this rank.
    fn pick(&self, idx: usize) -> bool;
}

/// Rejects every record. Placeholder partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RejectAll;

impl Partition for RejectAll {
    #[inline]
    fn pick(&self, _idx: usize) -> bool {
        false
    }
}

/// Accepts every record, for single-rank runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SerialPartition;

impl Partition for SerialPartition {
    #[inline]
    fn pick(&self, _idx: usize) -> bool {
        true
    }
}

/// Equal contiguous split across ranks; the remainder goes one record each
/// to the lowest ranks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NaivePartition {
    local_start: usize,
    local_count: usize,
}

impl NaivePartition {
    /// Split `n` records across `parallel.size()` ranks and keep this rank's
    /// share.
    pub fn new(parallel: &Parallel, n: usize) -> Self {
        let (rank, size) = (parallel.rank(), parallel.size());
        let base = n / size;
        let remainder = n - size * base;

        let (local_start, local_count) = if rank < remainder {
            (rank * base + rank, base + 1)
        } else {
            (rank * base + remainder, base)
        };
        Self {
            local_start,
            local_count,
        }
    }

    /// Number of records owned by this rank.
    #[inline]
    pub fn size(&self) -> usize {
        self.local_count
    }

    /// First global index owned by this rank.
    #[inline]
    pub fn start(&self) -> usize {
        self.local_start
    }

    /// Half-open range of owned global indices.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.local_start..self.local_start + self.local_count
    }
}

impl Partition for NaivePartition {
    #[inline]
    fn pick(&self, idx: usize) -> bool {
        idx >= self.local_start && idx < self.local_start + self.local_count
    }
}

/// Runtime choice of partition policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionPolicy {
    /// Keep nothing.
    Reject,
    /// Keep everything, whatever the rank count.
    Serial,
    /// Contiguous equal split, see [`NaivePartition`].
    #[default]
    Naive,
}

impl PartitionPolicy {
    /// Instantiate the policy for `n` records.
    pub fn build(self, parallel: &Parallel, n: usize) -> AnyPartition {
        match self {
            PartitionPolicy::Reject => AnyPartition::Reject(RejectAll),
            PartitionPolicy::Serial => AnyPartition::Serial(SerialPartition),
            PartitionPolicy::Naive => AnyPartition::Naive(NaivePartition::new(parallel, n)),
        }
    }

    /// Number of records a rank is expected to retain out of `n`.
    pub fn expected_count(self, parallel: &Parallel, n: usize) -> usize {
        match self {
            PartitionPolicy::Reject => 0,
            PartitionPolicy::Serial => n,
            PartitionPolicy::Naive => NaivePartition::new(parallel, n).size(),
        }
    }
}

/// Closed set of partitions selected by [`PartitionPolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnyPartition {
    Reject(RejectAll),
    Serial(SerialPartition),
    Naive(NaivePartition),
}

impl Partition for AnyPartition {
    #[inline]
    fn pick(&self, idx: usize) -> bool {
        match self {
            AnyPartition::Reject(p) => p.pick(idx),
            AnyPartition::Serial(p) => p.pick(idx),
            AnyPartition::Naive(p) => p.pick(idx),
        }
    }
}
