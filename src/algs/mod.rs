//! Parallel descriptors and record-ownership partitions.

pub mod communicator;
pub mod partition;

pub use communicator::{Communicator, NoComm, Parallel};
pub use partition::{AnyPartition, NaivePartition, Partition, PartitionPolicy};
