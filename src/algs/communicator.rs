//! Description of the parallel environment a rank reads under.
//!
//! Readers never talk to other ranks: each one only needs to know *which*
//! rank it is and how many ranks share the work. That knowledge is carried by
//! the plain [`Parallel`] descriptor, obtained from anything implementing the
//! minimal [`Communicator`] trait (the serial [`NoComm`], a hand-built
//! descriptor, or an initialised MPI world with `mpi-support`).

use crate::mesh_error::MeshSieveError;
use serde::{Deserialize, Serialize};

/// Rank/size query interface.
pub trait Communicator {
    /// ID of this processing element.
    fn rank(&self) -> usize;
    /// Number of processing elements.
    fn size(&self) -> usize;

    /// Snapshot this communicator as a [`Parallel`] descriptor.
    fn parallel(&self) -> Result<Parallel, MeshSieveError> {
        Parallel::new(self.rank(), self.size())
    }
}

/// Compile-time no-op comm for pure serial runs and unit tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
}

/// `{rank, size}` of the parallel environment, read-only for a whole parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawParallel")]
pub struct Parallel {
    rank: usize,
    size: usize,
}

impl Parallel {
    /// Build a descriptor, rejecting `size == 0` and `rank >= size`.
    pub fn new(rank: usize, size: usize) -> Result<Self, MeshSieveError> {
        if size == 0 || rank >= size {
            return Err(MeshSieveError::InvalidParallel { rank, size });
        }
        Ok(Self { rank, size })
    }

    /// The single-rank environment.
    pub const fn serial() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// ID of this rank.
    #[inline]
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }
}

/// Unchecked wire form of [`Parallel`].
#[derive(Deserialize)]
struct RawParallel {
    rank: usize,
    size: usize,
}

impl TryFrom<RawParallel> for Parallel {
    type Error = MeshSieveError;

    fn try_from(raw: RawParallel) -> Result<Self, Self::Error> {
        Parallel::new(raw.rank, raw.size)
    }
}

impl Default for Parallel {
    fn default() -> Self {
        Self::serial()
    }
}

impl Communicator for Parallel {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::traits::Communicator as _;

    /// Adapter exposing an already-initialised MPI communicator.
    pub struct MpiComm<C: mpi::traits::Communicator> {
        comm: C,
    }

    impl<C: mpi::traits::Communicator> MpiComm<C> {
        pub fn new(comm: C) -> Self {
            Self { comm }
        }
    }

    impl<C: mpi::traits::Communicator> Communicator for MpiComm<C> {
        fn rank(&self) -> usize {
            self.comm.rank() as usize
        }
        fn size(&self) -> usize {
            self.comm.size() as usize
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
