//! MPI-backed communicator (rsmpi).
//!
//! Wraps an MPI world communicator so the reduction routines run across real
//! worker processes. The MPI universe outlives the wrapper:
//!
//! ```ignore
//! let universe = ::mpi::initialize().expect("MPI initialized once");
//! let comm = MpiComm::from_world(universe.world());
//! let ids = kmcsim::reduce::gather_values(&comm, comm.rank() as i32)?;
//! ```

use super::Communicator;
use crate::error::{Error, Result};
use mpi::collective::SystemOperation;
use mpi::datatype::PartitionMut;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator as _, CommunicatorCollectives, Root};
use mpi::Count;

/// The collector rank.
const ROOT: i32 = 0;

/// A [`Communicator`] over an MPI world.
pub struct MpiComm {
    world: SimpleCommunicator,
}

impl MpiComm {
    /// Wrap a world communicator obtained from the MPI universe.
    pub fn from_world(world: SimpleCommunicator) -> Self {
        Self { world }
    }
}

fn sized_buffer<T: Default + Clone>(n: usize) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(n).map_err(|_| {
        Error::AllocationFailure(format!("cannot size collective buffer of {n} elements"))
    })?;
    buf.resize(n, T::default());
    Ok(buf)
}

macro_rules! mpi_collectives {
    ($t:ty, $gather:ident, $gather_vec:ident, $sum:ident) => {
        fn $gather(&self, value: $t) -> Result<Vec<$t>> {
            let root = self.world.process_at_rank(ROOT);
            if self.world.rank() == ROOT {
                let mut buf = sized_buffer::<$t>(self.size())?;
                root.gather_into_root(&value, &mut buf[..]);
                Ok(buf)
            } else {
                root.gather_into(&value);
                Ok(Vec::new())
            }
        }

        fn $gather_vec(&self, values: &[$t]) -> Result<Vec<$t>> {
            let root = self.world.process_at_rank(ROOT);
            let count = values.len() as Count;
            if self.world.rank() == ROOT {
                let mut counts = sized_buffer::<Count>(self.size())?;
                root.gather_into_root(&count, &mut counts[..]);
                let displs: Vec<Count> = counts
                    .iter()
                    .scan(0, |acc, &c| {
                        let d = *acc;
                        *acc += c;
                        Some(d)
                    })
                    .collect();
                let total: Count = counts.iter().sum();
                let mut buf = sized_buffer::<$t>(total as usize)?;
                {
                    let mut partition = PartitionMut::new(&mut buf[..], counts, &displs[..]);
                    root.gather_varcount_into_root(values, &mut partition);
                }
                Ok(buf)
            } else {
                root.gather_into(&count);
                root.gather_varcount_into(values);
                Ok(Vec::new())
            }
        }

        fn $sum(&self, values: &[$t]) -> Result<Vec<$t>> {
            let root = self.world.process_at_rank(ROOT);
            if self.world.rank() == ROOT {
                let mut buf = sized_buffer::<$t>(values.len())?;
                root.reduce_into_root(values, &mut buf[..], SystemOperation::sum());
                Ok(buf)
            } else {
                root.reduce_into(values, SystemOperation::sum());
                Ok(Vec::new())
            }
        }
    };
}

impl Communicator for MpiComm {
    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    mpi_collectives!(i32, gather_i32, gather_vec_i32, sum_i32);
    mpi_collectives!(f64, gather_f64, gather_vec_f64, sum_f64);

    fn allgather_u64(&self, value: u64) -> Result<Vec<u64>> {
        let mut buf = sized_buffer::<u64>(self.size())?;
        self.world.all_gather_into(&value, &mut buf[..]);
        Ok(buf)
    }

    fn allgather_f64(&self, value: f64) -> Result<Vec<f64>> {
        let mut buf = sized_buffer::<f64>(self.size())?;
        self.world.all_gather_into(&value, &mut buf[..]);
        Ok(buf)
    }
}
