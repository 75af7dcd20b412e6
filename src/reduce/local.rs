//! In-process communicator group.
//!
//! [`LocalGroup`] stands up N ranks inside one process, synchronized with a
//! reusable barrier and mutexed exchange slots. It gives the reduction
//! routines real multi-rank semantics under plain `cargo test`, with one
//! thread per rank; production multi-process runs go through the `mpi`
//! feature instead.
//!
//! Collectives follow a deposit / barrier / read / barrier protocol, so a
//! rank's slot is never rewritten before every reader is done with it. As
//! with MPI, every rank must call each collective in the same order;
//! asserting inside a worker closure between collectives can strand the
//! other ranks at a barrier, so tests should return values and assert on
//! the main thread.

use super::Communicator;
use crate::error::{Error, Result};
use std::sync::{Arc, Barrier, Mutex, MutexGuard};

struct Shared {
    size: usize,
    barrier: Barrier,
    slots_i32: Mutex<Vec<Vec<i32>>>,
    slots_f64: Mutex<Vec<Vec<f64>>>,
    slots_u64: Mutex<Vec<Vec<u64>>>,
}

/// One rank's endpoint of an in-process group.
pub struct LocalComm {
    rank: usize,
    shared: Arc<Shared>,
}

/// Factory for in-process rank groups.
pub struct LocalGroup;

impl LocalGroup {
    /// Create the endpoints of a `size`-rank group, rank i at index i.
    pub fn split(size: usize) -> Result<Vec<LocalComm>> {
        if size == 0 {
            return Err(Error::InvalidArgument(
                "communicator group size must be >= 1".to_string(),
            ));
        }
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size),
            slots_i32: Mutex::new(vec![Vec::new(); size]),
            slots_f64: Mutex::new(vec![Vec::new(); size]),
            slots_u64: Mutex::new(vec![Vec::new(); size]),
        });
        Ok((0..size)
            .map(|rank| LocalComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }

    /// Run `f` once per rank on scoped threads and collect the return values
    /// in rank order.
    pub fn run<T, F>(size: usize, f: F) -> Result<Vec<T>>
    where
        F: Fn(&LocalComm) -> T + Sync,
        T: Send,
    {
        let comms = Self::split(size)?;
        let mut results: Vec<Option<T>> = (0..size).map(|_| None).collect();
        std::thread::scope(|scope| {
            for (slot, comm) in results.iter_mut().zip(&comms) {
                let f = &f;
                scope.spawn(move || {
                    *slot = Some(f(comm));
                });
            }
        });
        results
            .into_iter()
            .map(|r| {
                r.ok_or_else(|| {
                    Error::InvalidArgument("a group worker did not complete".to_string())
                })
            })
            .collect()
    }
}

impl LocalComm {
    fn lock_i32(&self) -> Result<MutexGuard<'_, Vec<Vec<i32>>>> {
        self.shared
            .slots_i32
            .lock()
            .map_err(|_| Error::InvalidArgument("communicator state poisoned".to_string()))
    }

    fn lock_f64(&self) -> Result<MutexGuard<'_, Vec<Vec<f64>>>> {
        self.shared
            .slots_f64
            .lock()
            .map_err(|_| Error::InvalidArgument("communicator state poisoned".to_string()))
    }

    fn lock_u64(&self) -> Result<MutexGuard<'_, Vec<Vec<u64>>>> {
        self.shared
            .slots_u64
            .lock()
            .map_err(|_| Error::InvalidArgument("communicator state poisoned".to_string()))
    }

    fn concat_at_root<T: Copy>(&self, slots: &[Vec<T>]) -> Result<Vec<T>> {
        let total: usize = slots.iter().map(|s| s.len()).sum();
        let mut out = Vec::new();
        out.try_reserve_exact(total).map_err(|_| {
            Error::AllocationFailure(format!("cannot size gather buffer of {total} elements"))
        })?;
        for s in slots {
            out.extend_from_slice(s);
        }
        Ok(out)
    }

    fn sum_at_root<T>(&self, slots: &[Vec<T>]) -> Result<Vec<T>>
    where
        T: Copy + Default + std::ops::AddAssign,
    {
        let n = slots[0].len();
        if slots.iter().any(|s| s.len() != n) {
            return Err(Error::LengthMismatch(
                "element-wise sum over unequal vector lengths".to_string(),
            ));
        }
        let mut out = Vec::new();
        out.try_reserve_exact(n).map_err(|_| {
            Error::AllocationFailure(format!("cannot size reduce buffer of {n} elements"))
        })?;
        out.resize(n, T::default());
        for s in slots {
            for (acc, &v) in out.iter_mut().zip(s) {
                *acc += v;
            }
        }
        Ok(out)
    }
}

macro_rules! local_collectives {
    ($lock:ident, $t:ty, $gather:ident, $gather_vec:ident, $sum:ident) => {
        fn $gather(&self, value: $t) -> Result<Vec<$t>> {
            self.$gather_vec(&[value])
        }

        fn $gather_vec(&self, values: &[$t]) -> Result<Vec<$t>> {
            {
                let mut slots = self.$lock()?;
                slots[self.rank].clear();
                slots[self.rank].extend_from_slice(values);
            }
            self.shared.barrier.wait();
            let result = if self.rank == 0 {
                self.$lock()
                    .and_then(|slots| self.concat_at_root(slots.as_slice()))
            } else {
                Ok(Vec::new())
            };
            self.shared.barrier.wait();
            result
        }

        fn $sum(&self, values: &[$t]) -> Result<Vec<$t>> {
            {
                let mut slots = self.$lock()?;
                slots[self.rank].clear();
                slots[self.rank].extend_from_slice(values);
            }
            self.shared.barrier.wait();
            let result = if self.rank == 0 {
                self.$lock()
                    .and_then(|slots| self.sum_at_root(slots.as_slice()))
            } else {
                Ok(Vec::new())
            };
            self.shared.barrier.wait();
            result
        }
    };
}

impl Communicator for LocalComm {
    fn size(&self) -> usize {
        self.shared.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    local_collectives!(lock_i32, i32, gather_i32, gather_vec_i32, sum_i32);
    local_collectives!(lock_f64, f64, gather_f64, gather_vec_f64, sum_f64);

    fn allgather_u64(&self, value: u64) -> Result<Vec<u64>> {
        {
            let mut slots = self.lock_u64()?;
            slots[self.rank].clear();
            slots[self.rank].push(value);
        }
        self.shared.barrier.wait();
        let result = self
            .lock_u64()
            .and_then(|slots| self.concat_at_root(slots.as_slice()));
        self.shared.barrier.wait();
        result
    }

    fn allgather_f64(&self, value: f64) -> Result<Vec<f64>> {
        {
            let mut slots = self.lock_f64()?;
            slots[self.rank].clear();
            slots[self.rank].push(value);
        }
        self.shared.barrier.wait();
        let result = self
            .lock_f64()
            .and_then(|slots| self.concat_at_root(slots.as_slice()));
        self.shared.barrier.wait();
        result
    }
}
