//! Collective reductions over a group of worker ranks.
//!
//! Rank 0 is the collector: gathers, sums, and averages land there while the
//! other ranks receive empty outputs. Every routine is a blocking collective
//! and must be called on all ranks of the group in the same order with
//! semantically aligned inputs.
//!
//! The routines are generic over a [`Communicator`], which exposes the
//! standard message-passing primitives (rank/size query, gather, gatherv,
//! allgather, reduce-sum). [`local::LocalGroup`] runs a group in-process on
//! scoped threads, which is how the test suite exercises multi-rank
//! behavior; the `mpi` cargo feature adds an rsmpi-backed communicator for
//! real multi-process runs.
//!
//! Precondition violations (short inputs, unequal lengths, mismatched bin
//! spacings) are detected on every rank, either locally or from allgathered
//! metadata, so a failing call cannot strand compliant ranks inside a
//! collective.

pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;

use crate::error::{Error, Result};

/// Tolerance used when comparing per-rank bin spacings.
const BIN_SPACING_TOL: f64 = 1e-6;

/// The message-passing primitives the reduction routines are built on.
///
/// Gathers and sums collect at rank 0 and return empty vectors elsewhere;
/// allgathers return the full vector on every rank. The element-wise sums
/// require equal-length inputs on all ranks, which the public routines
/// validate before calling them.
pub trait Communicator {
    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// This rank's index in `0..size`.
    fn rank(&self) -> usize;

    fn gather_i32(&self, value: i32) -> Result<Vec<i32>>;
    fn gather_f64(&self, value: f64) -> Result<Vec<f64>>;
    fn gather_vec_i32(&self, values: &[i32]) -> Result<Vec<i32>>;
    fn gather_vec_f64(&self, values: &[f64]) -> Result<Vec<f64>>;
    fn allgather_u64(&self, value: u64) -> Result<Vec<u64>>;
    fn allgather_f64(&self, value: f64) -> Result<Vec<f64>>;
    fn sum_i32(&self, values: &[i32]) -> Result<Vec<i32>>;
    fn sum_f64(&self, values: &[f64]) -> Result<Vec<f64>>;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// Scalar types the typed reductions operate on (`i32` and `f64`).
pub trait CommValue: Copy + sealed::Sealed {
    fn gather_value<C: Communicator + ?Sized>(comm: &C, value: Self) -> Result<Vec<Self>>;
    fn gather_slice<C: Communicator + ?Sized>(comm: &C, values: &[Self]) -> Result<Vec<Self>>;
    fn sum_slices<C: Communicator + ?Sized>(comm: &C, values: &[Self]) -> Result<Vec<Self>>;
}

impl CommValue for i32 {
    fn gather_value<C: Communicator + ?Sized>(comm: &C, value: Self) -> Result<Vec<Self>> {
        comm.gather_i32(value)
    }
    fn gather_slice<C: Communicator + ?Sized>(comm: &C, values: &[Self]) -> Result<Vec<Self>> {
        comm.gather_vec_i32(values)
    }
    fn sum_slices<C: Communicator + ?Sized>(comm: &C, values: &[Self]) -> Result<Vec<Self>> {
        comm.sum_i32(values)
    }
}

impl CommValue for f64 {
    fn gather_value<C: Communicator + ?Sized>(comm: &C, value: Self) -> Result<Vec<Self>> {
        comm.gather_f64(value)
    }
    fn gather_slice<C: Communicator + ?Sized>(comm: &C, values: &[Self]) -> Result<Vec<Self>> {
        comm.gather_vec_f64(values)
    }
    fn sum_slices<C: Communicator + ?Sized>(comm: &C, values: &[Self]) -> Result<Vec<Self>> {
        comm.sum_f64(values)
    }
}

/// Gather one value per rank. Rank 0 receives `[v_0, v_1, ..., v_{n-1}]`
/// with rank i's value at index i; other ranks receive an empty vector.
pub fn gather_values<T: CommValue, C: Communicator + ?Sized>(comm: &C, value: T) -> Result<Vec<T>> {
    T::gather_value(comm, value)
}

/// Concatenate per-rank vectors in rank order on rank 0. Per-rank lengths
/// may differ; other ranks receive an empty vector.
pub fn gather_vectors<T: CommValue, C: Communicator + ?Sized>(
    comm: &C,
    values: &[T],
) -> Result<Vec<T>> {
    T::gather_slice(comm, values)
}

/// Element-wise sum across ranks, collected on rank 0.
///
/// All ranks must supply vectors of equal length; unequal lengths fail with
/// `LengthMismatch` on every rank.
pub fn calc_vector_sum<T: CommValue, C: Communicator + ?Sized>(
    comm: &C,
    values: &[T],
) -> Result<Vec<T>> {
    check_equal_lengths(comm, values.len())?;
    T::sum_slices(comm, values)
}

/// Element-wise mean across ranks, collected on rank 0. Same length
/// requirement as [`calc_vector_sum`].
pub fn calc_vector_avg<C: Communicator + ?Sized>(comm: &C, values: &[f64]) -> Result<Vec<f64>> {
    check_equal_lengths(comm, values.len())?;
    let sums = comm.sum_f64(values)?;
    if comm.rank() != 0 {
        return Ok(Vec::new());
    }
    let n = comm.size() as f64;
    Ok(sums.into_iter().map(|s| s / n).collect())
}

/// Average `(bin_center, value)` pairs across ranks on the union grid.
///
/// Each rank's input needs at least two entries and constant bin spacing,
/// equal across ranks within a small tolerance; violations fail with
/// `InvalidArgument` on every rank. Bins missing on a rank contribute 0, and
/// the values are averaged over the group size. Rank 0 receives the result;
/// other ranks receive an empty vector.
pub fn calc_pair_vector_avg<C: Communicator + ?Sized>(
    comm: &C,
    pairs: &[(f64, f64)],
) -> Result<Vec<(f64, f64)>> {
    let grid = AlignedGrid::build(comm, pairs)?;
    let mut padded = grid.zeroed()?;
    for &(center, value) in pairs {
        padded[grid.index(center)] += value;
    }
    let sums = comm.sum_f64(&padded)?;
    if comm.rank() != 0 {
        return Ok(Vec::new());
    }
    let n = comm.size() as f64;
    Ok(sums
        .into_iter()
        .enumerate()
        .map(|(i, s)| (grid.center(i), s / n))
        .collect())
}

/// Average `(bin_center, count)` histograms across ranks into a probability
/// histogram on the union grid.
///
/// Same alignment preconditions as [`calc_pair_vector_avg`]. Counts are
/// summed across ranks and normalized by the total count, so the second
/// fields of the rank-0 result sum to 1.
pub fn calc_prob_hist_avg<C: Communicator + ?Sized>(
    comm: &C,
    hist: &[(f64, u64)],
) -> Result<Vec<(f64, f64)>> {
    let centers: Vec<(f64, f64)> = hist.iter().map(|&(c, n)| (c, n as f64)).collect();
    let grid = AlignedGrid::build(comm, &centers)?;
    let mut padded = grid.zeroed()?;
    for &(center, count) in &centers {
        padded[grid.index(center)] += count;
    }
    let sums = comm.sum_f64(&padded)?;
    if comm.rank() != 0 {
        return Ok(Vec::new());
    }
    let total: f64 = sums.iter().sum();
    if total <= 0.0 {
        return Err(Error::InvalidArgument(
            "histogram has no counts to normalize".to_string(),
        ));
    }
    Ok(sums
        .into_iter()
        .enumerate()
        .map(|(i, s)| (grid.center(i), s / total))
        .collect())
}

/// Bin integer samples into a `(bin_center, count)` histogram with bins of
/// width `bin_size`; the center of a width-1 bin is the value itself.
pub fn calculate_hist(data: &[i32], bin_size: i32) -> Result<Vec<(f64, u64)>> {
    if data.is_empty() {
        return Err(Error::InvalidArgument(
            "cannot build a histogram from empty data".to_string(),
        ));
    }
    if bin_size <= 0 {
        return Err(Error::InvalidArgument(format!(
            "bin size must be > 0, got {bin_size}"
        )));
    }
    let min = *data.iter().min().unwrap_or(&0);
    let max = *data.iter().max().unwrap_or(&0);
    let n_bins = ((max - min) / bin_size + 1) as usize;
    let mut counts = Vec::new();
    counts
        .try_reserve_exact(n_bins)
        .map_err(|_| Error::AllocationFailure(format!("cannot size {n_bins} histogram bins")))?;
    counts.resize(n_bins, 0u64);
    for &v in data {
        counts[((v - min) / bin_size) as usize] += 1;
    }
    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| ((min + bin_size * i as i32) as f64, n))
        .collect())
}

/// Fail with `LengthMismatch` on every rank unless all per-rank lengths are
/// equal. Uses an allgather so the verdict is symmetric.
fn check_equal_lengths<C: Communicator + ?Sized>(comm: &C, len: usize) -> Result<()> {
    let lengths = comm.allgather_u64(len as u64)?;
    if lengths.iter().any(|&l| l != len as u64) {
        return Err(Error::LengthMismatch(format!(
            "per-rank vector lengths {lengths:?} are not all equal"
        )));
    }
    Ok(())
}

/// The union bin grid shared by all ranks of an aligned-bin reduction.
struct AlignedGrid {
    min: f64,
    spacing: f64,
    n_bins: usize,
}

impl AlignedGrid {
    /// Validate the local bin centers and agree on the union grid.
    ///
    /// Checks, in order: at least two local entries; constant local spacing;
    /// spacing equal across ranks within [`BIN_SPACING_TOL`]. The global
    /// range is the union of the allgathered per-rank ranges.
    fn build<C: Communicator + ?Sized>(comm: &C, pairs: &[(f64, f64)]) -> Result<Self> {
        if pairs.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "aligned-bin reduction needs at least 2 entries per rank, got {}",
                pairs.len()
            )));
        }
        let spacing = pairs[1].0 - pairs[0].0;
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "bin spacing must be finite and > 0, got {spacing}"
            )));
        }
        for w in pairs.windows(2) {
            if ((w[1].0 - w[0].0) - spacing).abs() > BIN_SPACING_TOL {
                return Err(Error::InvalidArgument(
                    "bin spacing is not constant within this rank's input".to_string(),
                ));
            }
        }
        let spacings = comm.allgather_f64(spacing)?;
        if spacings.iter().any(|&s| (s - spacing).abs() > BIN_SPACING_TOL) {
            return Err(Error::InvalidArgument(format!(
                "bin spacings {spacings:?} differ across ranks"
            )));
        }
        let first = pairs[0].0;
        let last = pairs[pairs.len() - 1].0;
        let min = comm
            .allgather_f64(first)?
            .into_iter()
            .fold(f64::INFINITY, f64::min);
        let max = comm
            .allgather_f64(last)?
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        let n_bins = ((max - min) / spacing).round() as usize + 1;
        Ok(Self {
            min,
            spacing,
            n_bins,
        })
    }

    /// Index of the bin whose center is `x` on the union grid.
    #[inline]
    fn index(&self, x: f64) -> usize {
        ((x - self.min) / self.spacing).round() as usize
    }

    /// Center of bin `i` on the union grid.
    #[inline]
    fn center(&self, i: usize) -> f64 {
        self.min + self.spacing * i as f64
    }

    /// Zero-filled accumulation buffer covering the union grid.
    fn zeroed(&self) -> Result<Vec<f64>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(self.n_bins).map_err(|_| {
            Error::AllocationFailure(format!("cannot size {} reduction bins", self.n_bins))
        })?;
        buf.resize(self.n_bins, 0.0);
        Ok(buf)
    }
}
