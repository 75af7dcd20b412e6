use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for the simulation core and the reduction layer.
///
/// Each variant carries enough context to be actionable; nothing is silently
/// recovered, and engine counters are never advanced on a failed operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Attempt to place an object on an occupied site, or to move one onto it.
    #[error("occupancy violation: {0}")]
    OccupancyViolation(String),

    /// `choose_next_event` was called with no pending events.
    #[error("no pending events in the event set")]
    EmptyEventSet,

    /// Reduction inputs of unequal length where equality is required.
    #[error("length mismatch: {0}")]
    LengthMismatch(String),

    /// Invalid user or API parameter (short reduction inputs, mismatched bin
    /// spacings, out-of-range coordinates on a non-periodic axis, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A gather buffer in the reduction layer could not be sized.
    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    /// Propagated I/O errors (log sink writes).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
