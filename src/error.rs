use std::collections::TryReserveError;

/// Errors surfaced by matcher operations.
///
/// Malformed instruction streams (an unrecognized opcode tag, a
/// `StringLen` word in the wrong place, a mismatched backtrack frame) are
/// bugs in the pattern compiler rather than runtime conditions, and panic
/// instead of producing one of these variants.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An operation that needs a successful prior match was called while no
    /// match was available.
    #[error("no match available; a successful find is required first")]
    InvalidState,
    /// A capture-group index or search start position was outside the valid
    /// range.
    #[error("index {index} out of bounds (limit {limit})")]
    IndexOutOfBounds { index: usize, limit: usize },
    /// The backtrack stack could not be grown.
    #[error("failed to grow the backtrack stack")]
    OutOfMemory(#[from] TryReserveError),
    /// The backtrack stack hit the cell limit configured through
    /// [`Config::backtrack_limit`](crate::matcher::Config).
    #[error("backtrack stack exceeded the limit of {limit} cells")]
    StackLimit { limit: usize },
}
