//! The public error surface of the linker core.
//!
//! Every failure is a structured value; the core never signals through
//! the host environment. Per-module errors convert into [`LinkerError`]
//! at the public boundary.

use crate::assignment::SolverError;
use crate::scoring::ScoringError;
use crate::store::{FrameIndex, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Errors surfaced by the linker's frame step.
pub enum LinkerError {
    /// Frame indices are positive integers.
    #[error("Frame indices are positive; frame 0 is not a valid frame.")]
    ZeroFrameIndex,
    /// The supplied frame does not advance the linker.
    #[error("Frame {frame} does not advance past the last processed frame {last}.")]
    NonMonotonicFrame {
        /// The frame that was supplied.
        frame: FrameIndex,
        /// The last frame the linker processed.
        last: FrameIndex,
    },
    /// A detection lacks an attribute the options require.
    #[error("The detection at index {index} is missing the `{attribute}` attribute.")]
    MissingAttribute {
        /// Index of the detection within the frame.
        index: usize,
        /// Name of the missing attribute.
        attribute: String,
    },
    /// A pairwise score could not be computed.
    #[error("The pairwise score could not be computed: {0}")]
    Scoring(#[from] ScoringError),
    /// The cost matrix admits no assignment at all.
    #[error("The assignment problem is infeasible: {0}")]
    InfeasibleAssignment(SolverError),
    /// The solver rejected the cost matrix.
    #[error("The solver rejected the cost matrix: {0}")]
    SolverRejected(SolverError),
    /// A track store edit failed.
    #[error("The track store rejected an edit: {0}")]
    Store(#[from] StoreError),
}

impl From<SolverError> for LinkerError {
    fn from(error: SolverError) -> Self {
        match error {
            SolverError::InfeasibleAssignment => LinkerError::InfeasibleAssignment(error),
            _ => LinkerError::SolverRejected(error),
        }
    }
}
