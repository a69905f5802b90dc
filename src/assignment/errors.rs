//! Submodule providing the errors enumeration shared by the assignment
//! solvers.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Errors that can occur while solving an assignment problem.
pub enum SolverError {
    /// The cost matrix has no rows or no columns.
    #[error("The cost matrix is empty.")]
    EmptyMatrix,
    /// The cost matrix contains NaN entries.
    #[error("The cost matrix contains NaN entries.")]
    NanCosts,
    /// The cost matrix contains negative entries.
    #[error("The cost matrix contains negative entries.")]
    NegativeCosts,
    /// Every entry of the cost matrix is infinite.
    #[error("Every cost in the matrix is infinite; no assignment is possible.")]
    InfeasibleAssignment,
    /// The augmenting-path search failed to terminate.
    #[error("The augmenting-path search did not converge.")]
    DidNotConverge,
    /// The solver name is not recognized.
    #[error("The solver `{0}` is not recognized.")]
    UnknownSolver(String),
}
