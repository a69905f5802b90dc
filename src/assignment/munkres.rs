//! Submodule providing the classical Munkres (Hungarian) six-step solver
//! for dense square cost matrices.
//!
//! Used as a fallback when explicitly selected; it produces the same
//! minimum cost as the Jonker–Volgenant solver but may break ties
//! differently.

mod inner;

use ndarray::Array2;

use super::{LapCost, SolverError};

/// Solves a square, all-finite cost matrix, returning the assigned column
/// for every row.
pub(crate) fn solve_square<T: LapCost>(costs: &Array2<T>) -> Result<Vec<usize>, SolverError> {
    debug_assert_eq!(
        costs.nrows(),
        costs.ncols(),
        "We expected the padded cost matrix to be square",
    );
    inner::solve(costs)
}
