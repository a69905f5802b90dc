//! Submodule providing the Jonker–Volgenant shortest-augmenting-path
//! solver for dense square cost matrices.
//!
//! R. Jonker, A. Volgenant. A Shortest Augmenting Path Algorithm for
//! Dense and Sparse Linear Assignment Problems. Computing 38, 325-340
//! (1987).

mod inner;

use inner::Inner;
use ndarray::Array2;

use super::{LapCost, SolverError};

/// Solves a square, all-finite cost matrix, returning the assigned column
/// for every row.
///
/// The numeric resolution is the machine epsilon of the maximum cost in
/// the matrix; it is the sole defense against pathologically slow
/// convergence on real-valued costs.
pub(crate) fn solve_square<T: LapCost>(costs: &Array2<T>) -> Result<Vec<usize>, SolverError> {
    let resolution = default_resolution(costs);
    debug_assert_eq!(
        costs.nrows(),
        costs.ncols(),
        "We expected the padded cost matrix to be square",
    );
    if costs.nrows() == 0 {
        return Ok(Vec::new());
    }

    let mut inner = Inner::new(costs, resolution);
    inner.column_reduction();
    inner.reduction_transfer();

    // Two augmenting row reduction passes, as in the 1987 formulation.
    inner.augmenting_row_reduction();
    inner.augmenting_row_reduction();

    inner.augmentation()?;
    Ok(inner.into_row_assignment())
}

/// Machine epsilon scaled to the maximum cost in the matrix.
fn default_resolution<T: LapCost>(costs: &Array2<T>) -> T {
    let max = costs.iter().copied().fold(T::zero(), |a, b| if b > a { b } else { a });
    if max > T::zero() { max * T::epsilon() } else { T::epsilon() }
}
