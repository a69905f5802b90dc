//! Minimum-cost assignment on dense real cost matrices.
//!
//! Two algorithms solve the same contract: the Jonker–Volgenant
//! shortest-augmenting-path solver (primary) and the classical Munkres
//! six-step method (fallback). Both accept rectangular matrices with
//! `+∞` entries marking forbidden pairings, and return identical minimum
//! costs; tie-breaks may differ between the two.

use core::fmt;
use core::ops::{AddAssign, SubAssign};
use core::str::FromStr;

use ndarray::Array2;
use num_traits::Float;

mod dense;
mod errors;
pub(crate) mod lapjv;
pub(crate) mod munkres;
mod state;

pub use errors::SolverError;
pub(crate) use state::AssignmentState;

/// Cost type bound shared by the solvers.
pub(crate) trait LapCost: Float + AddAssign + SubAssign + fmt::Debug {}
impl<T> LapCost for T where T: Float + AddAssign + SubAssign + fmt::Debug {}

/// Which assignment algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Jonker–Volgenant shortest augmenting path (primary).
    #[default]
    Jv,
    /// Classical Munkres six-step method (fallback).
    Munkres,
}

impl SolverKind {
    /// The canonical lowercase name of this solver, as used in option
    /// files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Jv => "jv",
            SolverKind::Munkres => "munkres",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jv" | "lapjv" => Ok(SolverKind::Jv),
            "munkres" | "hungarian" => Ok(SolverKind::Munkres),
            _ => Err(SolverError::UnknownSolver(s.to_owned())),
        }
    }
}

/// The result of one assignment solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// For each input row, the column it was assigned to, or `None` when
    /// the row could not be feasibly assigned.
    pub row_to_column: Vec<Option<usize>>,
    /// Total cost of the assigned rows on the input matrix.
    pub cost: f64,
    /// Input columns no row was assigned to, in ascending order.
    pub unassigned_columns: Vec<usize>,
}

impl Assignment {
    /// Iterates over the `(row, column)` pairs that were assigned.
    pub fn assigned_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.row_to_column
            .iter()
            .enumerate()
            .filter_map(|(row, column)| column.map(|column| (row, column)))
    }
}

/// Solves the minimum-cost assignment problem on a dense cost matrix.
///
/// Entries must lie in `[0, +∞]`; `+∞` marks a forbidden pairing.
/// Rectangular matrices are handled by transposition and padding, and
/// rows or columns with no finite cost are excluded up front — they come
/// back unassigned.
///
/// # Errors
///
/// Returns an error if the matrix is empty, contains NaN or negative
/// entries, or has no finite entry at all.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use lap_linker::assignment::{solve, SolverKind};
///
/// let costs = array![[1.0, 10.0], [10.0, 1.0]];
/// let assignment = solve(&costs, SolverKind::Jv).unwrap();
/// assert_eq!(assignment.row_to_column, vec![Some(0), Some(1)]);
/// assert_eq!(assignment.cost, 2.0);
/// ```
pub fn solve(costs: &Array2<f64>, kind: SolverKind) -> Result<Assignment, SolverError> {
    dense::solve(costs, kind)
}
