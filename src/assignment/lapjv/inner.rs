//! Submodule providing the concrete implementation of the LAPJV phases.

use log::trace;
use ndarray::Array2;

use crate::assignment::{AssignmentState, LapCost, SolverError};

/// Support struct carrying the solver state across the four phases.
pub(super) struct Inner<'matrix, T> {
    /// The square cost matrix to compute the assignment on.
    costs: &'matrix Array2<T>,
    /// Side of the square matrix.
    dim: usize,
    /// Numeric resolution for equal-minimum tests.
    resolution: T,
    /// Column dual variables.
    column_costs: Vec<T>,
    /// Rows still lacking a column between phases.
    unassigned_rows: Vec<usize>,
    /// Column → row assignment.
    assigned_rows: Vec<AssignmentState>,
    /// Row → column assignment.
    assigned_columns: Vec<AssignmentState>,
}

impl<'matrix, T: LapCost> Inner<'matrix, T> {
    pub(super) fn new(costs: &'matrix Array2<T>, resolution: T) -> Self {
        let dim = costs.nrows();
        Inner {
            costs,
            dim,
            resolution,
            column_costs: vec![T::infinity(); dim],
            unassigned_rows: Vec::new(),
            assigned_rows: vec![AssignmentState::Unassigned; dim],
            assigned_columns: vec![AssignmentState::Unassigned; dim],
        }
    }

    #[inline(always)]
    fn cost(&self, row: usize, column: usize) -> T {
        self.costs[(row, column)]
    }

    #[inline(always)]
    fn reduced_cost(&self, row: usize, column: usize) -> T {
        self.cost(row, column) - self.column_costs[column]
    }

    /// Phase 1: per-column minima, with conflicts between rows that win
    /// several columns resolved by a reverse column scan.
    #[inline]
    pub(super) fn column_reduction(&mut self) {
        debug_assert!(
            self.assigned_rows.iter().all(|state| state.is_unassigned()),
            "We expected all columns to be unassigned",
        );

        for row in 0..self.dim {
            for column in 0..self.dim {
                let value = self.cost(row, column);
                if value < self.column_costs[column] {
                    self.column_costs[column] = value;
                    self.assigned_rows[column] = AssignmentState::Assigned(row);
                }
            }
        }

        for column in (0..self.dim).rev() {
            let AssignmentState::Assigned(row) = self.assigned_rows[column] else {
                unreachable!("We expected every column to have a minimum row");
            };
            match self.assigned_columns[row] {
                AssignmentState::Unassigned => {
                    self.assigned_columns[row] = AssignmentState::Assigned(column);
                }
                AssignmentState::Assigned(previous) | AssignmentState::Conflict(previous) => {
                    self.assigned_columns[row] = AssignmentState::Conflict(previous);
                    self.assigned_rows[column] = AssignmentState::Unassigned;
                }
            }
        }
    }

    /// Phase 2: for singly-assigned rows, transfer reduction by the
    /// second-smallest reduced cost in the row.
    #[inline]
    pub(super) fn reduction_transfer(&mut self) {
        debug_assert!(
            self.unassigned_rows.is_empty(),
            "We expected the unassigned rows to be empty",
        );

        for row in 0..self.dim {
            match self.assigned_columns[row] {
                AssignmentState::Unassigned => self.unassigned_rows.push(row),
                AssignmentState::Conflict(column) => {
                    self.assigned_columns[row] = AssignmentState::Assigned(column);
                }
                AssignmentState::Assigned(column) => {
                    let mut minimum = T::infinity();
                    for other in 0..self.dim {
                        if other == column {
                            continue;
                        }
                        let reduced = self.reduced_cost(row, other);
                        if reduced < minimum {
                            minimum = reduced;
                        }
                    }
                    // A 1x1 problem has no other column to transfer to.
                    if minimum.is_finite() {
                        self.column_costs[column] -= minimum;
                    }
                }
            }
        }
    }

    /// Phase 3: one pass of augmenting row reduction over the free rows.
    ///
    /// A dual update happens only when the sub-minimum strictly exceeds
    /// the minimum by more than the numeric resolution.
    #[inline]
    pub(super) fn augmenting_row_reduction(&mut self) {
        if self.unassigned_rows.is_empty() {
            return;
        }
        trace!("augmenting row reduction over {} free rows", self.unassigned_rows.len());

        let mut current = 0;
        let mut remaining_free = 0;
        let mut iterations = 0;
        let free_count = self.unassigned_rows.len();

        while current < free_count {
            let free_row = self.unassigned_rows[current];
            current += 1;
            iterations += 1;

            let ((mut column, minimum), (second_column, second_minimum)) =
                self.first_and_second_minimum(free_row);
            let mut displaced = self.assigned_rows[column];
            let improves = second_minimum - minimum > self.resolution;

            if iterations < current * self.dim {
                if improves {
                    self.column_costs[column] -= second_minimum - minimum;
                } else if displaced.is_assigned() {
                    // Minimum and sub-minimum tie and the minimum column
                    // is taken; the sub-minimum column may be free.
                    if let Some(second_column) = second_column {
                        column = second_column;
                        displaced = self.assigned_rows[column];
                    }
                }
                if let AssignmentState::Assigned(displaced_row) = displaced {
                    if improves {
                        current -= 1;
                        self.unassigned_rows[current] = displaced_row;
                    } else {
                        self.unassigned_rows[remaining_free] = displaced_row;
                        remaining_free += 1;
                    }
                }
            } else if let AssignmentState::Assigned(displaced_row) = displaced {
                self.unassigned_rows[remaining_free] = displaced_row;
                remaining_free += 1;
            }

            self.assigned_rows[column] = AssignmentState::Assigned(free_row);
            self.assigned_columns[free_row] = AssignmentState::Assigned(column);
        }

        self.unassigned_rows.truncate(remaining_free);
    }

    /// First and second minimum reduced costs over a row.
    #[inline]
    fn first_and_second_minimum(&self, row: usize) -> ((usize, T), (Option<usize>, T)) {
        let mut first_column = 0;
        let mut first = self.reduced_cost(row, 0);
        let mut second_column = None;
        let mut second = T::infinity();
        for column in 1..self.dim {
            let reduced = self.reduced_cost(row, column);
            if reduced < second {
                if reduced >= first {
                    second = reduced;
                    second_column = Some(column);
                } else {
                    second = first;
                    second_column = Some(first_column);
                    first = reduced;
                    first_column = column;
                }
            }
        }
        ((first_column, first), (second_column, second))
    }

    /// Phase 4: shortest augmenting path for every remaining free row.
    #[inline]
    pub(super) fn augmentation(&mut self) -> Result<(), SolverError> {
        if self.unassigned_rows.is_empty() {
            return Ok(());
        }
        trace!("augmentation over {} free rows", self.unassigned_rows.len());

        let dim = self.dim;
        let mut to_scan = vec![0usize; dim];
        let mut predecessors = vec![0usize; dim];
        let mut distances = vec![T::infinity(); dim];

        let free_rows = core::mem::take(&mut self.unassigned_rows);
        for free_row in free_rows {
            let sink =
                self.find_path(free_row, &mut to_scan, &mut predecessors, &mut distances)?;
            self.flip_augmenting_path(sink, &predecessors, free_row);
        }
        Ok(())
    }

    /// Flips the augmenting path ending in `sink` into the assignment:
    /// every column on the chain takes the row that reached it, and each
    /// such row hands its old column to the next step, until the chain
    /// arrives back at the row the search started from.
    fn flip_augmenting_path(
        &mut self,
        mut sink: usize,
        predecessors: &[usize],
        start_row: usize,
    ) {
        for _ in 0..self.dim {
            let row = predecessors[sink];
            self.assigned_rows[sink] = AssignmentState::Assigned(row);
            let handed_over = core::mem::replace(
                &mut self.assigned_columns[row],
                AssignmentState::Assigned(sink),
            );
            if row == start_row {
                return;
            }
            let AssignmentState::Assigned(next_sink) = handed_over else {
                unreachable!("an interior row of the augmenting path already holds a column");
            };
            sink = next_sink;
        }
        unreachable!("an augmenting path cannot visit more columns than the matrix side");
    }

    /// One Dijkstra-like search from `start_row` to the closest free
    /// column, updating column duals for the settled columns.
    fn find_path(
        &mut self,
        start_row: usize,
        to_scan: &mut [usize],
        predecessors: &mut [usize],
        distances: &mut [T],
    ) -> Result<usize, SolverError> {
        let mut lower = 0;
        let mut upper = 0;
        let mut ready = 0;

        for column in 0..self.dim {
            to_scan[column] = column;
            predecessors[column] = start_row;
            distances[column] = self.reduced_cost(start_row, column);
        }

        let mut iterations = 0;
        let sink = 'outer: loop {
            iterations += 1;
            if iterations > self.dim * self.dim + 2 {
                return Err(SolverError::DidNotConverge);
            }

            if lower == upper {
                ready = lower;
                upper = collect_minimum_frontier(lower, distances, to_scan);
                for &column in &to_scan[lower..upper] {
                    if self.assigned_rows[column].is_unassigned() {
                        break 'outer column;
                    }
                }
            }

            if let Some(column) =
                self.scan(&mut lower, &mut upper, to_scan, distances, predecessors)
            {
                break 'outer column;
            }
        };

        let minimum_distance = distances[to_scan[lower]];
        for &column in &to_scan[..ready] {
            self.column_costs[column] += distances[column] - minimum_distance;
        }

        Ok(sink)
    }

    /// Expands the minimum-distance frontier over the neighbours of
    /// assigned rows. Bounds are written back only when no free column
    /// was reached.
    fn scan(
        &self,
        lower_ref: &mut usize,
        upper_ref: &mut usize,
        to_scan: &mut [usize],
        distances: &mut [T],
        predecessors: &mut [usize],
    ) -> Option<usize> {
        let mut lower = *lower_ref;
        let mut upper = *upper_ref;

        while lower != upper {
            let column = to_scan[lower];
            lower += 1;
            let AssignmentState::Assigned(row) = self.assigned_rows[column] else {
                unreachable!("We expected the frontier column to be assigned during the scan");
            };
            let minimum_distance = distances[column];
            let base = self.reduced_cost(row, column) - minimum_distance;

            let frozen_upper = upper;
            for k in frozen_upper..to_scan.len() {
                let candidate = to_scan[k];
                let reduced = self.reduced_cost(row, candidate) - base;
                if reduced < distances[candidate] {
                    distances[candidate] = reduced;
                    predecessors[candidate] = row;
                    if (reduced - minimum_distance).abs() <= self.resolution {
                        if self.assigned_rows[candidate].is_unassigned() {
                            return Some(candidate);
                        }
                        to_scan[k] = to_scan[upper];
                        to_scan[upper] = candidate;
                        upper += 1;
                    }
                }
            }
        }

        *lower_ref = lower;
        *upper_ref = upper;
        None
    }

    /// Consumes the solver state into the row → column assignment.
    pub(super) fn into_row_assignment(self) -> Vec<usize> {
        self.assigned_columns
            .into_iter()
            .map(|state| {
                let AssignmentState::Assigned(column) = state else {
                    unreachable!("We expected every row to be assigned after augmentation");
                };
                column
            })
            .collect()
    }
}

/// Partitions the pending columns of `to_scan[lower..]` so that every
/// column at the smallest tentative distance occupies `to_scan[lower..end]`,
/// and returns `end`. Two passes: one to find the smallest distance, one
/// to swap the matching columns forward.
fn collect_minimum_frontier<T: LapCost>(
    lower: usize,
    distances: &[T],
    to_scan: &mut [usize],
) -> usize {
    let mut minimum = distances[to_scan[lower]];
    for &column in &to_scan[lower + 1..] {
        if distances[column] < minimum {
            minimum = distances[column];
        }
    }

    let mut end = lower;
    for k in lower..to_scan.len() {
        if distances[to_scan[k]] == minimum {
            to_scan.swap(k, end);
            end += 1;
        }
    }
    end
}
