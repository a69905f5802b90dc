//! Submodule providing the concrete six-step Munkres implementation:
//! star/prime mask, row and column covers, augmenting path over zeros,
//! and the uncovered-minimum dual update.

use bitvec::prelude::BitVec;
use bitvec::bitvec;
use log::trace;
use ndarray::Array2;

use crate::assignment::{LapCost, SolverError};

const STAR: u8 = 1;
const PRIME: u8 = 2;

/// Solves a square, all-finite cost matrix with the six-step method.
pub(super) fn solve<T: LapCost>(costs: &Array2<T>) -> Result<Vec<usize>, SolverError> {
    let n = costs.nrows();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut working = costs.to_owned();
    let mut mask = Array2::<u8>::from_elem((n, n), 0);
    let mut row_cover: BitVec = bitvec![0; n];
    let mut col_cover: BitVec = bitvec![0; n];

    // Step 1: subtract each row's minimum.
    for mut row in working.rows_mut() {
        let minimum = row.iter().copied().fold(T::infinity(), |a, b| if b < a { b } else { a });
        row.mapv_inplace(|value| value - minimum);
    }

    // Step 2: star zeros that have no starred zero in their row or column.
    for i in 0..n {
        for j in 0..n {
            if working[(i, j)] == T::zero() && !row_cover[i] && !col_cover[j] {
                mask[(i, j)] = STAR;
                row_cover.set(i, true);
                col_cover.set(j, true);
            }
        }
    }
    row_cover.fill(false);
    col_cover.fill(false);

    let mut outer_iterations = 0;
    loop {
        outer_iterations += 1;
        if outer_iterations > n * n + 2 {
            return Err(SolverError::DidNotConverge);
        }

        // Step 3: cover every column containing a starred zero; a full
        // cover means the starred set is the assignment.
        for j in 0..n {
            if (0..n).any(|i| mask[(i, j)] == STAR) {
                col_cover.set(j, true);
            }
        }
        if col_cover.count_ones() == n {
            break;
        }

        // Steps 4 and 6: prime uncovered zeros, shifting covers along
        // starred rows, until a primed zero with no star in its row is
        // found; manufacture new zeros with the uncovered minimum when
        // none remain.
        let mut inner_iterations = 0;
        let (path_row, path_col) = loop {
            inner_iterations += 1;
            if inner_iterations > 2 * n * n + 2 {
                return Err(SolverError::DidNotConverge);
            }

            if let Some((i, j)) = find_uncovered_zero(&working, &row_cover, &col_cover) {
                mask[(i, j)] = PRIME;
                if let Some(star_col) = find_in_row(&mask, i, STAR) {
                    row_cover.set(i, true);
                    col_cover.set(star_col, false);
                } else {
                    break (i, j);
                }
            } else {
                adjust_with_uncovered_minimum(&mut working, &row_cover, &col_cover);
            }
        };

        // Step 5: alternate stars and primes along the augmenting path,
        // then star the primes and unstar the stars.
        let mut path = vec![(path_row, path_col)];
        loop {
            let column = path.last().map_or(path_col, |&(_, j)| j);
            let Some(star_row) = find_in_column(&mask, column, STAR) else {
                break;
            };
            path.push((star_row, column));
            let Some(prime_col) = find_in_row(&mask, star_row, PRIME) else {
                unreachable!("We expected every covered starred row to carry a primed zero");
            };
            path.push((star_row, prime_col));
        }
        trace!("augmenting path of length {}", path.len());
        for &(i, j) in &path {
            mask[(i, j)] = if mask[(i, j)] == STAR { 0 } else { STAR };
        }
        mask.mapv_inplace(|m| if m == PRIME { 0 } else { m });
        row_cover.fill(false);
        col_cover.fill(false);
    }

    let mut assignment = Vec::with_capacity(n);
    for i in 0..n {
        let Some(column) = find_in_row(&mask, i, STAR) else {
            unreachable!("We expected every row to carry a starred zero once all columns are covered");
        };
        assignment.push(column);
    }
    Ok(assignment)
}

/// First uncovered zero in row-major order.
fn find_uncovered_zero<T: LapCost>(
    working: &Array2<T>,
    row_cover: &BitVec,
    col_cover: &BitVec,
) -> Option<(usize, usize)> {
    let n = working.nrows();
    for i in 0..n {
        if row_cover[i] {
            continue;
        }
        for j in 0..n {
            if !col_cover[j] && working[(i, j)] == T::zero() {
                return Some((i, j));
            }
        }
    }
    None
}

fn find_in_row(mask: &Array2<u8>, row: usize, kind: u8) -> Option<usize> {
    (0..mask.ncols()).find(|&j| mask[(row, j)] == kind)
}

fn find_in_column(mask: &Array2<u8>, column: usize, kind: u8) -> Option<usize> {
    (0..mask.nrows()).find(|&i| mask[(i, column)] == kind)
}

/// Step 6: add the smallest uncovered value to covered rows and subtract
/// it from uncovered columns, creating at least one new uncovered zero.
fn adjust_with_uncovered_minimum<T: LapCost>(
    working: &mut Array2<T>,
    row_cover: &BitVec,
    col_cover: &BitVec,
) {
    let n = working.nrows();
    let mut minimum = T::infinity();
    for i in 0..n {
        if row_cover[i] {
            continue;
        }
        for j in 0..n {
            if !col_cover[j] && working[(i, j)] < minimum {
                minimum = working[(i, j)];
            }
        }
    }
    debug_assert!(minimum.is_finite(), "We expected an uncovered cell to exist");

    for i in 0..n {
        for j in 0..n {
            if row_cover[i] {
                // Sentinel cells sit near the top of the value range;
                // keep the update from overflowing them to infinity.
                let sum = working[(i, j)] + minimum;
                working[(i, j)] = if sum.is_finite() { sum } else { T::max_value() };
            }
            if !col_cover[j] {
                working[(i, j)] = working[(i, j)] - minimum;
            }
        }
    }
}
