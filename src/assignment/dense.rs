//! Shared preprocessing for the dense solvers: validation, exclusion of
//! all-infinite rows and columns, transposition of tall problems, square
//! padding, and sentinel substitution for the remaining infinities.

use ndarray::Array2;

use super::{Assignment, SolverError, SolverKind, lapjv, munkres};

/// Validates, reduces, pads, solves, and maps the solution back onto the
/// original matrix shape.
#[allow(clippy::cast_precision_loss)]
pub(super) fn solve(costs: &Array2<f64>, kind: SolverKind) -> Result<Assignment, SolverError> {
    let rows = costs.nrows();
    let columns = costs.ncols();
    if rows == 0 || columns == 0 {
        return Err(SolverError::EmptyMatrix);
    }

    let mut max_finite: Option<f64> = None;
    let mut min_finite: Option<f64> = None;
    for &value in costs {
        if value.is_nan() {
            return Err(SolverError::NanCosts);
        }
        if value < 0.0 {
            return Err(SolverError::NegativeCosts);
        }
        if value.is_finite() {
            max_finite = Some(max_finite.map_or(value, |current| current.max(value)));
            min_finite = Some(min_finite.map_or(value, |current| current.min(value)));
        }
    }
    let (Some(max_finite), Some(min_finite)) = (max_finite, min_finite) else {
        return Err(SolverError::InfeasibleAssignment);
    };

    // Rows and columns with no finite entry cannot participate in any
    // feasible assignment; they stay unassigned in the output.
    let kept_rows: Vec<usize> =
        (0..rows).filter(|&i| costs.row(i).iter().any(|value| value.is_finite())).collect();
    let kept_columns: Vec<usize> =
        (0..columns).filter(|&j| costs.column(j).iter().any(|value| value.is_finite())).collect();

    // The solvers want at least as many columns as rows; tall problems
    // are solved transposed and mapped back afterwards.
    let transposed = kept_rows.len() > kept_columns.len();
    let (work_rows, work_columns) = if transposed {
        (kept_columns.len(), kept_rows.len())
    } else {
        (kept_rows.len(), kept_columns.len())
    };

    let side = work_columns;
    let filler = match kind {
        SolverKind::Jv => 2.0 * min_finite,
        SolverKind::Munkres => 10.0 * max_finite,
    };
    // The sentinel stands in for +inf in the padded matrix; it must
    // strictly dominate every real cost and the filler.
    let sentinel = match kind {
        SolverKind::Jv => max_finite.max(filler) * side as f64 + 1.0,
        SolverKind::Munkres => f64::MAX,
    };

    let value_at = |i: usize, j: usize| -> f64 {
        if transposed {
            costs[(kept_rows[j], kept_columns[i])]
        } else {
            costs[(kept_rows[i], kept_columns[j])]
        }
    };
    let padded = Array2::from_shape_fn((side, side), |(i, j)| {
        if i >= work_rows {
            filler
        } else {
            let value = value_at(i, j);
            if value.is_finite() { value } else { sentinel }
        }
    });

    let solution = match kind {
        SolverKind::Jv => lapjv::solve_square(&padded)?,
        SolverKind::Munkres => munkres::solve_square(&padded)?,
    };
    debug_assert_eq!(solution.len(), side);

    let mut row_to_column = vec![None; rows];
    let mut column_taken = vec![false; columns];
    let mut cost = 0.0;
    for (i, &j) in solution.iter().enumerate() {
        if i >= work_rows {
            continue;
        }
        let (original_row, original_column) = if transposed {
            (kept_rows[j], kept_columns[i])
        } else {
            (kept_rows[i], kept_columns[j])
        };
        let value = costs[(original_row, original_column)];
        // Assignments routed through a sentinel cell are forbidden in the
        // original problem and come back unassigned.
        if value.is_finite() {
            row_to_column[original_row] = Some(original_column);
            column_taken[original_column] = true;
            cost += value;
        }
    }
    let unassigned_columns = (0..columns).filter(|&j| !column_taken[j]).collect();

    Ok(Assignment { row_to_column, cost, unassigned_columns })
}
