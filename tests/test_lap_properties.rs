//! Algebraic property tests for the assignment solvers.

use lap_linker::assignment::{SolverKind, solve};
use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_matrix(
    rng: &mut SmallRng,
    rows: usize,
    columns: usize,
    infinite_share: f64,
) -> Array2<f64> {
    Array2::from_shape_fn((rows, columns), |_| {
        if rng.gen_bool(infinite_share) { f64::INFINITY } else { rng.gen_range(0.0..100.0) }
    })
}

#[test]
fn test_reported_cost_matches_assigned_entries() {
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..20 {
        let costs = random_matrix(&mut rng, 12, 12, 0.1);
        let assignment = solve(&costs, SolverKind::Jv).unwrap();
        let recomputed: f64 =
            assignment.assigned_pairs().map(|(i, j)| costs[(i, j)]).sum();
        assert!((assignment.cost - recomputed).abs() < 1e-9);
    }
}

#[test]
fn test_assignments_never_share_a_column() {
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..20 {
        let costs = random_matrix(&mut rng, 10, 14, 0.2);
        let assignment = solve(&costs, SolverKind::Jv).unwrap();
        let mut columns: Vec<usize> = assignment.assigned_pairs().map(|(_, j)| j).collect();
        let before = columns.len();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), before);
    }
}

#[test]
fn test_transpose_symmetry() {
    let mut rng = SmallRng::seed_from_u64(13);
    for _ in 0..20 {
        let costs = random_matrix(&mut rng, 9, 9, 0.05);
        let transposed = costs.t().to_owned();
        let direct = solve(&costs, SolverKind::Jv).unwrap();
        let mirrored = solve(&transposed, SolverKind::Jv).unwrap();
        assert!((direct.cost - mirrored.cost).abs() < 1e-6);
        // The mirrored pairs must be a feasible assignment of the
        // original problem with the same total cost.
        let remapped: f64 = mirrored.assigned_pairs().map(|(j, i)| costs[(i, j)]).sum();
        assert!((direct.cost - remapped).abs() < 1e-6);
    }
}

#[test]
fn test_infinity_gating_never_lowers_the_cost() {
    let mut rng = SmallRng::seed_from_u64(17);
    for _ in 0..20 {
        let mut costs = random_matrix(&mut rng, 8, 8, 0.0);
        let baseline = solve(&costs, SolverKind::Jv).unwrap();
        let row = rng.gen_range(0..8);
        let column = rng.gen_range(0..8);
        costs[(row, column)] = f64::INFINITY;
        match solve(&costs, SolverKind::Jv) {
            Ok(gated) => assert!(gated.cost >= baseline.cost - 1e-9),
            // Gating every feasible option away counts as not lowering.
            Err(error) => {
                panic!("an 8x8 matrix with a single infinity stays solvable: {error}")
            }
        }
    }
}

#[test]
fn test_repeated_solves_are_identical() {
    let mut rng = SmallRng::seed_from_u64(19);
    let costs = random_matrix(&mut rng, 15, 15, 0.1);
    let first = solve(&costs, SolverKind::Jv).unwrap();
    for _ in 0..5 {
        assert_eq!(solve(&costs, SolverKind::Jv).unwrap(), first);
    }
    let munkres = solve(&costs, SolverKind::Munkres).unwrap();
    for _ in 0..5 {
        assert_eq!(solve(&costs, SolverKind::Munkres).unwrap(), munkres);
    }
}

#[test]
fn test_jv_and_munkres_agree_on_the_minimum_cost() {
    let mut rng = SmallRng::seed_from_u64(23);
    for _ in 0..10 {
        let costs = random_matrix(&mut rng, 20, 20, 0.05);
        let jv = solve(&costs, SolverKind::Jv).unwrap();
        let munkres = solve(&costs, SolverKind::Munkres).unwrap();
        assert!(
            (jv.cost - munkres.cost).abs() < 1e-6,
            "jv {} vs munkres {}",
            jv.cost,
            munkres.cost,
        );
    }
}

#[test]
fn test_rectangular_three_by_five() {
    let mut rng = SmallRng::seed_from_u64(29);
    let costs = random_matrix(&mut rng, 3, 5, 0.0);
    let assignment = solve(&costs, SolverKind::Jv).unwrap();

    assert_eq!(assignment.row_to_column.len(), 3);
    let mut columns: Vec<usize> = assignment
        .row_to_column
        .iter()
        .map(|column| column.expect("every row of a finite wide matrix is assignable"))
        .collect();
    assert!(columns.iter().all(|&j| j < 5));
    columns.sort_unstable();
    columns.dedup();
    assert_eq!(columns.len(), 3);
    assert_eq!(assignment.unassigned_columns.len(), 2);
}

#[test]
fn test_known_optimum() {
    let costs = ndarray::array![
        [4.0, 1.0, 3.0], //
        [2.0, 0.0, 5.0],
        [3.0, 2.0, 2.0],
    ];
    for kind in [SolverKind::Jv, SolverKind::Munkres] {
        let assignment = solve(&costs, kind).unwrap();
        assert_eq!(assignment.cost, 5.0);
        assert_eq!(assignment.row_to_column, vec![Some(1), Some(0), Some(2)]);
    }
}
