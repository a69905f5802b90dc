//! Assembles the block cost matrix that drives one frame of linking.
//!
//! The matrix is `(n+m) × (n+m)` for `n` active tracks and `m` new
//! detections:
//!
//! ```text
//! [  L    S  ]
//! [  S'   L' ]
//! ```
//!
//! `L` carries the gated linking costs, the `S`/`S'` diagonals price
//! stopping a track and starting a new one, and `L'` keeps the padded
//! problem feasible without biasing the primary assignment.

use ndarray::Array2;

use crate::detection::AttributeValue;
use crate::errors::LinkerError;
use crate::options::LinkerOptions;
use crate::scoring::score;

/// Builds the block cost matrix for one frame.
///
/// `track_attributes[i]` is the linking attribute of active track `i`'s
/// last record (`None` when the record lacks it; that track's linking row
/// stays forbidden and the track ages). `detection_attributes[j]` is the
/// linking attribute of detection `j`.
///
/// # Errors
///
/// Returns an error when a pairwise score cannot be computed, e.g. on
/// mismatched centroid lengths.
pub(crate) fn build(
    track_attributes: &[Option<&AttributeValue>],
    detection_attributes: &[&AttributeValue],
    options: &LinkerOptions,
) -> Result<Array2<f64>, LinkerError> {
    let n = track_attributes.len();
    let m = detection_attributes.len();
    let (lo, hi) = options.linking_score_range;

    let mut linking = Array2::from_elem((n, m), f64::INFINITY);
    for (i, track_attribute) in track_attributes.iter().enumerate() {
        let Some(track_attribute) = track_attribute else {
            continue;
        };
        for (j, detection_attribute) in detection_attributes.iter().enumerate() {
            let value = score(track_attribute, detection_attribute, options.link_calc)?;
            if value >= lo && value <= hi {
                linking[(i, j)] = value;
            }
        }
    }

    // When no link survives the gate, the gating upper bound stands in
    // for the missing extrema so the stop/start diagonals stay finite.
    let mut max_finite: Option<f64> = None;
    let mut min_finite: Option<f64> = None;
    for &value in &linking {
        if value.is_finite() {
            max_finite = Some(max_finite.map_or(value, |current| current.max(value)));
            min_finite = Some(min_finite.map_or(value, |current| current.min(value)));
        }
    }
    let max_finite = max_finite.unwrap_or(hi);
    let min_finite = min_finite.unwrap_or(hi);
    let alternative = 1.05 * max_finite;

    let size = n + m;
    let mut costs = Array2::from_elem((size, size), f64::INFINITY);
    for i in 0..n {
        for j in 0..m {
            costs[(i, j)] = linking[(i, j)];
        }
        // Stop-tracking diagonal.
        costs[(i, m + i)] = alternative;
    }
    for j in 0..m {
        // Start-new-track diagonal.
        costs[(n + j, j)] = alternative;
        // Auxiliary block: the transpose of the linking sparsity pattern,
        // flattened to the minimum finite linking cost.
        for i in 0..n {
            if linking[(i, j)].is_finite() {
                costs[(n + j, m + i)] = min_finite;
            }
        }
    }

    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroid(x: f64, y: f64) -> AttributeValue {
        AttributeValue::Vector(vec![x, y])
    }

    #[test]
    fn test_block_layout() {
        let options = LinkerOptions::default();
        let track_values = [centroid(0.0, 0.0)];
        let tracks: Vec<Option<&AttributeValue>> = track_values.iter().map(Some).collect();
        let detection_values = [centroid(3.0, 4.0), centroid(0.0, 1.0)];
        let detections: Vec<&AttributeValue> = detection_values.iter().collect();

        let costs = build(&tracks, &detections, &options).unwrap();
        assert_eq!(costs.dim(), (3, 3));
        // Linking block.
        assert_eq!(costs[(0, 0)], 5.0);
        assert_eq!(costs[(0, 1)], 1.0);
        // Stop and start diagonals at 1.05 * max finite link.
        assert_eq!(costs[(0, 2)], 5.25);
        assert_eq!(costs[(1, 0)], 5.25);
        assert_eq!(costs[(2, 1)], 5.25);
        // Auxiliary block flattened to the minimum finite link.
        assert_eq!(costs[(1, 2)], 1.0);
        assert_eq!(costs[(2, 2)], 1.0);
        // Start off-diagonals stay forbidden.
        assert!(costs[(1, 1)].is_infinite());
        assert!(costs[(2, 0)].is_infinite());
    }

    #[test]
    fn test_gating_forces_infinity() {
        let mut options = LinkerOptions::default();
        options.linking_score_range = (0.0, 50.0);
        let track_values = [centroid(0.0, 0.0)];
        let tracks: Vec<Option<&AttributeValue>> = track_values.iter().map(Some).collect();
        let detection_values = [centroid(1000.0, 1000.0)];
        let detections: Vec<&AttributeValue> = detection_values.iter().collect();

        let costs = build(&tracks, &detections, &options).unwrap();
        assert!(costs[(0, 0)].is_infinite());
        // Fallback alternative cost keeps the diagonals finite.
        assert_eq!(costs[(0, 1)], 52.5);
        assert_eq!(costs[(1, 0)], 52.5);
        assert!(costs[(1, 1)].is_infinite());
    }

    #[test]
    fn test_missing_track_attribute_forbids_its_row() {
        let options = LinkerOptions::default();
        let tracks: Vec<Option<&AttributeValue>> = vec![None];
        let detection_values = [centroid(0.0, 0.0)];
        let detections: Vec<&AttributeValue> = detection_values.iter().collect();

        let costs = build(&tracks, &detections, &options).unwrap();
        assert!(costs[(0, 0)].is_infinite());
    }
}
