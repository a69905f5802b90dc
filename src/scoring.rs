//! Pairwise scoring kernel: pure functions mapping two attribute values to
//! a nonnegative cost, where lower is better and `+∞` marks a forbidden
//! pairing.

use core::fmt;
use core::str::FromStr;

use crate::detection::AttributeValue;

/// Errors that can occur while computing a pairwise score.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    /// The score kind name is not recognized.
    #[error("The score kind `{0}` is not recognized.")]
    UnknownKind(String),
    /// The two vectors have different lengths.
    #[error("The vectors have different lengths ({left} and {right}).")]
    LengthMismatch {
        /// Length of the left operand.
        left: usize,
        /// Length of the right operand.
        right: usize,
    },
    /// The attribute is not a flat real vector.
    #[error("The attribute is not a flat real vector.")]
    NotARealVector,
    /// The attribute is not a flat pixel index vector.
    #[error("The attribute is not a flat pixel index vector.")]
    NotAPixelVector,
}

/// The closed set of pairwise scoring kinds.
///
/// New kinds are added by growing this enum and its dispatch in
/// [`score`]; names that do not map to a variant fail to parse with
/// [`ScoringError::UnknownKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    /// Euclidean distance between two same-length real vectors.
    Euclidean,
    /// Reciprocal intersection-over-union of two sorted pixel index sets.
    PixelIntersect,
    /// Reciprocal overlap of the left operand against the unique union.
    PixelIntersectUnique,
}

impl ScoreKind {
    /// The canonical lowercase name of this kind, as used in option files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ScoreKind::Euclidean => "euclidean",
            ScoreKind::PixelIntersect => "pxintersect",
            ScoreKind::PixelIntersectUnique => "pxintersectunique",
        }
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScoreKind {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(ScoreKind::Euclidean),
            "pxintersect" => Ok(ScoreKind::PixelIntersect),
            "pxintersectunique" | "pxintersect_unique" => Ok(ScoreKind::PixelIntersectUnique),
            _ => Err(ScoringError::UnknownKind(s.to_owned())),
        }
    }
}

/// Computes the pairwise score between two attribute values.
///
/// Lower scores are better matches; `+∞` means the pairing is forbidden.
/// The `left` operand is the side being placed (a track's last record for
/// linking, a candidate daughter detection for mitosis) and `right` is
/// the side it is scored against.
///
/// # Errors
///
/// Returns an error if the operands do not have the shape the kind
/// expects: mismatched vector lengths for [`ScoreKind::Euclidean`], or
/// non-vector attributes for any kind.
///
/// # Examples
///
/// ```
/// use lap_linker::detection::AttributeValue;
/// use lap_linker::scoring::{score, ScoreKind};
///
/// let a = AttributeValue::Vector(vec![0.0, 0.0]);
/// let b = AttributeValue::Vector(vec![3.0, 4.0]);
/// assert_eq!(score(&a, &b, ScoreKind::Euclidean).unwrap(), 5.0);
/// ```
pub fn score(
    left: &AttributeValue,
    right: &AttributeValue,
    kind: ScoreKind,
) -> Result<f64, ScoringError> {
    match kind {
        ScoreKind::Euclidean => {
            let left = left.as_real_slice().ok_or(ScoringError::NotARealVector)?;
            let right = right.as_real_slice().ok_or(ScoringError::NotARealVector)?;
            euclidean(left, right)
        }
        ScoreKind::PixelIntersect => {
            let left = left.as_pixels().ok_or(ScoringError::NotAPixelVector)?;
            let right = right.as_pixels().ok_or(ScoringError::NotAPixelVector)?;
            Ok(pixel_intersect(left, right))
        }
        ScoreKind::PixelIntersectUnique => {
            let left = left.as_pixels().ok_or(ScoringError::NotAPixelVector)?;
            let right = right.as_pixels().ok_or(ScoringError::NotAPixelVector)?;
            Ok(pixel_intersect_unique(left, right))
        }
    }
}

/// `‖a − b‖₂` over two same-length real vectors.
fn euclidean(left: &[f64], right: &[f64]) -> Result<f64, ScoringError> {
    if left.len() != right.len() {
        return Err(ScoringError::LengthMismatch { left: left.len(), right: right.len() });
    }
    let sum: f64 = left.iter().zip(right).map(|(a, b)| (a - b) * (a - b)).sum();
    Ok(sum.sqrt())
}

/// Reciprocal intersection-over-union of two sorted pixel index sets.
///
/// A perfect overlap scores 1; disjoint sets score `+∞`. An empty right
/// operand (no history to compare against) also scores `+∞`.
fn pixel_intersect(left: &[u64], right: &[u64]) -> f64 {
    if right.is_empty() {
        return f64::INFINITY;
    }
    let (intersection, union) = sorted_set_counts(left, right);
    reciprocal_overlap(intersection, union)
}

/// Count of `left` elements present in `right`, over the unique union.
///
/// Unlike [`pixel_intersect`], repeated indices in the left operand each
/// count towards the overlap.
fn pixel_intersect_unique(left: &[u64], right: &[u64]) -> f64 {
    if right.is_empty() {
        return f64::INFINITY;
    }
    let matched = left.iter().filter(|&index| right.binary_search(index).is_ok()).count();
    let (_, union) = sorted_set_counts(left, right);
    reciprocal_overlap(matched, union)
}

/// Cardinalities of the set intersection and union of two sorted slices.
///
/// Duplicate values within one slice count once.
fn sorted_set_counts(left: &[u64], right: &[u64]) -> (usize, usize) {
    let mut intersection = 0;
    let mut union = 0;
    let mut i = 0;
    let mut j = 0;
    let mut last: Option<u64> = None;
    while i < left.len() || j < right.len() {
        let next = match (left.get(i), right.get(j)) {
            (Some(&a), Some(&b)) if a == b => {
                i += 1;
                j += 1;
                if last != Some(a) {
                    intersection += 1;
                }
                a
            }
            (Some(&a), Some(&b)) if a < b => {
                i += 1;
                a
            }
            (Some(_), Some(&b)) => {
                j += 1;
                b
            }
            (Some(&a), None) => {
                i += 1;
                a
            }
            (None, Some(&b)) => {
                j += 1;
                b
            }
            (None, None) => break,
        };
        if last != Some(next) {
            union += 1;
            last = Some(next);
        }
    }
    (intersection, union)
}

#[allow(clippy::cast_precision_loss)]
fn reciprocal_overlap(overlap: usize, union: usize) -> f64 {
    if overlap == 0 || union == 0 {
        return f64::INFINITY;
    }
    union as f64 / overlap as f64
}
