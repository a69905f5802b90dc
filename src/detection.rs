//! Detection records consumed by the linker: ordered bags of named, typed
//! attribute values.
//!
//! The linker only interprets the attributes it is configured to score
//! (the linking attribute and, when mitosis tracking is enabled, the
//! mitosis attribute). Everything else is carried through opaquely to the
//! track store and its export surface.

/// A single measured attribute value carried by a [`Detection`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A scalar measurement, e.g. an area or a mean intensity.
    Scalar(f64),
    /// A fixed-length real vector, e.g. a centroid position.
    Vector(Vec<f64>),
    /// A sorted vector of pixel linear indices describing the object mask.
    Pixels(Vec<u64>),
    /// Free-form text, carried through to export untouched.
    Text(String),
}

impl AttributeValue {
    /// Returns the value as a real slice when it is numeric.
    ///
    /// Scalars are exposed as one-element slices so that the scoring
    /// kernel treats them as length-one vectors.
    #[must_use]
    pub fn as_real_slice(&self) -> Option<&[f64]> {
        match self {
            AttributeValue::Scalar(value) => Some(core::slice::from_ref(value)),
            AttributeValue::Vector(values) => Some(values.as_slice()),
            AttributeValue::Pixels(_) | AttributeValue::Text(_) => None,
        }
    }

    /// Returns the value as a pixel index slice when it is a pixel set.
    #[must_use]
    pub fn as_pixels(&self) -> Option<&[u64]> {
        match self {
            AttributeValue::Pixels(values) => Some(values.as_slice()),
            _ => None,
        }
    }
}

/// One detected object in one frame: a set of named attribute values.
///
/// Attribute insertion order is preserved, so the column order of any
/// downstream export is the order in which the producer set the
/// attributes.
///
/// # Examples
///
/// ```
/// use lap_linker::detection::{AttributeValue, Detection};
///
/// let detection = Detection::new()
///     .with_vector("centroid", vec![12.0, 7.5])
///     .with_scalar("area", 42.0);
/// assert_eq!(
///     detection.get("area"),
///     Some(&AttributeValue::Scalar(42.0))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detection {
    attributes: Vec<(String, AttributeValue)>,
}

impl Detection {
    /// Creates a detection with no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any previous value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        let name = name.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style setter for a scalar attribute.
    #[must_use]
    pub fn with_scalar(self, name: impl Into<String>, value: f64) -> Self {
        self.with_attribute(name, AttributeValue::Scalar(value))
    }

    /// Builder-style setter for a real-vector attribute.
    #[must_use]
    pub fn with_vector(self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.with_attribute(name, AttributeValue::Vector(values))
    }

    /// Builder-style setter for a pixel index set.
    ///
    /// The indices are stored sorted, which is the form the overlap
    /// scores expect.
    #[must_use]
    pub fn with_pixels(self, name: impl Into<String>, mut indices: Vec<u64>) -> Self {
        indices.sort_unstable();
        self.with_attribute(name, AttributeValue::Pixels(indices))
    }

    /// Returns the value of the named attribute, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterates over the attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of attributes on this detection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true when the detection carries no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
