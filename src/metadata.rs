//! Session metadata attached to the track store: acquisition details and
//! an open-ended user dictionary.
//!
//! Metadata never participates in the linking algorithm; it is carried
//! for downstream analysis and export.

use hashbrown::HashMap;

use crate::options::value::OptionValue;

/// Errors that can occur while editing metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// User dictionary keys must be identifier-shaped.
    #[error("`{0}` is not a valid identifier (letters, digits, underscores; not starting with a digit).")]
    InvalidIdentifier(String),
}

/// A physical quantity with its unit, e.g. a pixel size in microns.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// The numeric value.
    pub value: f64,
    /// The unit the value is expressed in.
    pub units: String,
}

/// Acquisition metadata for one tracking session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    filename: Option<String>,
    description: Option<String>,
    pixel_size: Option<Quantity>,
    timestamps: Option<(Vec<f64>, String)>,
    image_size: Option<(u32, u32)>,
    user: HashMap<String, OptionValue>,
}

impl Metadata {
    /// The source filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Sets the source filename.
    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = Some(filename.into());
    }

    /// The free-form session description, if set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Sets the free-form session description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// The physical pixel size, if set.
    #[must_use]
    pub fn pixel_size(&self) -> Option<&Quantity> {
        self.pixel_size.as_ref()
    }

    /// Sets the physical pixel size.
    pub fn set_pixel_size(&mut self, value: f64, units: impl Into<String>) {
        self.pixel_size = Some(Quantity { value, units: units.into() });
    }

    /// The per-frame timestamps and their unit, if set.
    #[must_use]
    pub fn timestamps(&self) -> Option<(&[f64], &str)> {
        self.timestamps.as_ref().map(|(times, units)| (times.as_slice(), units.as_str()))
    }

    /// Sets the per-frame timestamps and their unit.
    pub fn set_timestamps(&mut self, times: Vec<f64>, units: impl Into<String>) {
        self.timestamps = Some((times, units.into()));
    }

    /// The image size as `(height, width)`, if set.
    #[must_use]
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    /// Sets the image size as `(height, width)`.
    pub fn set_image_size(&mut self, height: u32, width: u32) {
        self.image_size = Some((height, width));
    }

    /// Looks up a user dictionary entry; keys compare
    /// case-insensitively.
    #[must_use]
    pub fn user_value(&self, key: &str) -> Option<&OptionValue> {
        self.user.get(&key.to_ascii_lowercase())
    }

    /// Inserts a user dictionary entry under a case-insensitive
    /// identifier key.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is not identifier-shaped.
    pub fn set_user_value(
        &mut self,
        key: impl Into<String>,
        value: OptionValue,
    ) -> Result<(), MetadataError> {
        let key = key.into();
        if !is_identifier(&key) {
            return Err(MetadataError::InvalidIdentifier(key));
        }
        self.user.insert(key.to_ascii_lowercase(), value);
        Ok(())
    }

    /// Iterates over the user dictionary entries in arbitrary order.
    pub fn user_entries(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.user.iter().map(|(key, value)| (key.as_str(), value))
    }
}

fn is_identifier(key: &str) -> bool {
    let mut characters = key.chars();
    let Some(first) = characters.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && characters.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
