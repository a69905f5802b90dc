//! Linker configuration: an explicit option record with set-time
//! validation, plus loading and saving of plain-text option files.
//!
//! Option files are UTF-8 `NAME = VALUE` lines; `#` and `%` start
//! comments and blank lines are skipped. Unknown keys are silently
//! ignored for forward compatibility, while recognized keys are
//! type-checked against the record.

pub mod value;

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::assignment::SolverKind;
use crate::scoring::ScoreKind;
use value::{OptionValue, ValueError, parse_value};

/// Errors that can occur while building, loading, or saving options.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// Reading or writing the option file failed.
    #[error("Option file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A non-comment line is not of the form `NAME = VALUE`.
    #[error("Line {line}: expected `NAME = VALUE`.")]
    MalformedLine {
        /// One-based line number in the file.
        line: usize,
    },
    /// The value of a recognized key failed to scan.
    #[error("Line {line}: {source}")]
    BadValue {
        /// One-based line number in the file.
        line: usize,
        /// The scanner error.
        source: ValueError,
    },
    /// A recognized key carries a value of the wrong type.
    #[error("The option `{key}` expects a {expected}, got a {got}.")]
    TypeMismatch {
        /// The option name.
        key: &'static str,
        /// The expected literal type.
        expected: &'static str,
        /// The literal type that was supplied.
        got: &'static str,
    },
    /// A score kind or solver name is not recognized.
    #[error("The option `{key}` does not accept `{name}`.")]
    UnknownName {
        /// The option name.
        key: &'static str,
        /// The rejected value.
        name: String,
    },
    /// `max_track_age` must be at least one frame.
    #[error("`max_track_age` must be at least 1.")]
    NonPositiveTrackAge,
    /// `mitosis_link_to_frame` must be zero or negative.
    #[error("`mitosis_link_to_frame` must be zero or negative.")]
    PositiveLinkToFrame,
    /// A gating range must satisfy `lo <= hi`.
    #[error("The range for `{key}` must satisfy lo <= hi.")]
    InvertedRange {
        /// The option name.
        key: &'static str,
    },
}

/// The options recognized by the linker.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkerOptions {
    /// Attribute name used for frame-to-frame linking.
    pub linked_by: String,
    /// Scoring kind for linking.
    pub link_calc: ScoreKind,
    /// Gating interval for linking costs; scores outside become `+∞`.
    pub linking_score_range: (f64, f64),
    /// Frames without an update before a track is retired.
    pub max_track_age: u32,
    /// Enables mitosis detection.
    pub track_mitosis: bool,
    /// Minimum frames since a division before a daughter may divide.
    pub min_age_since_mitosis: u32,
    /// Attribute name used for mitosis scoring.
    pub mitosis_param: String,
    /// Scoring kind for mitosis.
    pub mitosis_calc: ScoreKind,
    /// Gating interval for mitosis scores.
    pub mitosis_score_range: (f64, f64),
    /// Non-positive offset into the parent's series for the mitosis
    /// reference record: `0` is the (just updated) last frame, `-1` the
    /// one before.
    pub mitosis_link_to_frame: i64,
    /// Which assignment algorithm to run.
    pub lap_solver: SolverKind,
}

impl Default for LinkerOptions {
    fn default() -> Self {
        LinkerOptions {
            linked_by: "centroid".to_owned(),
            link_calc: ScoreKind::Euclidean,
            linking_score_range: (0.0, 100.0),
            max_track_age: 2,
            track_mitosis: false,
            min_age_since_mitosis: 2,
            mitosis_param: "pixels".to_owned(),
            mitosis_calc: ScoreKind::PixelIntersect,
            mitosis_score_range: (1.0, 4.0),
            mitosis_link_to_frame: -1,
            lap_solver: SolverKind::Jv,
        }
    }
}

impl LinkerOptions {
    /// Checks the cross-field constraints of the record.
    ///
    /// # Errors
    ///
    /// Returns an error when `max_track_age` is zero, a gating range is
    /// inverted, or `mitosis_link_to_frame` is positive.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_track_age == 0 {
            return Err(OptionsError::NonPositiveTrackAge);
        }
        if self.mitosis_link_to_frame > 0 {
            return Err(OptionsError::PositiveLinkToFrame);
        }
        if self.linking_score_range.0 > self.linking_score_range.1 {
            return Err(OptionsError::InvertedRange { key: "linking_score_range" });
        }
        if self.mitosis_score_range.0 > self.mitosis_score_range.1 {
            return Err(OptionsError::InvertedRange { key: "mitosis_score_range" });
        }
        Ok(())
    }

    /// Loads options from an option file, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, malformed lines, type mismatches
    /// on recognized keys, or failed validation of the resulting record.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Loads options from any buffered reader; see
    /// [`from_file`](Self::from_file).
    ///
    /// # Errors
    ///
    /// As for [`from_file`](Self::from_file), minus file-open failures.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, OptionsError> {
        let mut options = Self::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let content = strip_comment(&line).trim();
            if content.is_empty() {
                continue;
            }
            let Some((key, raw_value)) = content.split_once('=') else {
                return Err(OptionsError::MalformedLine { line: line_number });
            };
            let key = key.trim().to_ascii_lowercase();
            let Some(slot) = recognized_key(&key) else {
                continue;
            };
            let value = parse_value(raw_value)
                .map_err(|source| OptionsError::BadValue { line: line_number, source })?;
            options.apply(slot, &value)?;
        }
        options.validate()?;
        Ok(options)
    }

    /// Writes the record to an option file in the same format
    /// [`from_file`](Self::from_file) reads.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), OptionsError> {
        let mut file = File::create(path)?;
        self.write(&mut file)?;
        Ok(())
    }

    /// Writes the record to any writer; see [`to_file`](Self::to_file).
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn write(&self, writer: &mut impl Write) -> Result<(), OptionsError> {
        for key in RECOGNIZED_KEYS {
            writeln!(writer, "{key} = {}", self.value_of(key))?;
        }
        Ok(())
    }

    fn value_of(&self, key: &'static str) -> OptionValue {
        match key {
            "linked_by" => OptionValue::Text(self.linked_by.clone()),
            "link_calc" => OptionValue::Text(self.link_calc.name().to_owned()),
            "linking_score_range" => OptionValue::Vector(vec![
                self.linking_score_range.0,
                self.linking_score_range.1,
            ]),
            "max_track_age" => OptionValue::Number(f64::from(self.max_track_age)),
            "track_mitosis" => OptionValue::Bool(self.track_mitosis),
            "min_age_since_mitosis" => {
                OptionValue::Number(f64::from(self.min_age_since_mitosis))
            }
            "mitosis_param" => OptionValue::Text(self.mitosis_param.clone()),
            "mitosis_calc" => OptionValue::Text(self.mitosis_calc.name().to_owned()),
            "mitosis_score_range" => OptionValue::Vector(vec![
                self.mitosis_score_range.0,
                self.mitosis_score_range.1,
            ]),
            #[allow(clippy::cast_precision_loss)]
            "mitosis_link_to_frame" => {
                OptionValue::Number(self.mitosis_link_to_frame as f64)
            }
            "lap_solver" => OptionValue::Text(self.lap_solver.name().to_owned()),
            _ => unreachable!("We expected `value_of` to be called with recognized keys only"),
        }
    }

    fn apply(&mut self, key: &'static str, value: &OptionValue) -> Result<(), OptionsError> {
        match key {
            "linked_by" => self.linked_by = expect_text(key, value)?.to_owned(),
            "link_calc" => self.link_calc = parse_score_kind(key, value)?,
            "linking_score_range" => self.linking_score_range = expect_range(key, value)?,
            "max_track_age" => self.max_track_age = expect_count(key, value)?,
            "track_mitosis" => {
                self.track_mitosis = value.as_bool().ok_or(OptionsError::TypeMismatch {
                    key,
                    expected: "boolean",
                    got: value.kind_name(),
                })?;
            }
            "min_age_since_mitosis" => self.min_age_since_mitosis = expect_count(key, value)?,
            "mitosis_param" => self.mitosis_param = expect_text(key, value)?.to_owned(),
            "mitosis_calc" => self.mitosis_calc = parse_score_kind(key, value)?,
            "mitosis_score_range" => self.mitosis_score_range = expect_range(key, value)?,
            "mitosis_link_to_frame" => {
                let number = expect_number(key, value)?;
                if number.fract() != 0.0 {
                    return Err(OptionsError::TypeMismatch {
                        key,
                        expected: "integer",
                        got: "fractional number",
                    });
                }
                #[allow(clippy::cast_possible_truncation)]
                {
                    self.mitosis_link_to_frame = number as i64;
                }
            }
            "lap_solver" => {
                let name = expect_text(key, value)?;
                self.lap_solver = name
                    .parse()
                    .map_err(|_| OptionsError::UnknownName { key, name: name.to_owned() })?;
            }
            _ => unreachable!("We expected `apply` to be called with recognized keys only"),
        }
        Ok(())
    }
}

/// The keys an option file may set, in export order.
const RECOGNIZED_KEYS: [&str; 11] = [
    "linked_by",
    "link_calc",
    "linking_score_range",
    "max_track_age",
    "track_mitosis",
    "min_age_since_mitosis",
    "mitosis_param",
    "mitosis_calc",
    "mitosis_score_range",
    "mitosis_link_to_frame",
    "lap_solver",
];

fn recognized_key(key: &str) -> Option<&'static str> {
    RECOGNIZED_KEYS.iter().copied().find(|&candidate| candidate == key)
}

/// Strips a trailing `#` or `%` comment, ignoring comment characters
/// inside quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    for (index, character) in line.char_indices() {
        match character {
            '\'' => in_quote = !in_quote,
            '#' | '%' if !in_quote => return &line[..index],
            _ => {}
        }
    }
    line
}

fn expect_text<'value>(
    key: &'static str,
    value: &'value OptionValue,
) -> Result<&'value str, OptionsError> {
    value.as_text().ok_or(OptionsError::TypeMismatch {
        key,
        expected: "quoted string",
        got: value.kind_name(),
    })
}

fn expect_number(key: &'static str, value: &OptionValue) -> Result<f64, OptionsError> {
    value.as_number().ok_or(OptionsError::TypeMismatch {
        key,
        expected: "number",
        got: value.kind_name(),
    })
}

fn expect_count(key: &'static str, value: &OptionValue) -> Result<u32, OptionsError> {
    let number = expect_number(key, value)?;
    if number < 0.0 || number.fract() != 0.0 || number > f64::from(u32::MAX) {
        return Err(OptionsError::TypeMismatch {
            key,
            expected: "nonnegative integer",
            got: "number",
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = number as u32;
    Ok(count)
}

fn expect_range(key: &'static str, value: &OptionValue) -> Result<(f64, f64), OptionsError> {
    match value.as_vector() {
        Some([lo, hi]) => Ok((*lo, *hi)),
        _ => Err(OptionsError::TypeMismatch {
            key,
            expected: "two-element vector",
            got: value.kind_name(),
        }),
    }
}

fn parse_score_kind(key: &'static str, value: &OptionValue) -> Result<ScoreKind, OptionsError> {
    let name = expect_text(key, value)?;
    name.parse().map_err(|_| OptionsError::UnknownName { key, name: name.to_owned() })
}
