//! Submodule providing the restricted literal grammar used by option
//! files: numbers, booleans, single-quoted strings, and flat bracketed
//! numeric vectors. Values are scanned, never evaluated.

use core::fmt;

/// Errors that can occur while scanning a literal value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The value is empty.
    #[error("The value is empty.")]
    Empty,
    /// A quoted string has no closing quote.
    #[error("The quoted string is not terminated.")]
    UnterminatedString,
    /// A bracketed vector has no closing bracket.
    #[error("The vector literal is not terminated.")]
    UnterminatedVector,
    /// A vector element is not a number.
    #[error("The vector element `{0}` is not a number.")]
    BadVectorElement(String),
    /// The value is not a recognized literal.
    #[error("`{0}` is not a number, boolean, quoted string, or vector literal.")]
    BadLiteral(String),
}

/// One scanned option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// A real number.
    Number(f64),
    /// A boolean (`true` or `false`).
    Bool(bool),
    /// A single-quoted string, stored without the quotes.
    Text(String),
    /// A flat numeric vector (`[a b c]`).
    Vector(Vec<f64>),
}

impl OptionValue {
    /// A short name for the value's type, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            OptionValue::Number(_) => "number",
            OptionValue::Bool(_) => "boolean",
            OptionValue::Text(_) => "string",
            OptionValue::Vector(_) => "vector",
        }
    }

    /// The value as a number, if it is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OptionValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a string, if it is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// The value as a numeric vector, if it is one.
    #[must_use]
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            OptionValue::Vector(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    /// Writes the value in the same literal form the scanner accepts, so
    /// exported files parse back to the same value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Number(value) => write!(f, "{value}"),
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Text(value) => write!(f, "'{value}'"),
            OptionValue::Vector(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Scans one literal value.
///
/// # Errors
///
/// Returns an error when the text is not a number, a boolean, a
/// single-quoted string, or a flat bracketed numeric vector.
pub fn parse_value(text: &str) -> Result<OptionValue, ValueError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValueError::Empty);
    }
    if let Some(rest) = text.strip_prefix('\'') {
        let Some(content) = rest.strip_suffix('\'') else {
            return Err(ValueError::UnterminatedString);
        };
        if content.contains('\'') {
            return Err(ValueError::BadLiteral(text.to_owned()));
        }
        return Ok(OptionValue::Text(content.to_owned()));
    }
    if let Some(rest) = text.strip_prefix('[') {
        let Some(content) = rest.strip_suffix(']') else {
            return Err(ValueError::UnterminatedVector);
        };
        let mut values = Vec::new();
        for element in content.split([' ', ',', '\t']).filter(|element| !element.is_empty()) {
            let value: f64 = element
                .parse()
                .map_err(|_| ValueError::BadVectorElement(element.to_owned()))?;
            values.push(value);
        }
        return Ok(OptionValue::Vector(values));
    }
    match text {
        "true" => return Ok(OptionValue::Bool(true)),
        "false" => return Ok(OptionValue::Bool(false)),
        _ => {}
    }
    text.parse::<f64>()
        .map(OptionValue::Number)
        .map_err(|_| ValueError::BadLiteral(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number() {
        assert_eq!(parse_value("3.25"), Ok(OptionValue::Number(3.25)));
        assert_eq!(parse_value("-2"), Ok(OptionValue::Number(-2.0)));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(parse_value("true"), Ok(OptionValue::Bool(true)));
        assert_eq!(parse_value(" false "), Ok(OptionValue::Bool(false)));
    }

    #[test]
    fn test_quoted_string() {
        assert_eq!(parse_value("'centroid'"), Ok(OptionValue::Text("centroid".to_owned())));
        assert_eq!(parse_value("'abc"), Err(ValueError::UnterminatedString));
    }

    #[test]
    fn test_vector() {
        assert_eq!(parse_value("[0 100]"), Ok(OptionValue::Vector(vec![0.0, 100.0])));
        assert_eq!(parse_value("[1, 2.5]"), Ok(OptionValue::Vector(vec![1.0, 2.5])));
        assert_eq!(parse_value("[]"), Ok(OptionValue::Vector(vec![])));
        assert_eq!(
            parse_value("[1 x]"),
            Err(ValueError::BadVectorElement("x".to_owned()))
        );
    }

    #[test]
    fn test_rejects_code_like_text() {
        assert!(parse_value("system('rm -rf /')").is_err());
        assert!(parse_value("1 + 1").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["1.5", "true", "'centroid'", "[0 100]"] {
            let value = parse_value(text).unwrap();
            assert_eq!(parse_value(&value.to_string()), Ok(value));
        }
    }
}
