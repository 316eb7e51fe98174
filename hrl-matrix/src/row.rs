use hrl_core::{HrlError, HrlResult};
use indexmap::IndexMap;
use std::fmt::Display;

/// One line of a design or result matrix, keyed by column name in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(IndexMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Display) -> &mut Self {
        self.0.insert(column.into(), value.to_string());
        self
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Display) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Parses a column, e.g. `row.parse::<f32>("Luminance")`.
    pub fn parse<T: std::str::FromStr>(&self, column: &str) -> Option<T> {
        self.get(column)?.parse().ok()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Renders the row in `headers` order, one space between fields.
    ///
    /// Every header must be present, no other column may be, and each value
    /// must be a single token so the line splits back into the same fields.
    pub fn to_line(&self, headers: &[String]) -> HrlResult<String> {
        if let Some(extra) = self.columns().find(|c| !headers.iter().any(|h| h == c)) {
            return Err(HrlError::UnexpectedColumn(extra.to_string()));
        }
        let mut fields = Vec::with_capacity(headers.len());
        for header in headers {
            let value = self
                .get(header)
                .ok_or_else(|| HrlError::MissingColumn(header.clone()))?;
            if !is_token(value) {
                return Err(HrlError::InvalidValue {
                    column: header.clone(),
                    value: value.to_string(),
                });
            }
            fields.push(value);
        }
        Ok(fields.join(" "))
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}

/// A non-empty string without whitespace.
pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

/// Checks a header list before it is written to or compared with a file.
pub fn validate_headers(headers: &[String]) -> HrlResult<()> {
    for (idx, header) in headers.iter().enumerate() {
        if !is_token(header) {
            return Err(HrlError::InvalidHeader(header.clone()));
        }
        if headers[..idx].contains(header) {
            return Err(HrlError::DuplicateHeader(header.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["Input".to_string(), "Output".to_string()]
    }

    #[test]
    fn line_follows_header_order() {
        let row = Row::new().with("Output", 0.5).with("Input", 1);
        assert_eq!(row.to_line(&headers()).unwrap(), "1 0.5");
    }

    #[test]
    fn missing_and_extra_columns_are_rejected() {
        let row = Row::new().with("Input", 1);
        assert!(matches!(
            row.to_line(&headers()),
            Err(HrlError::MissingColumn(c)) if c == "Output"
        ));

        let row = Row::new().with("Input", 1).with("Output", 2).with("Extra", 3);
        assert!(matches!(
            row.to_line(&headers()),
            Err(HrlError::UnexpectedColumn(c)) if c == "Extra"
        ));
    }

    #[test]
    fn values_must_be_single_tokens() {
        let row = Row::new().with("Input", "a b").with("Output", 1);
        assert!(matches!(
            row.to_line(&headers()),
            Err(HrlError::InvalidValue { .. })
        ));
        let row = Row::new().with("Input", "").with("Output", 1);
        assert!(row.to_line(&headers()).is_err());
    }

    #[test]
    fn header_validation() {
        assert!(validate_headers(&headers()).is_ok());
        assert!(matches!(
            validate_headers(&["In put".to_string()]),
            Err(HrlError::InvalidHeader(_))
        ));
        assert!(matches!(
            validate_headers(&["A".to_string(), "A".to_string()]),
            Err(HrlError::DuplicateHeader(_))
        ));
    }

    #[test]
    fn typed_access() {
        let row: Row = [("Luminance", "0.25"), ("Trial", "x")].into_iter().collect();
        assert_eq!(row.parse::<f32>("Luminance"), Some(0.25));
        assert_eq!(row.parse::<u32>("Trial"), None);
        assert_eq!(row.parse::<u32>("Missing"), None);
    }
}
