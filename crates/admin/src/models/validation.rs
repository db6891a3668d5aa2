//! Field-keyed validation errors.

use std::collections::BTreeMap;

use serde::Serialize;

/// Validation failures keyed by the camelCase name of the offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`. The first error per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_insert_with(|| message.into());
    }

    /// Keep the value of `result`, recording its error under `field`.
    pub fn check<T, E: std::fmt::Display>(
        &mut self,
        field: &str,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Iterate `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("title", "is required");
        errors.add("title", "is too long");
        errors.add("apply", "must not be empty");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("title"), Some("is required"));
        assert_eq!(errors.to_string(), "apply: must not be empty; title: is required");
    }

    #[test]
    fn test_check_records_error() {
        let mut errors = FieldErrors::new();
        let ok: Option<i32> = errors.check("a", Ok::<_, String>(1));
        let bad: Option<i32> = errors.check("b", Err::<i32, _>("nope"));

        assert_eq!(ok, Some(1));
        assert_eq!(bad, None);
        assert_eq!(errors.get("b"), Some("nope"));
    }

    #[test]
    fn test_serializes_as_map() {
        let mut errors = FieldErrors::new();
        errors.add("valueType", "is required");
        let json = serde_json::to_value(&errors).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"valueType": "is required"}));
    }
}
