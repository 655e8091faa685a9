//! Typed path lookup over loosely structured API objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A nested field was absent or had an unexpected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("field `{path}` is missing")]
    Missing { path: String },

    #[error("field `{path}` is not a {expected}")]
    Malformed { path: String, expected: &'static str },
}

/// An arbitrary API object, held as a JSON tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredResource(Value);

impl StructuredResource {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Walk `path` from the root. Never panics; every gap is a [`FieldError`].
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Missing`] when a segment is absent and
    /// [`FieldError::Malformed`] when an intermediate value is not a mapping.
    pub fn field(&self, path: &[&str]) -> Result<&Value, FieldError> {
        let mut current = &self.0;
        for (depth, segment) in path.iter().enumerate() {
            let map = current.as_object().ok_or_else(|| FieldError::Malformed {
                path: join(&path[..depth]),
                expected: "mapping",
            })?;
            current = map.get(*segment).ok_or_else(|| FieldError::Missing {
                path: join(&path[..=depth]),
            })?;
        }
        Ok(current)
    }

    /// # Errors
    ///
    /// Fails when the field is missing or not a string.
    pub fn str_field(&self, path: &[&str]) -> Result<&str, FieldError> {
        self.field(path)?
            .as_str()
            .ok_or_else(|| malformed(path, "string"))
    }

    /// # Errors
    ///
    /// Fails when the field is missing or not a boolean.
    pub fn bool_field(&self, path: &[&str]) -> Result<bool, FieldError> {
        self.field(path)?
            .as_bool()
            .ok_or_else(|| malformed(path, "boolean"))
    }

    /// # Errors
    ///
    /// Fails when the field is missing or not a sequence.
    pub fn seq_field(&self, path: &[&str]) -> Result<&Vec<Value>, FieldError> {
        self.field(path)?
            .as_array()
            .ok_or_else(|| malformed(path, "sequence"))
    }

    /// # Errors
    ///
    /// Fails when the field is missing or not a mapping.
    pub fn map_field(&self, path: &[&str]) -> Result<&Map<String, Value>, FieldError> {
        self.field(path)?
            .as_object()
            .ok_or_else(|| malformed(path, "mapping"))
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.str_field(&["metadata", "name"]).ok()
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.str_field(&["metadata", "namespace"]).ok()
    }
}

impl From<Value> for StructuredResource {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn join(path: &[&str]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

fn malformed(path: &[&str], expected: &'static str) -> FieldError {
    FieldError::Malformed {
        path: join(path),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backup_location() -> StructuredResource {
        StructuredResource::new(json!({
            "metadata": { "name": "default", "namespace": "velero" },
            "spec": { "provider": "aws" },
            "status": { "phase": "Available", "ready": true, "conditions": [] }
        }))
    }

    #[test]
    fn test_reads_nested_scalars() {
        let bsl = backup_location();
        assert_eq!(bsl.str_field(&["status", "phase"]).unwrap(), "Available");
        assert!(bsl.bool_field(&["status", "ready"]).unwrap());
        assert!(bsl.seq_field(&["status", "conditions"]).unwrap().is_empty());
        assert_eq!(bsl.name(), Some("default"));
        assert_eq!(bsl.namespace(), Some("velero"));
    }

    #[test]
    fn test_missing_segment_reports_partial_path() {
        let bsl = backup_location();
        let err = bsl.field(&["status", "lastSyncedTime"]).unwrap_err();
        assert_eq!(
            err,
            FieldError::Missing {
                path: "status.lastSyncedTime".to_string()
            }
        );
    }

    #[test]
    fn test_descending_through_scalar_is_malformed() {
        let bsl = backup_location();
        let err = bsl.field(&["spec", "provider", "name"]).unwrap_err();
        assert_eq!(
            err,
            FieldError::Malformed {
                path: "spec.provider".to_string(),
                expected: "mapping"
            }
        );
    }

    #[test]
    fn test_wrong_leaf_type_is_malformed() {
        let bsl = backup_location();
        assert!(matches!(
            bsl.bool_field(&["status", "phase"]),
            Err(FieldError::Malformed { expected: "boolean", .. })
        ));
        assert!(matches!(
            bsl.seq_field(&["status", "phase"]),
            Err(FieldError::Malformed { expected: "sequence", .. })
        ));
    }

    #[test]
    fn test_non_object_root() {
        let scalar = StructuredResource::new(json!("just a string"));
        assert!(scalar.field(&["status"]).is_err());
        assert_eq!(scalar.name(), None);
        assert_eq!(scalar.field(&[]).unwrap(), &json!("just a string"));
    }
}
