//! Tool argument validation.
//!
//! Every argument is checked before a tool makes its first network call.
//! Identifiers that end up in URL paths must match `[A-Za-z0-9_.~-]+` and
//! may not be a `.` or `..` path segment.

use serde_json::{Map, Value};

use crate::error::{IntegrationError, IntegrationResult};

/// Default cap on free-text arguments.
pub const MAX_TEXT_LEN: usize = 256;

/// True if `s` is a non-empty identifier safe to splice into a URL path.
pub fn is_safe_id(s: &str) -> bool {
    !s.is_empty()
        && !matches!(s, "." | "..")
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '~' | '-'))
}

/// Arguments of one tool call.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Map<String, Value>,
}

fn invalid(name: &str, reason: impl std::fmt::Display) -> IntegrationError {
    IntegrationError::InvalidArgument(format!("{name}: {reason}"))
}

impl Args {
    /// Accepts an object, or `null` for no arguments.
    pub fn from_value(value: Value) -> IntegrationResult<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(IntegrationError::InvalidArgument(format!(
                "arguments must be an object, got {other}"
            ))),
        }
    }

    fn present(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn opt_string(&self, name: &str, max_len: usize) -> IntegrationResult<Option<String>> {
        match self.present(name) {
            None => Ok(None),
            Some(Value::String(s)) if s.chars().count() > max_len => {
                Err(invalid(name, format!("longer than {max_len} characters")))
            }
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(invalid(name, "expected a string")),
        }
    }

    pub fn string(&self, name: &str, max_len: usize) -> IntegrationResult<String> {
        self.opt_string(name, max_len)?
            .ok_or_else(|| invalid(name, "is required"))
    }

    pub fn opt_safe_id(&self, name: &str) -> IntegrationResult<Option<String>> {
        match self.opt_string(name, MAX_TEXT_LEN)? {
            Some(id) if !is_safe_id(&id) => Err(invalid(name, "invalid ID format")),
            other => Ok(other),
        }
    }

    pub fn safe_id(&self, name: &str) -> IntegrationResult<String> {
        self.opt_safe_id(name)?
            .ok_or_else(|| invalid(name, "is required"))
    }

    pub fn opt_int(&self, name: &str, min: i64, max: i64) -> IntegrationResult<Option<i64>> {
        let Some(value) = self.present(name) else {
            return Ok(None);
        };
        let n = value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| invalid(name, "expected an integer"))?;
        if n < min || n > max {
            return Err(invalid(name, format!("must be between {min} and {max}")));
        }
        Ok(Some(n))
    }

    pub fn int_or(&self, name: &str, min: i64, max: i64, default: i64) -> IntegrationResult<i64> {
        Ok(self.opt_int(name, min, max)?.unwrap_or(default))
    }

    pub fn opt_enum(&self, name: &str, allowed: &[&str]) -> IntegrationResult<Option<String>> {
        match self.opt_string(name, MAX_TEXT_LEN)? {
            Some(v) if !allowed.contains(&v.as_str()) => Err(invalid(
                name,
                format!("must be one of {}", allowed.join(", ")),
            )),
            other => Ok(other),
        }
    }

    pub fn enum_or(&self, name: &str, allowed: &[&str], default: &str) -> IntegrationResult<String> {
        Ok(self
            .opt_enum(name, allowed)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// List of strings, empty when absent.
    pub fn strings(&self, name: &str, max_len: usize) -> IntegrationResult<Vec<String>> {
        match self.present(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) if s.chars().count() <= max_len => Ok(s.clone()),
                    Value::String(_) => Err(invalid(name, format!("item longer than {max_len} characters"))),
                    _ => Err(invalid(name, "expected an array of strings")),
                })
                .collect(),
            Some(_) => Err(invalid(name, "expected an array of strings")),
        }
    }

    /// Non-empty list of safe identifiers.
    pub fn safe_ids(&self, name: &str) -> IntegrationResult<Vec<String>> {
        let ids = self.strings(name, MAX_TEXT_LEN)?;
        if ids.is_empty() {
            return Err(invalid(name, "at least one ID is required"));
        }
        if ids.iter().any(|id| !is_safe_id(id)) {
            return Err(invalid(name, "invalid ID format"));
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Args {
        Args::from_value(value).unwrap()
    }

    #[test]
    fn test_safe_id() {
        assert!(is_safe_id("001"));
        assert!(is_safe_id("~123"));
        assert!(is_safe_id("indicator--a1b2.c_d"));
        assert!(!is_safe_id(""));
        assert!(!is_safe_id("../etc/passwd"));
        assert!(!is_safe_id("a b"));
        assert!(!is_safe_id("a?x=1"));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let err = args(json!({"agent_id": "../../security/users"}))
            .safe_id("agent_id")
            .unwrap_err();
        assert_eq!(
            err,
            IntegrationError::InvalidArgument("agent_id: invalid ID format".into())
        );
    }

    #[test]
    fn test_dot_segments_rejected() {
        assert!(!is_safe_id("."));
        assert!(!is_safe_id(".."));
        assert!(is_safe_id("..."));
        assert!(is_safe_id(".hidden"));
        let a = args(json!({"case_id": "..", "ids": ["~1", "."]}));
        assert!(a.safe_id("case_id").is_err());
        assert!(a.safe_ids("ids").is_err());
    }

    #[test]
    fn test_int_range_and_default() {
        let a = args(json!({"limit": 50, "level": 16, "f": 3.0}));
        assert_eq!(a.int_or("limit", 1, 100, 20).unwrap(), 50);
        assert_eq!(a.int_or("missing", 1, 100, 20).unwrap(), 20);
        assert_eq!(a.opt_int("f", 1, 5).unwrap(), Some(3));
        assert!(a.opt_int("level", 1, 15).is_err());
    }

    #[test]
    fn test_enum_and_strings() {
        let a = args(json!({"status": "active", "bad": "gone", "tags": ["a", "b"], "n": 1}));
        let allowed = ["active", "disconnected"];
        assert_eq!(a.opt_enum("status", &allowed).unwrap().as_deref(), Some("active"));
        assert!(a.opt_enum("bad", &allowed).is_err());
        assert_eq!(a.strings("tags", 10).unwrap(), vec!["a", "b"]);
        assert!(a.strings("n", 10).is_err());
        assert!(a.string("missing", 10).is_err());
    }

    #[test]
    fn test_text_length_cap() {
        let a = args(json!({"search": "x".repeat(257)}));
        assert!(a.opt_string("search", MAX_TEXT_LEN).is_err());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Args::from_value(json!([1])).is_err());
        assert!(Args::from_value(Value::Null).is_ok());
    }
}
