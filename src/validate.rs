//! Pure validation helpers shared across the client.
//!
//! These functions hold no state and hit no network; every caller runs them
//! *before* issuing a request so that malformed input fails fast with a
//! typed error instead of a confusing server rejection.
//!
//! # Rules
//!
//! | Check | Rule |
//! |-------|------|
//! | Database name | must match `^[a-z][a-z0-9_$()+/-]*$` |
//! | Document payload | no top-level key may start with `_` |
//!
//! Underscore-prefixed keys (`_id`, `_rev`, `_deleted`, `_attachments`, …)
//! are reserved for the store's own metadata and are stamped onto payloads
//! by the client itself, never by application `set`/`merge` calls.

use crate::error::{CouchError, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn db_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_$()+/-]*$").unwrap())
}

/// Validate a database name against CouchDB's naming rules.
///
/// Returns the name unchanged on success so call sites can validate and
/// use in one expression.
///
/// # Examples
///
/// ```
/// use megacouch::validate::database_name;
///
/// assert!(database_name("orders").is_ok());
/// assert!(database_name("Orders").is_err());
/// assert!(database_name("").is_err());
/// ```
pub fn database_name(name: &str) -> Result<&str> {
    if name.is_empty() || !db_name_regex().is_match(name) {
        return Err(CouchError::InvalidDatabaseName(name.to_string()));
    }
    Ok(name)
}

/// First reserved (underscore-prefixed) top-level key of a JSON object.
///
/// Non-object values have no keys and therefore never contain one.
pub fn reserved_key(payload: &Value) -> Option<&str> {
    match payload {
        Value::Object(map) => map.keys().find(|k| k.starts_with('_')).map(String::as_str),
        _ => None,
    }
}

/// Reject payloads that try to set the store's reserved keys.
pub fn check_no_reserved_keys(payload: &Value) -> Result<()> {
    match reserved_key(payload) {
        Some(key) => Err(CouchError::ReservedKey(key.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_database_names() {
        for name in ["a", "orders", "a1", "a_b", "a$b", "a(b)", "a+b", "a/b", "a-b"] {
            assert!(database_name(name).is_ok(), "expected {name:?} to be valid");
        }
    }

    #[test]
    fn test_invalid_database_names() {
        for name in ["", "Orders", "1orders", "_users", "orders!", "ORDERS"] {
            assert!(database_name(name).is_err(), "expected {name:?} to be invalid");
        }
    }

    #[test]
    fn test_reserved_key_detection() {
        assert_eq!(reserved_key(&json!({"_id": "x"})), Some("_id"));
        assert_eq!(reserved_key(&json!({"_anything": 1})), Some("_anything"));
        assert_eq!(reserved_key(&json!({"name": "x"})), None);
        assert_eq!(reserved_key(&json!("scalar")), None);
        assert_eq!(reserved_key(&json!([{"_id": "x"}])), None);
    }

    #[test]
    fn test_check_no_reserved_keys() {
        assert!(check_no_reserved_keys(&json!({"total": 10})).is_ok());
        let err = check_no_reserved_keys(&json!({"_rev": "1-a"})).unwrap_err();
        assert!(err.to_string().contains("_rev"));
    }
}
