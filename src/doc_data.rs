//! Local payload cell for a document handle, with dirty tracking.
//!
//! [`DocData`] holds one document's JSON payload plus a status flag set
//! `{pristine, changed, empty}` that the owning [`Doc`](crate::doc::Doc)
//! consults to decide whether a save is needed and whether a fetch must
//! happen first.
//!
//! # Invariants
//!
//! - `empty == true` iff no payload is held.
//! - Application mutations ([`set`](DocData::set), [`merge`](DocData::merge))
//!   reject payloads carrying reserved (`_`-prefixed) top-level keys *before*
//!   touching any state, and force `changed = true` on success.
//! - Store-fetched payloads are installed through the crate-internal
//!   [`replace`](DocData::replace), which accepts reserved keys and marks the
//!   cell pristine.
//!
//! # Examples
//!
//! ```
//! use megacouch::DocData;
//! use serde_json::json;
//!
//! let mut data = DocData::new();
//! assert!(data.status().empty);
//!
//! data.set(json!({"a": 1})).unwrap().merge(json!({"b": 2})).unwrap();
//! assert_eq!(data.value(), Some(json!({"a": 1, "b": 2})));
//! assert!(data.status().changed);
//!
//! // Reserved keys are a hard validation error, not a silent strip.
//! assert!(data.set(json!({"_rev": "1-a"})).is_err());
//! assert_eq!(data.value(), Some(json!({"a": 1, "b": 2})));
//! ```

use crate::error::Result;
use crate::validate;
use serde_json::Value;

/// Tri-state status flags of a [`DocData`] cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocStatus {
    /// The payload mirrors what was last read from the store.
    pub pristine: bool,
    /// The payload carries local mutations not yet saved.
    pub changed: bool,
    /// No payload is held.
    pub empty: bool,
}

impl Default for DocStatus {
    fn default() -> Self {
        DocStatus {
            pristine: true,
            changed: false,
            empty: true,
        }
    }
}

/// A document payload plus its dirty-tracking status.
///
/// A plain mutable cell: no change-notification machinery, just explicit
/// getters and status flags. Not meant to be shared across concurrent
/// mutation paths; use one handle per logical unit of work.
#[derive(Debug, Clone, Default)]
pub struct DocData {
    value: Option<Value>,
    status: DocStatus,
}

impl DocData {
    /// An empty cell.
    pub fn new() -> Self {
        DocData::default()
    }

    /// A cell pre-seeded with a payload, marked non-empty but unchanged.
    pub fn with_value(value: Value) -> Self {
        DocData {
            value: Some(value),
            status: DocStatus {
                pristine: true,
                changed: false,
                empty: false,
            },
        }
    }

    /// Current status flags.
    pub fn status(&self) -> DocStatus {
        self.status
    }

    /// Clone of the held payload, `None` when empty.
    pub fn value(&self) -> Option<Value> {
        self.value.clone()
    }

    /// Replace the payload wholesale.
    ///
    /// Rejects reserved (`_`-prefixed) top-level keys, leaving prior state
    /// untouched on failure. Marks the cell changed.
    pub fn set(&mut self, data: Value) -> Result<&mut Self> {
        validate::check_no_reserved_keys(&data)?;
        self.value = Some(data);
        self.mark_changed();
        Ok(self)
    }

    /// Deep-merge a payload into the existing one.
    ///
    /// Existing keys are overwritten; nested objects are combined
    /// key-by-key. Merging into an empty cell behaves like [`set`](Self::set).
    /// Rejects reserved top-level keys, leaving prior state untouched on
    /// failure. Marks the cell changed.
    pub fn merge(&mut self, data: Value) -> Result<&mut Self> {
        validate::check_no_reserved_keys(&data)?;
        match self.value.take() {
            Some(mut existing) => {
                deep_merge(&mut existing, data);
                self.value = Some(existing);
            }
            None => self.value = Some(data),
        }
        self.mark_changed();
        Ok(self)
    }

    /// Install a payload fetched from the store: reserved keys allowed,
    /// status pristine.
    pub(crate) fn replace(&mut self, data: Value) {
        self.value = Some(data);
        self.status = DocStatus {
            pristine: true,
            changed: false,
            empty: false,
        };
    }

    /// Mark the payload as written through to the store: the local copy
    /// and the remote document agree again.
    pub(crate) fn mark_saved(&mut self) {
        if self.value.is_some() {
            self.status = DocStatus {
                pristine: true,
                changed: false,
                empty: false,
            };
        }
    }

    /// Drop the payload and reset the status flags.
    pub fn clear(&mut self) -> &mut Self {
        self.value = None;
        self.status = DocStatus::default();
        self
    }

    fn mark_changed(&mut self) {
        self.status = DocStatus {
            pristine: false,
            changed: true,
            empty: false,
        };
    }
}

/// Merge `incoming` into `existing`: objects combine key-by-key, any other
/// pairing is overwritten by the incoming value.
fn deep_merge(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(existing_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                match existing_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        existing_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_cell_is_empty_and_pristine() {
        let data = DocData::new();
        let status = data.status();
        assert!(status.empty);
        assert!(status.pristine);
        assert!(!status.changed);
        assert_eq!(data.value(), None);
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let mut data = DocData::new();
        data.set(json!({"a": 1})).unwrap();
        data.set(json!({"b": 2})).unwrap();
        assert_eq!(data.value(), Some(json!({"b": 2})));
        assert!(data.status().changed);
        assert!(!data.status().empty);
    }

    #[test]
    fn test_merge_accumulates() {
        let mut data = DocData::new();
        data.merge(json!({"a": 1})).unwrap().merge(json!({"b": 2})).unwrap();
        assert_eq!(data.value(), Some(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_merge_combines_nested_objects() {
        let mut data = DocData::new();
        data.set(json!({"addr": {"city": "x", "zip": "1"}, "n": 1})).unwrap();
        data.merge(json!({"addr": {"city": "y"}})).unwrap();
        assert_eq!(
            data.value(),
            Some(json!({"addr": {"city": "y", "zip": "1"}, "n": 1}))
        );
    }

    #[test]
    fn test_merge_overwrites_non_object_values() {
        let mut data = DocData::new();
        data.set(json!({"tags": ["a"]})).unwrap();
        data.merge(json!({"tags": ["b"]})).unwrap();
        assert_eq!(data.value(), Some(json!({"tags": ["b"]})));
    }

    #[test]
    fn test_reserved_keys_rejected_and_state_untouched() {
        let mut data = DocData::new();
        data.set(json!({"a": 1})).unwrap();
        assert!(data.set(json!({"_anything": 1})).is_err());
        assert!(data.merge(json!({"_rev": "2-b"})).is_err());
        assert_eq!(data.value(), Some(json!({"a": 1})));
        assert!(data.status().changed);
    }

    #[test]
    fn test_replace_marks_pristine_and_allows_reserved_keys() {
        let mut data = DocData::new();
        data.replace(json!({"_id": "x", "_rev": "1-a", "total": 10}));
        let status = data.status();
        assert!(status.pristine);
        assert!(!status.changed);
        assert!(!status.empty);
    }

    #[test]
    fn test_clear_resets() {
        let mut data = DocData::new();
        data.set(json!({"a": 1})).unwrap();
        data.clear();
        assert!(data.status().empty);
        assert!(!data.status().changed);
        assert_eq!(data.value(), None);
    }
}
