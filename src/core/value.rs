//! Structured state values.
//!
//! Every piece of data that crosses a runtime boundary (event payloads,
//! replay snapshots, save files) is a tree of [`StateValue`]s. The engine
//! never interprets these trees; games decide what keys and shapes mean.
//!
//! ## Value Types
//!
//! - `Null`, `Bool`, `Int`, `Float`, `Text`: scalars
//! - `List`: ordered sequence of values
//! - `Map`: string-keyed map, ordered by key
//!
//! Lists and maps use `im` persistent collections, so cloning a state tree
//! is O(1) and a clone never aliases the original's mutations.

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

/// String-keyed map of state values, ordered by key.
pub type StateMap = OrdMap<String, StateValue>;

/// Ordered list of state values.
pub type StateList = Vector<StateValue>;

/// Payload carried by events and recorded actions.
pub type Payload = StateMap;

/// A node in a structured state tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    /// Absence of a value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer value (scores, counters, indices).
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Ordered list.
    List(StateList),
    /// Key-ordered map.
    Map(StateMap),
}

impl StateValue {
    /// Create an empty map value.
    #[must_use]
    pub fn map() -> Self {
        StateValue::Map(StateMap::new())
    }

    /// Create an empty list value.
    #[must_use]
    pub fn list() -> Self {
        StateValue::List(StateList::new())
    }

    /// Check if this is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }

    /// Get as bool if this is a Bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as integer if this is an Int value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as float. Int values are widened.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            StateValue::Float(v) => Some(*v),
            StateValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as string reference if this is a Text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as list reference if this is a List value.
    #[must_use]
    pub fn as_list(&self) -> Option<&StateList> {
        match self {
            StateValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Get as map reference if this is a Map value.
    #[must_use]
    pub fn as_map(&self) -> Option<&StateMap> {
        match self {
            StateValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a key if this is a Map value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Get an integer field of a map, or a default.
    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(StateValue::as_int).unwrap_or(default)
    }

    /// Insert a key (builder pattern).
    ///
    /// Non-map values are replaced by a single-entry map.
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        let mut map = match self {
            StateValue::Map(m) => m,
            _ => StateMap::new(),
        };
        map.insert(key.into(), value.into());
        StateValue::Map(map)
    }

    /// Nesting depth: 0 for scalars, 1 plus the deepest child for lists
    /// and maps.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            StateValue::List(items) => 1 + items.iter().map(StateValue::depth).max().unwrap_or(0),
            StateValue::Map(map) => 1 + map.values().map(StateValue::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Convert to a JSON value.
    ///
    /// Returns `None` if the tree contains a non-finite float, which JSON
    /// cannot represent.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;

        Some(match self {
            StateValue::Null => Value::Null,
            StateValue::Bool(b) => Value::Bool(*b),
            StateValue::Int(i) => Value::from(*i),
            StateValue::Float(f) => Value::Number(serde_json::Number::from_f64(*f)?),
            StateValue::Text(s) => Value::String(s.clone()),
            StateValue::List(items) => Value::Array(
                items.iter().map(StateValue::to_json).collect::<Option<Vec<_>>>()?,
            ),
            StateValue::Map(map) => Value::Object(map_to_json(map)?),
        })
    }

    /// Build a state value from JSON.
    ///
    /// Integers that fit in `i64` become `Int`; every other number becomes
    /// `Float`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => StateValue::Null,
            Value::Bool(b) => StateValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => StateValue::Int(i),
                None => StateValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => StateValue::Text(s.clone()),
            Value::Array(items) => StateValue::List(items.iter().map(StateValue::from_json).collect()),
            Value::Object(map) => StateValue::Map(map_from_json(map)),
        }
    }
}

/// Convert a state map to a JSON object.
///
/// Returns `None` if any value holds a non-finite float.
#[must_use]
pub fn map_to_json(map: &StateMap) -> Option<serde_json::Map<String, serde_json::Value>> {
    map.iter()
        .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
        .collect()
}

/// Convert a JSON object to a state map.
#[must_use]
pub fn map_from_json(map: &serde_json::Map<String, serde_json::Value>) -> StateMap {
    map.iter()
        .map(|(k, v)| (k.clone(), StateValue::from_json(v)))
        .collect()
}

/// Build a payload from key/value pairs.
///
/// ```
/// use rust_arcade::core::{payload, StateValue};
///
/// let p = payload([("pos", StateValue::from("A1")), ("turn", 3.into())]);
/// assert_eq!(p.get("turn"), Some(&StateValue::Int(3)));
/// ```
pub fn payload<K, I>(entries: I) -> Payload
where
    K: Into<String>,
    I: IntoIterator<Item = (K, StateValue)>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Int(v)
    }
}

impl From<i32> for StateValue {
    fn from(v: i32) -> Self {
        StateValue::Int(i64::from(v))
    }
}

impl From<u32> for StateValue {
    fn from(v: u32) -> Self {
        StateValue::Int(i64::from(v))
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Float(v)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        StateValue::Text(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        StateValue::Text(s)
    }
}

impl From<StateMap> for StateValue {
    fn from(m: StateMap) -> Self {
        StateValue::Map(m)
    }
}

impl From<StateList> for StateValue {
    fn from(v: StateList) -> Self {
        StateValue::List(v)
    }
}

impl<T: Into<StateValue>> From<Vec<T>> for StateValue {
    fn from(v: Vec<T>) -> Self {
        StateValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(StateValue::Null, Into::into)
    }
}

impl From<&serde_json::Value> for StateValue {
    fn from(v: &serde_json::Value) -> Self {
        StateValue::from_json(v)
    }
}

impl From<serde_json::Value> for StateValue {
    fn from(v: serde_json::Value) -> Self {
        StateValue::from_json(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        assert_eq!(StateValue::Int(5).as_int(), Some(5));
        assert_eq!(StateValue::Int(5).as_float(), Some(5.0));
        assert_eq!(StateValue::Bool(true).as_bool(), Some(true));
        assert_eq!(StateValue::from("x").as_text(), Some("x"));
        assert!(StateValue::Null.is_null());
        assert_eq!(StateValue::Text("x".into()).as_int(), None);
    }

    #[test]
    fn test_depth() {
        assert_eq!(StateValue::Int(1).depth(), 0);
        assert_eq!(StateValue::map().depth(), 1);

        let nested = StateValue::map()
            .with("flat", 1)
            .with("deck", StateValue::from(vec![vec![1i64, 2], vec![3]]));
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn test_builder_and_get() {
        let v = StateValue::map().with("score", 10).with("name", "war");

        assert_eq!(v.get_int("score", 0), 10);
        assert_eq!(v.get_int("missing", -1), -1);
        assert_eq!(v.get("name").and_then(StateValue::as_text), Some("war"));
    }

    #[test]
    fn test_clone_does_not_alias() {
        let original = StateValue::map().with("score", 1);
        let snapshot = original.clone();

        let modified = original.with("score", 2);

        assert_eq!(snapshot.get_int("score", 0), 1);
        assert_eq!(modified.get_int("score", 0), 2);
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({
            "score": 10,
            "ratio": 0.5,
            "names": ["a", "b"],
            "nested": {"ok": true, "none": null},
        });

        let value = StateValue::from_json(&json);
        assert_eq!(value.get_int("score", 0), 10);
        assert_eq!(value.get("ratio"), Some(&StateValue::Float(0.5)));
        assert_eq!(value.get("names").and_then(StateValue::as_list).map(|l| l.len()), Some(2));

        assert_eq!(value.to_json(), Some(json));
    }

    #[test]
    fn test_json_rejects_nan() {
        let value = StateValue::map().with("bad", f64::NAN);
        assert!(value.to_json().is_none());
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let value = StateValue::from_json(&json!(u64::MAX));
        assert!(matches!(value, StateValue::Float(_)));
    }

    #[test]
    fn test_payload_helper() {
        let p = payload([("pos", StateValue::from("A1"))]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get("pos"), Some(&StateValue::Text("A1".into())));
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(StateValue::from(vec![1, 2]), StateValue::List(im::vector![1.into(), 2.into()]));
        assert_eq!(StateValue::from(None::<i64>), StateValue::Null);
        assert_eq!(StateValue::from(Some(3i64)), StateValue::Int(3));
    }

    #[test]
    fn test_bincode_round_trip() {
        let value = StateValue::map()
            .with("score", 10)
            .with("hand", vec!["A", "K"])
            .with("ratio", 1.5);

        let bytes = bincode::serialize(&value).unwrap();
        let decoded: StateValue = bincode::deserialize(&bytes).unwrap();
        assert_eq!(value, decoded);
    }
}
