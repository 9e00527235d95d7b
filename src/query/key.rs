//! Cache keys and invalidation filters
//!
//! A key is the pair `(resource, input)`. The input is kept in its JSON form,
//! which gives structural equality for free: two inputs that serialize to the
//! same document address the same entry.

use crate::error::QueryKitResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies one cached result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryKey {
    resource: String,
    input: Value,
}

impl QueryKey {
    /// Build a key from a resource name and any serializable input
    pub fn new<I: Serialize + ?Sized>(
        resource: impl Into<String>,
        input: &I,
    ) -> QueryKitResult<Self> {
        Ok(Self {
            resource: resource.into(),
            input: serde_json::to_value(input)?,
        })
    }

    /// Build a key from an already-encoded input
    pub fn from_value(resource: impl Into<String>, input: Value) -> Self {
        Self {
            resource: resource.into(),
            input,
        }
    }

    /// Resource name this key belongs to
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Encoded input
    pub fn input(&self) -> &Value {
        &self.input
    }
}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        // Object keys serialize in sorted order, so this is canonical for equal values
        self.input.to_string().hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.resource, self.input)
    }
}

/// Selects cache entries for invalidation or removal
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    resource: String,
    input: Option<Value>,
    exact: bool,
}

impl QueryFilter {
    /// Every entry of a resource
    pub fn resource(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            input: None,
            exact: false,
        }
    }

    /// Entries of a resource whose input matches `input`.
    ///
    /// With `exact` only the identical key matches; otherwise any stored input
    /// that contains `input` as a structural prefix matches too.
    pub fn input(resource: impl Into<String>, input: Value, exact: bool) -> Self {
        Self {
            resource: resource.into(),
            input: Some(input),
            exact,
        }
    }

    /// Check whether `key` is selected by this filter
    pub fn matches(&self, key: &QueryKey) -> bool {
        if key.resource != self.resource {
            return false;
        }

        match &self.input {
            None => true,
            Some(filter) if self.exact => key.input == *filter,
            Some(filter) => partial_match(&key.input, filter),
        }
    }
}

/// `stored` contains everything `filter` specifies
fn partial_match(stored: &Value, filter: &Value) -> bool {
    if stored == filter {
        return true;
    }

    match (stored, filter) {
        (Value::Object(stored), Value::Object(filter)) => filter.iter().all(|(field, expected)| {
            stored
                .get(field)
                .is_some_and(|actual| partial_match(actual, expected))
        }),
        (Value::Array(stored), Value::Array(filter)) => {
            filter.len() <= stored.len()
                && filter
                    .iter()
                    .zip(stored)
                    .all(|(expected, actual)| partial_match(actual, expected))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct PostInput {
        space: u32,
        author: String,
    }

    #[test]
    fn equal_inputs_give_equal_keys() {
        let a = QueryKey::new("posts", &PostInput { space: 1, author: "alice".into() }).unwrap();
        let b = QueryKey::new("posts", &json!({"author": "alice", "space": 1})).unwrap();
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn resource_is_part_of_identity() {
        let a = QueryKey::new("posts", &1).unwrap();
        let b = QueryKey::new("spaces", &1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn display_shows_pair() {
        let key = QueryKey::new("energy", "5Grw").unwrap();
        assert_eq!(key.to_string(), "[energy, \"5Grw\"]");
    }

    #[test]
    fn resource_filter_matches_all_inputs() {
        let filter = QueryFilter::resource("posts");
        assert!(filter.matches(&QueryKey::new("posts", &1).unwrap()));
        assert!(filter.matches(&QueryKey::new("posts", &json!({"a": 1})).unwrap()));
        assert!(!filter.matches(&QueryKey::new("spaces", &1).unwrap()));
    }

    #[test]
    fn exact_filter_requires_identical_input() {
        let filter = QueryFilter::input("posts", json!({"space": 1}), true);
        assert!(filter.matches(&QueryKey::new("posts", &json!({"space": 1})).unwrap()));
        assert!(!filter.matches(&QueryKey::new("posts", &json!({"space": 1, "page": 2})).unwrap()));
    }

    #[test]
    fn prefix_filter_matches_nested_inputs() {
        let filter = QueryFilter::input("posts", json!({"space": 1}), false);
        assert!(filter.matches(&QueryKey::new("posts", &json!({"space": 1, "page": 2})).unwrap()));
        assert!(!filter.matches(&QueryKey::new("posts", &json!({"space": 2, "page": 2})).unwrap()));

        let filter = QueryFilter::input("posts", json!(["a"]), false);
        assert!(filter.matches(&QueryKey::new("posts", &json!(["a", "b"])).unwrap()));
        assert!(!filter.matches(&QueryKey::new("posts", &json!(["b", "a"])).unwrap()));
    }

    proptest! {
        #[test]
        fn key_equality_tracks_input_equality(
            a in any::<(u8, Option<String>)>(),
            b in any::<(u8, Option<String>)>(),
        ) {
            let ka = QueryKey::new("res", &a).unwrap();
            let kb = QueryKey::new("res", &b).unwrap();
            prop_assert_eq!(ka == kb, a == b);
        }
    }
}
