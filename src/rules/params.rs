//! Parameter identifiers, configured values, and the matchers built from them.

use crate::rules::keyed::OrderedMap;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

/// Identifies a call argument either by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamId {
    Position(u32),
    Name(String),
}

impl ParamId {
    /// Canonical decimal strings (`"0"`, `"12"`) become positions; anything else
    /// (`"01"`, `"-1"`, `"value"`) stays a name.
    pub fn from_key(key: &str) -> Self {
        match parse_canonical_position(key) {
            Some(position) => ParamId::Position(position),
            None => ParamId::Name(key.to_string()),
        }
    }
}

fn parse_canonical_position(key: &str) -> Option<u32> {
    let canonical = key == "0" || (!key.starts_with('0') && !key.is_empty());
    if !canonical || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamId::Position(position) => write!(f, "{}", position),
            ParamId::Name(name) => f.write_str(name),
        }
    }
}

impl From<u32> for ParamId {
    fn from(value: u32) -> Self {
        ParamId::Position(value)
    }
}

impl From<&str> for ParamId {
    fn from(value: &str) -> Self {
        ParamId::from_key(value)
    }
}

impl<'de> Deserialize<'de> for ParamId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ParamIdVisitor;

        impl<'de> Visitor<'de> for ParamIdVisitor {
            type Value = ParamId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a parameter position or name")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<ParamId, E> {
                // Out-of-range numbers become names, as they do for map keys.
                Ok(u32::try_from(value)
                    .map(ParamId::Position)
                    .unwrap_or_else(|_| ParamId::Name(value.to_string())))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<ParamId, E> {
                match u64::try_from(value) {
                    Ok(position) => self.visit_u64(position),
                    Err(_) => Ok(ParamId::Name(value.to_string())),
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ParamId, E> {
                Ok(ParamId::from_key(value))
            }
        }

        deserializer.deserialize_any(ParamIdVisitor)
    }
}

/// Literal argument value as written in the configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Decides whether an argument value is allowed.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamMatcher {
    AnyValue,
    /// Strict comparison: the variant and the value must both match.
    ExactValue(ParamValue),
    /// Strings compare after ASCII lowercasing; other values compare strictly.
    CaseInsensitiveValue(ParamValue),
}

impl ParamMatcher {
    pub fn matches(&self, value: &ParamValue) -> bool {
        match self {
            ParamMatcher::AnyValue => true,
            ParamMatcher::ExactValue(expected) => expected == value,
            ParamMatcher::CaseInsensitiveValue(expected) => {
                match (expected.as_str(), value.as_str()) {
                    (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
                    _ => expected == value,
                }
            }
        }
    }

    /// Configured comparison value; `None` for [`ParamMatcher::AnyValue`].
    pub fn value(&self) -> Option<&ParamValue> {
        match self {
            ParamMatcher::AnyValue => None,
            ParamMatcher::ExactValue(value) | ParamMatcher::CaseInsensitiveValue(value) => {
                Some(value)
            }
        }
    }
}

/// Matchers keyed by parameter, in configuration order.
pub type ParamMatchers = OrderedMap<ParamId, ParamMatcher>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_integer_keys_become_positions() {
        assert_eq!(ParamId::from_key("0"), ParamId::Position(0));
        assert_eq!(ParamId::from_key("12"), ParamId::Position(12));
        assert_eq!(ParamId::from_key("01"), ParamId::Name("01".into()));
        assert_eq!(ParamId::from_key("-1"), ParamId::Name("-1".into()));
        assert_eq!(ParamId::from_key(""), ParamId::Name(String::new()));
        assert_eq!(ParamId::from_key("name"), ParamId::Name("name".into()));
        assert_eq!(
            ParamId::from_key("99999999999"),
            ParamId::Name("99999999999".into())
        );
    }

    #[test]
    fn param_ids_deserialize_from_numbers_and_strings() {
        let ids: Vec<ParamId> = serde_json::from_str(r#"[0, 3, "2", "flags", -4]"#).unwrap();
        assert_eq!(
            ids,
            vec![
                ParamId::Position(0),
                ParamId::Position(3),
                ParamId::Position(2),
                ParamId::Name("flags".into()),
                ParamId::Name("-4".into()),
            ]
        );
    }

    #[test]
    fn oversized_positions_become_names_in_lists_and_keys() {
        let listed: Vec<ParamId> = serde_json::from_str("[5000000000]").unwrap();
        let keyed: OrderedMap<ParamId, ParamValue> =
            serde_json::from_str(r#"{"5000000000": 1}"#).unwrap();
        let expected = ParamId::Name("5000000000".into());
        assert_eq!(listed, vec![expected.clone()]);
        assert!(keyed.contains_key(&expected));
    }

    #[test]
    fn param_values_keep_their_type() {
        let values: Vec<ParamValue> =
            serde_json::from_str(r#"[null, true, 1, 1.5, "1"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Null,
                ParamValue::Bool(true),
                ParamValue::Int(1),
                ParamValue::Float(1.5),
                ParamValue::String("1".into()),
            ]
        );
    }

    #[test]
    fn any_value_matches_everything() {
        let matcher = ParamMatcher::AnyValue;
        assert!(matcher.matches(&ParamValue::Null));
        assert!(matcher.matches(&"anything".into()));
        assert!(matcher.value().is_none());
    }

    #[test]
    fn exact_value_is_strict() {
        let matcher = ParamMatcher::ExactValue("Safe".into());
        assert!(matcher.matches(&"Safe".into()));
        assert!(!matcher.matches(&"safe".into()));

        let numeric = ParamMatcher::ExactValue(ParamValue::Int(1));
        assert!(numeric.matches(&ParamValue::Int(1)));
        assert!(!numeric.matches(&"1".into()));
        assert!(!numeric.matches(&ParamValue::Float(1.0)));
        assert!(!numeric.matches(&ParamValue::Bool(true)));
    }

    #[test]
    fn case_insensitive_value_folds_strings_only() {
        let matcher = ParamMatcher::CaseInsensitiveValue("SELECT".into());
        assert!(matcher.matches(&"select".into()));
        assert!(matcher.matches(&"SeLeCt".into()));
        assert!(!matcher.matches(&"selects".into()));

        let numeric = ParamMatcher::CaseInsensitiveValue(ParamValue::Int(7));
        assert!(numeric.matches(&ParamValue::Int(7)));
        assert!(!numeric.matches(&"7".into()));
        assert_eq!(numeric.value(), Some(&ParamValue::Int(7)));
    }
}
