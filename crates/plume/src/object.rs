use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::{fmt_double, fmt_int, quote_element};

/// Insertion-ordered key/value pairs of a script dict, as seen by the host.
pub type DictPairs = IndexMap<String, Object>;

/// A script value that can be passed to or returned from the interpreter.
///
/// This is the public-facing value type. It owns all its data and can be
/// freely cloned, serialized, or stored; unlike internal handles it does not
/// depend on the interpreter's arena and never expires.
///
/// # Which variant comes back
///
/// Evaluation results surface the representation the script actually
/// materialized: `expr {1 + 2}` yields `Int`, `list a b` yields `List`, and
/// a value that was only ever a string stays `String`, even if it happens
/// to look numeric. Use [`Object::canonical`] when only the text matters.
///
/// # JSON
///
/// [`Object::to_json`] and [`Object::from_json`] give the natural mapping:
/// `Int`/`Double` ↔ JSON numbers, `String` ↔ JSON string, `List` ↔ array,
/// `Dict` ↔ object. JSON `null` and booleans map to the strings `""`,
/// `"1"`, and `"0"` because the language has no distinct types for them.
/// The derived serde implementation (used by binary formats) is externally
/// tagged and lossless instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Object {
    #[serde(alias = "string")]
    String(String),
    #[serde(alias = "int")]
    Int(i64),
    #[serde(alias = "double")]
    Double(f64),
    #[serde(alias = "list")]
    List(Vec<Object>),
    #[serde(alias = "dict")]
    Dict(DictPairs),
}

impl Object {
    /// The canonical string form of this value, as a script would see it.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Int(i) => fmt_int(*i),
            Self::Double(d) => fmt_double(*d),
            Self::List(items) => {
                let mut out = String::new();
                for (n, item) in items.iter().enumerate() {
                    if n > 0 {
                        out.push(' ');
                    }
                    quote_element(&item.canonical(), &mut out);
                }
                out
            }
            Self::Dict(pairs) => {
                let mut out = String::new();
                for (n, (key, value)) in pairs.iter().enumerate() {
                    if n > 0 {
                        out.push(' ');
                    }
                    quote_element(key, &mut out);
                    out.push(' ');
                    quote_element(&value.canonical(), &mut out);
                }
                out
            }
        }
    }

    /// Converts to the natural JSON representation.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map_or_else(|| serde_json::Value::String(fmt_double(*d)), serde_json::Value::Number),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Dict(pairs) => serde_json::Value::Object(
                pairs
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Converts from the natural JSON representation.
    ///
    /// `null` becomes the empty string and booleans become `"1"`/`"0"`,
    /// matching how scripts spell those values.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::String(String::new()),
            serde_json::Value::Bool(b) => Self::String(if *b { "1" } else { "0" }.to_owned()),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(entries) => Self::Dict(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Object {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_list_form() {
        let list = Object::List(vec![
            Object::from("a"),
            Object::from("b c"),
            Object::from(""),
        ]);
        assert_eq!(list.canonical(), "a {b c} {}");
    }

    #[test]
    fn json_round_trip() {
        let mut pairs = DictPairs::new();
        pairs.insert("a".to_owned(), Object::Int(1));
        pairs.insert("b".to_owned(), Object::List(vec![Object::from("x")]));
        let obj = Object::Dict(pairs);
        let json = obj.to_json();
        assert_eq!(Object::from_json(&json), obj);
        assert_eq!(json["a"], serde_json::json!(1));
    }
}
