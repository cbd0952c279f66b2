use crate::data::Mismatch;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "match", rename_all = "camelCase")]
pub enum Pattern {
    Literal {
        value: Value,
    },
    Type {
        example: Value,
    },
    EachLike {
        element: Box<Pattern>,
        min: usize,
    },
    Regex {
        #[serde(serialize_with = "serialize_regex")]
        pattern: Regex,
        example: String,
    },
    Object {
        entries: BTreeMap<String, Pattern>,
    },
    Array {
        elements: Vec<Pattern>,
    },
}

pub fn literal<V: Into<Value>>(value: V) -> Pattern {
    Pattern::Literal {
        value: value.into(),
    }
}

pub fn like<V: Into<Value>>(example: V) -> Pattern {
    Pattern::Type {
        example: example.into(),
    }
}

pub fn each_like<P: Into<Pattern>>(element: P) -> Pattern {
    each_like_min(element, 1)
}

pub fn each_like_min<P: Into<Pattern>>(element: P, min: usize) -> Pattern {
    Pattern::EachLike {
        element: Box::new(element.into()),
        min,
    }
}

pub fn term<P: AsRef<str>, E: Into<String>>(pattern: P, example: E) -> Pattern {
    let pattern = pattern.as_ref();
    let compiled = Regex::new(pattern)
        .unwrap_or_else(|e| panic!("invalid regular expression {:?}: {}", pattern, e));

    Pattern::Regex {
        pattern: compiled,
        example: example.into(),
    }
}

impl Pattern {
    pub fn object<K: Into<String>, I: IntoIterator<Item = (K, Pattern)>>(entries: I) -> Pattern {
        Pattern::Object {
            entries: entries
                .into_iter()
                .map(|(key, pattern)| (key.into(), pattern))
                .collect(),
        }
    }

    pub fn array<I: IntoIterator<Item = Pattern>>(elements: I) -> Pattern {
        Pattern::Array {
            elements: elements.into_iter().collect(),
        }
    }

    pub fn matches(&self, actual: &Value) -> bool {
        self.first_mismatch(actual).is_none()
    }

    pub fn first_mismatch(&self, actual: &Value) -> Option<Mismatch> {
        self.mismatch_at("$", actual)
    }

    pub(crate) fn mismatch_at(&self, path: &str, actual: &Value) -> Option<Mismatch> {
        match self {
            Pattern::Literal { value } => literal_mismatch(path, value, actual),
            Pattern::Type { example } => {
                if kind(example) == kind(actual) {
                    None
                } else {
                    Some(mismatch(
                        path,
                        format!("a value of kind {}", kind(example)),
                        describe(actual),
                    ))
                }
            }
            Pattern::EachLike { element, min } => match actual {
                Value::Array(items) if items.len() >= *min => items
                    .iter()
                    .enumerate()
                    .find_map(|(i, item)| element.mismatch_at(&format!("{}[{}]", path, i), item)),
                _ => Some(mismatch(
                    path,
                    format!("an array with at least {} element(s)", min),
                    describe(actual),
                )),
            },
            Pattern::Regex { pattern, .. } => {
                let matched = match actual {
                    Value::String(s) => pattern.is_match(s),
                    _ => false,
                };

                if matched {
                    None
                } else {
                    Some(mismatch(
                        path,
                        format!("a string matching {}", pattern),
                        describe(actual),
                    ))
                }
            }
            Pattern::Object { entries } => match actual {
                Value::Object(map) => entries.iter().find_map(|(key, pattern)| {
                    let child = format!("{}.{}", path, key);
                    match map.get(key) {
                        Some(value) => pattern.mismatch_at(&child, value),
                        None => Some(mismatch(&child, describe(&pattern.render()), "nothing")),
                    }
                }),
                _ => Some(mismatch(path, "an object", describe(actual))),
            },
            Pattern::Array { elements } => match actual {
                Value::Array(items) if items.len() == elements.len() => elements
                    .iter()
                    .zip(items)
                    .enumerate()
                    .find_map(|(i, (pattern, item))| {
                        pattern.mismatch_at(&format!("{}[{}]", path, i), item)
                    }),
                _ => Some(mismatch(
                    path,
                    format!("an array of {} element(s)", elements.len()),
                    describe(actual),
                )),
            },
        }
    }

    pub fn render(&self) -> Value {
        match self {
            Pattern::Literal { value } => value.clone(),
            Pattern::Type { example } => example.clone(),
            Pattern::EachLike { element, min } => {
                Value::Array((0..*min).map(|_| element.render()).collect())
            }
            Pattern::Regex { example, .. } => Value::String(example.clone()),
            Pattern::Object { entries } => Value::Object(
                entries
                    .iter()
                    .map(|(key, pattern)| (key.clone(), pattern.render()))
                    .collect(),
            ),
            Pattern::Array { elements } => {
                Value::Array(elements.iter().map(Pattern::render).collect())
            }
        }
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        literal(value)
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        literal(value)
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        literal(value)
    }
}

impl From<bool> for Pattern {
    fn from(value: bool) -> Self {
        literal(value)
    }
}

impl From<i32> for Pattern {
    fn from(value: i32) -> Self {
        literal(value)
    }
}

impl From<i64> for Pattern {
    fn from(value: i64) -> Self {
        literal(value)
    }
}

impl From<u64> for Pattern {
    fn from(value: u64) -> Self {
        literal(value)
    }
}

impl From<f64> for Pattern {
    fn from(value: f64) -> Self {
        literal(value)
    }
}

fn serialize_regex<S: Serializer>(pattern: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(pattern.as_str())
}

fn literal_mismatch(path: &str, expected: &Value, actual: &Value) -> Option<Mismatch> {
    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            for (key, expected_value) in expected_map {
                let child = format!("{}.{}", path, key);
                match actual_map.get(key) {
                    Some(actual_value) => {
                        if let Some(found) = literal_mismatch(&child, expected_value, actual_value)
                        {
                            return Some(found);
                        }
                    }
                    None => {
                        return Some(mismatch(&child, describe(expected_value), "nothing"));
                    }
                }
            }

            for (key, actual_value) in actual_map {
                if !expected_map.contains_key(key) {
                    let child = format!("{}.{}", path, key);
                    return Some(mismatch(&child, "no such key", describe(actual_value)));
                }
            }

            None
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            if expected_items.len() != actual_items.len() {
                return Some(mismatch(
                    path,
                    format!("an array of {} element(s)", expected_items.len()),
                    describe(actual),
                ));
            }

            expected_items
                .iter()
                .zip(actual_items)
                .enumerate()
                .find_map(|(i, (expected_item, actual_item))| {
                    literal_mismatch(&format!("{}[{}]", path, i), expected_item, actual_item)
                })
        }
        _ => {
            if scalar_eq(expected, actual) {
                None
            } else {
                Some(mismatch(path, describe(expected), describe(actual)))
            }
        }
    }
}

// 1 and 1.0 denote the same JSON number
fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("an array of {} element(s)", items.len()),
        Value::Object(map) => format!("an object with {} key(s)", map.len()),
        _ => value.to_string(),
    }
}

fn mismatch<E: Into<String>, F: Into<String>>(path: &str, expected: E, found: F) -> Mismatch {
    Mismatch {
        field: path.to_string(),
        expected: expected.into(),
        found: found.into(),
    }
}
