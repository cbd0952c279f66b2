use crate::{
    data::{Method, Mismatch, RecordedRequest},
    matching::Pattern,
};
use serde_json::Value;
use std::{collections::BTreeMap, time::Duration};

#[derive(Debug, Clone)]
pub struct Interaction {
    pub description: String,
    pub provider_state: Option<String>,
    pub request: RequestMatcher,
    pub response: ResponseTemplate,
}

#[derive(Debug, Clone)]
pub struct RequestMatcher {
    pub method: Method,
    pub path: Pattern,
    pub query: BTreeMap<String, Pattern>,
    pub headers: BTreeMap<String, Pattern>,
    pub body: Option<Pattern>,
}

impl RequestMatcher {
    pub fn new<P: Into<Pattern>>(method: Method, path: P) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_query<K: Into<String>, V: Into<Pattern>>(mut self, name: K, value: V) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_header<K: Into<String>, V: Into<Pattern>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn with_body<B: Into<Pattern>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    // undeclared query parameters are a mismatch, undeclared headers are not
    pub fn mismatches(&self, actual: &RecordedRequest) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if actual.method != self.method.as_str() {
            mismatches.push(Mismatch {
                field: String::from("method"),
                expected: String::from(self.method.as_str()),
                found: actual.method.clone(),
            });
        }

        if let Some(found) = self
            .path
            .mismatch_at("path", &Value::String(actual.path.clone()))
        {
            mismatches.push(found);
        }

        for (name, pattern) in &self.query {
            let field = format!("query.{}", name);
            match actual.query.get(name) {
                Some(value) => {
                    if let Some(found) =
                        pattern.mismatch_at(&field, &Value::String(value.clone()))
                    {
                        mismatches.push(found);
                    }
                }
                None => mismatches.push(Mismatch {
                    field,
                    expected: describe_pattern(pattern),
                    found: String::from("nothing"),
                }),
            }
        }

        for (name, value) in &actual.query {
            if !self.query.contains_key(name) {
                mismatches.push(Mismatch {
                    field: format!("query.{}", name),
                    expected: String::from("no such parameter"),
                    found: value.clone(),
                });
            }
        }

        for (name, pattern) in &self.headers {
            let field = format!("header.{}", name);
            match actual.headers.get(name) {
                Some(value) => {
                    if let Some(found) =
                        pattern.mismatch_at(&field, &Value::String(value.clone()))
                    {
                        mismatches.push(found);
                    }
                }
                None => mismatches.push(Mismatch {
                    field,
                    expected: describe_pattern(pattern),
                    found: String::from("nothing"),
                }),
            }
        }

        if let Some(pattern) = &self.body {
            match &actual.body {
                Some(body) => {
                    if let Some(found) = pattern.mismatch_at("body", body) {
                        mismatches.push(found);
                    }
                }
                None => mismatches.push(Mismatch {
                    field: String::from("body"),
                    expected: describe_pattern(pattern),
                    found: String::from("no body"),
                }),
            }
        }

        mismatches
    }
}

#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Pattern>,
    pub delay: Option<Duration>,
}

impl ResponseTemplate {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
            delay: None,
        }
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn with_body<B: Into<Pattern>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

fn describe_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Regex { pattern, .. } => format!("a string matching {}", pattern),
        other => other.render().to_string(),
    }
}
