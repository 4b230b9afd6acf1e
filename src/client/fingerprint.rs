//! Usage: Stable cache fingerprint of a request (method, path, normalized parameters).

use crate::client::request::{Method, Request, RequestParameters};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(request: &Request) -> Self {
        compute(request.method, &request.path, &request.parameters)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn compute(method: Method, path: &str, parameters: &RequestParameters) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_path(path).as_bytes());
    hasher.update(b"\n");

    let mut canonical = String::new();
    write_canonical_object(&mut canonical, parameters.iter());
    hasher.update(canonical.as_bytes());

    let digest = hasher.finalize();
    Fingerprint(format!("{digest:x}"))
}

/// `/me/videos` and `me/videos` address the same resource.
fn normalize_path(path: &str) -> &str {
    path.trim().trim_start_matches('/')
}

fn write_canonical_object<'a>(out: &mut String, entries: impl Iterator<Item = (&'a String, &'a Value)>) {
    let mut entries: Vec<(&String, &Value)> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (idx, (key, value)) in entries.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical_value(out, value);
    }
    out.push('}');
}

fn write_canonical_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => write_canonical_object(out, map.iter()),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical_value(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
