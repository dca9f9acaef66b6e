//! Canonical JSON encoding and `sha256:` hash literals.
//!
//! The canonical form is what gets hashed, never what gets displayed:
//! - object keys sorted by Unicode code point (identical to UTF-8 byte order)
//! - array order preserved
//! - integer-valued floats collapsed to integers
//! - no insignificant whitespace
//!
//! Two structurally equal values always encode to the same string, whatever
//! key order they were built with, so independent implementations agree on
//! every content hash.

use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

/// Prefix of every hash literal produced by this crate.
pub const HASH_PREFIX: &str = "sha256:";

fn normalize_number(n: &Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n.clone();
    }
    // `i64::MAX as f64` and `u64::MAX as f64` round up to 2^63 and 2^64,
    // so both upper bounds are exclusive.
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Number::from(f as i64)
        }
        Some(f) if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => Number::from(f as u64),
        _ => n.clone(),
    }
}

/// Serialize a JSON value to its canonical string.
///
/// `serde_json::Map` keeps insertion order only with the `preserve_order`
/// feature, so keys are written by hand here rather than trusting the map.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push('{');
            for (i, (key, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(arr) => {
            out.push('[');
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        Value::Number(n) => out.push_str(&normalize_number(n).to_string()),
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// `sha256:<lowercase hex>` over raw bytes.
pub fn sha256_literal(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{}{}", HASH_PREFIX, hex::encode(hasher.finalize()))
}

/// Hash literal of a value's canonical encoding (UTF-8 bytes).
pub fn hash_canonical(value: &Value) -> String {
    sha256_literal(canonical_json(value).as_bytes())
}

/// Check that a string is a well-formed `sha256:` literal.
pub fn is_hash_literal(s: &str) -> bool {
    s.strip_prefix(HASH_PREFIX)
        .map(|digest| {
            digest.len() == 64 && digest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
        })
        .unwrap_or(false)
}
