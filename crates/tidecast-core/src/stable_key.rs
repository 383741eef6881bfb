//! Deterministic cache/dedupe keys for outbound requests.
//!
//! Keys are only ever compared with each other. Lossy handling of
//! pathological input is acceptable here; do not use this text anywhere
//! an exact serialization is required.

use serde::Serialize;
use serde_json::Value;

/// Nesting depth past which content is omitted from the key text.
pub const MAX_DEPTH: usize = 64;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Compact JSON text with object keys sorted at every level.
///
/// Content nested deeper than [`MAX_DEPTH`] becomes a hole: an object
/// member is dropped, an array element renders as `null`.
pub fn stable_stringify(value: &Value) -> String {
    let mut out = String::new();
    // The root is never a hole.
    if !write_value(value, 0, &mut out) {
        out.push_str("null");
    }
    out
}

/// Writes `value` into `out`; returns `false` when it was omitted.
fn write_value(value: &Value, depth: usize, out: &mut String) -> bool {
    match value {
        Value::Array(_) | Value::Object(_) if depth >= MAX_DEPTH => false,
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                if !write_value(item, depth + 1, out) {
                    out.push_str("null");
                }
            }
            out.push(']');
            true
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            let mut first = true;
            for key in keys {
                let mut member = String::new();
                if !write_value(&map[key], depth + 1, &mut member) {
                    continue;
                }
                if !first {
                    out.push(',');
                }
                first = false;
                out.push_str(&quote(key));
                out.push(':');
                out.push_str(&member);
            }
            out.push('}');
            true
        }
        Value::String(text) => {
            out.push_str(&quote(text));
            true
        }
        scalar => {
            out.push_str(&scalar.to_string());
            true
        }
    }
}

fn quote(text: &str) -> String {
    Value::String(text.to_owned()).to_string()
}

/// 64-bit FNV-1a over the stable text, as 16 lowercase hex digits.
pub fn hash(value: &Value) -> String {
    let digest = stable_stringify(value)
        .bytes()
        .fold(FNV_OFFSET_BASIS, |acc, byte| {
            (acc ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        });
    format!("{digest:016x}")
}

/// Hashes any serializable value, e.g. a request body.
pub fn stable_key<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    Ok(hash(&serde_json::to_value(value)?))
}
