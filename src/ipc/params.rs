use base64::Engine;
use serde::de::DeserializeOwned;

use crate::ipc::types::Request;

pub fn str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// Deserializes `params[key]`, or the whole params object when `key` is
/// empty.
pub fn typed_param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, String> {
    let value = if key.is_empty() {
        req.params.clone()
    } else {
        req.params
            .get(key)
            .cloned()
            .ok_or_else(|| format!("missing params.{key}"))?
    };
    let label = if key.is_empty() { "params".to_string() } else { format!("params.{key}") };
    serde_json::from_value(value).map_err(|e| format!("invalid {label}: {e}"))
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, String> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))
}
