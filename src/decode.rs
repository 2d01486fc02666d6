use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

/// Decode a serial number which the cloud sometimes delivers base64 encoded.
///
/// Plain serials, and anything whose decoding is not a printable serial, pass through
/// unchanged. Empty input carries no serial at all.
pub fn decode_sn(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    Some(decode_base64_serial(raw).unwrap_or_else(|| raw.to_string()))
}

fn decode_base64_serial(raw: &str) -> Option<String> {
    if raw.len() < 4 || raw.len() % 4 != 0 {
        return None;
    }

    let text = STANDARD
        .decode(raw)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())?;

    let printable = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if printable {
        Some(text)
    } else {
        None
    }
}

/// Serial-like field of a sub-device payload (`bpSn`, `devSn`, `evSn`, ...)
pub fn is_serial_key(key: &str) -> bool {
    key.ends_with("Sn") || key == "sn"
}

/// Second decoding stage for payloads that arrive as JSON encoded inside a string.
/// Only objects and arrays count; scalars inside strings stay strings.
pub fn decode_embedded(raw: &str) -> Option<Value> {
    let trimmed = raw.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }

    serde_json::from_str(trimmed).ok()
}
