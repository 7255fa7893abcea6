//! Relaxed JSON parsing for model replies
//!
//! Models often wrap the requested object in prose or code fences. The
//! object is recovered by trying the whole text first, then the span between
//! the first `{` and the last `}`.

use serde_json::Value;

/// Parse a JSON object out of free text, or `None` if there is none
pub fn recover_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim())
        && value.is_object()
    {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}
