//! Response governor.
//!
//! Bounds the size of every payload handed to an external consumer. Values
//! are rendered as pretty-printed JSON (two-space indent) and cut at a
//! character ceiling with a trailer that states both lengths.

use serde::Serialize;

use crate::observability::metrics;

/// Default character ceiling.
pub const DEFAULT_MAX_CHARS: usize = 50_000;

/// A rendered payload, possibly truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GovernedPayload {
    /// Text handed to the consumer, trailer included.
    pub text: String,
    /// Length in characters of the full rendering.
    pub original_len: usize,
    /// Characters of the rendering kept before the trailer.
    pub shown_len: usize,
    pub truncated: bool,
}

/// Render `value` and bound it to `ceiling` characters.
pub fn govern<T: Serialize + ?Sized>(value: &T, ceiling: usize) -> GovernedPayload {
    let rendered = match serde_json::to_string_pretty(value) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Payload could not be serialized");
            serde_json::json!({ "error": format!("serialization failed: {e}") }).to_string()
        }
    };
    govern_text(rendered, ceiling)
}

/// Bound already-rendered text to `ceiling` characters.
pub fn govern_text(text: String, ceiling: usize) -> GovernedPayload {
    let original_len = text.chars().count();
    if original_len <= ceiling {
        return GovernedPayload {
            text,
            original_len,
            shown_len: original_len,
            truncated: false,
        };
    }

    let mut kept: String = text.chars().take(ceiling).collect();
    kept.push_str(&format!(
        "\n... [truncated: {original_len} chars total, showing first {ceiling}]"
    ));
    tracing::debug!(original_len, ceiling, "Truncated outbound payload");
    metrics::record_truncation();

    GovernedPayload {
        text: kept,
        original_len,
        shown_len: ceiling,
        truncated: true,
    }
}
