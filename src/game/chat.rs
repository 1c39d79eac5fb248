//! Chat text handling

use std::time::{SystemTime, UNIX_EPOCH};

use crate::game::constants::chat::MAX_MESSAGE_CHARS;

/// Clean a chat line: control characters removed, trimmed, truncated
///
/// Returns `None` when nothing printable remains.
pub fn sanitize_chat(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let truncated: String = cleaned.trim().chars().take(MAX_MESSAGE_CHARS).collect();
    let text = truncated.trim_end();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Server notice announcing a kill
pub fn kill_notice(shooter: &str, victim: &str) -> String {
    format!("{} defeated {}", shooter, victim)
}

/// Current wall-clock time in Unix milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
