//! Utilities for sanitizing error messages before they are stored.
//!
//! Probe errors can echo arbitrary upstream bodies, so they are stripped of
//! control characters and truncated before landing in `site_stats`.

use crate::config::MAX_ERROR_MESSAGE_LENGTH;

/// Sanitizes an error message by removing control characters.
///
/// Newline, tab and carriage return are kept; every other character below
/// 0x20 is dropped.
pub fn sanitize_error_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| {
            let code = *c as u32;
            code >= 0x20 // Printable ASCII starts at 0x20 (space)
                || code == 0x09 // Tab
                || code == 0x0A // Newline
                || code == 0x0D // Carriage return
        })
        .collect()
}

/// Sanitizes and truncates an error message to [`MAX_ERROR_MESSAGE_LENGTH`]
/// characters.
///
/// Truncated messages end with a note carrying the original length.
pub fn sanitize_and_truncate_error_message(message: &str) -> String {
    let sanitized = sanitize_error_message(message);
    let length = sanitized.chars().count();

    if length <= MAX_ERROR_MESSAGE_LENGTH {
        return sanitized;
    }

    // Leave room for the truncation note
    let kept: String = sanitized
        .chars()
        .take(MAX_ERROR_MESSAGE_LENGTH.saturating_sub(50))
        .collect();
    format!("{kept}... (truncated, original length: {length} chars)")
}
