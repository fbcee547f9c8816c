//! Shared helpers.
//!
//! - String sanitization for stored error messages

pub mod sanitize;

pub use sanitize::sanitize_and_truncate_error_message;
