//! Transport error categorization.

use super::types::ProbeFailure;

/// Categorizes a `reqwest::Error` into a [`ProbeFailure`].
///
/// Connection and timeout failures are distinguished from everything else
/// (builder, redirect, body, decode errors), which all map to
/// [`ProbeFailure::RequestFailed`].
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ProbeFailure {
    if error.is_connect() || error.is_timeout() {
        ProbeFailure::ConnectionFailed
    } else {
        ProbeFailure::RequestFailed
    }
}

/// Renders a transport error as the message stored alongside a failed probe.
pub fn describe_reqwest_error(error: &reqwest::Error) -> String {
    match categorize_reqwest_error(error) {
        ProbeFailure::ConnectionFailed => format!("Connection timeout or refused: {error}"),
        _ => format!("Request failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_refused_is_connection_failure() {
        // Port 1 on loopback is not listening in test environments
        let client = reqwest::Client::new();
        let error = client
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .expect_err("nothing listens on port 1");

        assert_eq!(
            categorize_reqwest_error(&error),
            ProbeFailure::ConnectionFailed
        );
        assert!(describe_reqwest_error(&error).starts_with("Connection timeout or refused:"));
    }

    #[test]
    fn test_builder_error_is_request_failure() {
        let client = reqwest::Client::new();
        let error = client
            .get("not a url")
            .build()
            .expect_err("invalid URL must fail to build");

        assert_eq!(categorize_reqwest_error(&error), ProbeFailure::RequestFailed);
        assert!(describe_reqwest_error(&error).starts_with("Request failed:"));
    }
}
