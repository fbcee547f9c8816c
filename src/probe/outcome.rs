//! Interpretation of stats endpoint responses.
//!
//! Pure functions mapping an HTTP status and body to the outcome recorded for
//! a site. The placeholder-key probe and the licensed probe read the same
//! endpoint but draw different conclusions from it.

use serde_json::Value;

use crate::config::{INVALID_PARAM_CODE, PLUGIN_SLUG};
use crate::error_handling::{categorize_reqwest_error, describe_reqwest_error, ProbeFailure, ProbeInfo};

/// Result of probing one site, as written to `site_stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub available: bool,
    pub plugin_version: Option<String>,
    pub raw_response: Option<Value>,
    pub error_message: Option<String>,
    /// Why `available` is false
    pub failure: Option<ProbeFailure>,
    pub info: Option<ProbeInfo>,
}

impl ProbeOutcome {
    fn failed(failure: ProbeFailure, raw_response: Option<Value>, message: String) -> Self {
        Self {
            available: false,
            plugin_version: None,
            raw_response,
            error_message: Some(message),
            failure: Some(failure),
            info: None,
        }
    }

    /// Outcome for a request that never produced a response.
    pub fn transport_failure(error: &reqwest::Error) -> Self {
        Self::failed(
            categorize_reqwest_error(error),
            None,
            describe_reqwest_error(error),
        )
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Interprets the answer to the placeholder-key probe of an unlicensed site.
///
/// - 404: the REST route does not exist, so the plugin is not active
/// - `rest_invalid_param` error body: the plugin validated (and rejected) the
///   key, so it is active but the site never opted in to licensing
/// - anything else: inconclusive, recorded as a failure echoing the body
pub fn interpret_unlicensed(status: u16, body: &str) -> ProbeOutcome {
    if status == 404 {
        return ProbeOutcome::failed(
            ProbeFailure::PluginNotActive,
            None,
            "Plugin not active (404 response)".to_string(),
        );
    }

    let data = serde_json::from_str::<Value>(body).ok();

    let code = data
        .as_ref()
        .and_then(|d| d.get("code"))
        .and_then(Value::as_str);
    if code == Some(INVALID_PARAM_CODE) {
        return ProbeOutcome {
            available: true,
            plugin_version: None,
            raw_response: data,
            error_message: Some("Plugin active but no license key (not opted in)".to_string()),
            failure: None,
            info: Some(ProbeInfo::ActiveWithoutLicense),
        };
    }

    let echoed = match &data {
        Some(value) => value.to_string(),
        None => body.trim().to_string(),
    };
    ProbeOutcome::failed(
        ProbeFailure::UnexpectedResponse,
        data,
        format!("No license key - unexpected response: {echoed}"),
    )
}

/// Interprets the answer to a probe made with the site's real license key.
pub fn interpret_licensed(status: u16, body: &str) -> ProbeOutcome {
    if !(200..300).contains(&status) {
        return ProbeOutcome::failed(
            ProbeFailure::HttpStatus,
            None,
            format!("HTTP {status}: {body}"),
        );
    }

    let Ok(data) = serde_json::from_str::<Value>(body) else {
        return ProbeOutcome::failed(
            ProbeFailure::InvalidResponseStructure,
            None,
            "Invalid API response structure".to_string(),
        );
    };

    if let Some(code) = data.get("code").filter(|c| !c.is_null()) {
        let message = data
            .get("message")
            .filter(|m| !m.is_null())
            .map(render_scalar)
            .unwrap_or_else(|| format!("API returned error code: {}", render_scalar(code)));
        return ProbeOutcome::failed(ProbeFailure::ApiErrorCode, Some(data), message);
    }

    let Some(plugins) = data.get("plugins").and_then(Value::as_array) else {
        return ProbeOutcome::failed(
            ProbeFailure::InvalidResponseStructure,
            Some(data),
            "Invalid API response structure".to_string(),
        );
    };

    let plugin_version = extract_plugin_version(plugins);
    ProbeOutcome {
        available: true,
        info: plugin_version
            .is_none()
            .then_some(ProbeInfo::VersionMissing),
        plugin_version,
        raw_response: Some(data),
        error_message: None,
        failure: None,
    }
}

/// Version of the companion plugin in a `plugins` list, if listed with one.
pub fn extract_plugin_version(plugins: &[Value]) -> Option<String> {
    plugins
        .iter()
        .find(|plugin| plugin.get("plugin").and_then(Value::as_str) == Some(PLUGIN_SLUG))
        .and_then(|plugin| plugin.get("version"))
        .filter(|version| !version.is_null())
        .map(render_scalar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unlicensed_404_means_not_active() {
        let outcome = interpret_unlicensed(404, "<html>Not Found</html>");
        assert!(!outcome.available);
        assert_eq!(outcome.failure, Some(ProbeFailure::PluginNotActive));
        assert!(outcome.error_message.unwrap().contains("not active"));
        assert_eq!(outcome.raw_response, None);
    }

    #[test]
    fn test_unlicensed_invalid_param_means_active() {
        let body = json!({
            "code": "rest_invalid_param",
            "message": "Invalid parameter(s): token",
            "data": {"status": 400}
        });
        let outcome = interpret_unlicensed(400, &body.to_string());
        assert!(outcome.available);
        assert_eq!(outcome.plugin_version, None);
        assert_eq!(outcome.raw_response, Some(body));
        assert_eq!(outcome.info, Some(ProbeInfo::ActiveWithoutLicense));
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Plugin active but no license key (not opted in)")
        );
    }

    #[test]
    fn test_unlicensed_other_response_echoes_body() {
        let outcome = interpret_unlicensed(200, r#"{"code":"rest_no_route"}"#);
        assert!(!outcome.available);
        assert_eq!(outcome.failure, Some(ProbeFailure::UnexpectedResponse));
        assert_eq!(
            outcome.error_message.as_deref(),
            Some(r#"No license key - unexpected response: {"code":"rest_no_route"}"#)
        );

        let outcome = interpret_unlicensed(500, "fatal error");
        assert_eq!(outcome.raw_response, None);
        assert!(outcome.error_message.unwrap().ends_with("fatal error"));
    }

    #[test]
    fn test_licensed_success_extracts_version() {
        let body = json!({
            "plugins": [
                {"plugin": "akismet/akismet.php", "version": "5.0"},
                {"plugin": "progress-planner/progress-planner.php", "version": "1.2.3"}
            ]
        });
        let outcome = interpret_licensed(200, &body.to_string());
        assert!(outcome.available);
        assert_eq!(outcome.plugin_version.as_deref(), Some("1.2.3"));
        assert_eq!(outcome.error_message, None);
        assert_eq!(outcome.raw_response, Some(body));
    }

    #[test]
    fn test_licensed_success_without_version() {
        let body = json!({"plugins": [{"plugin": "progress-planner/progress-planner.php"}]});
        let outcome = interpret_licensed(200, &body.to_string());
        assert!(outcome.available);
        assert_eq!(outcome.plugin_version, None);
        assert_eq!(outcome.info, Some(ProbeInfo::VersionMissing));

        // Plugin not in the list at all still counts as a reachable endpoint
        let outcome = interpret_licensed(200, r#"{"plugins": []}"#);
        assert!(outcome.available);
        assert_eq!(outcome.plugin_version, None);
    }

    #[test]
    fn test_licensed_http_error() {
        let outcome = interpret_licensed(503, "maintenance");
        assert!(!outcome.available);
        assert_eq!(outcome.failure, Some(ProbeFailure::HttpStatus));
        assert_eq!(outcome.error_message.as_deref(), Some("HTTP 503: maintenance"));
    }

    #[test]
    fn test_licensed_error_code_with_and_without_message() {
        let outcome = interpret_licensed(
            200,
            r#"{"code":"invalid_license","message":"License expired"}"#,
        );
        assert_eq!(outcome.failure, Some(ProbeFailure::ApiErrorCode));
        assert_eq!(outcome.error_message.as_deref(), Some("License expired"));
        assert!(outcome.raw_response.is_some());

        let outcome = interpret_licensed(200, r#"{"code":"invalid_license"}"#);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("API returned error code: invalid_license")
        );
    }

    #[test]
    fn test_licensed_invalid_structure() {
        for body in [r#"{"plugins": "none"}"#, r#"{"stats": {}}"#, "not json", "[]"] {
            let outcome = interpret_licensed(200, body);
            assert!(!outcome.available, "body {body}");
            assert_eq!(
                outcome.failure,
                Some(ProbeFailure::InvalidResponseStructure),
                "body {body}"
            );
            assert_eq!(
                outcome.error_message.as_deref(),
                Some("Invalid API response structure")
            );
        }
    }

    #[test]
    fn test_extract_plugin_version_numeric() {
        let plugins = vec![json!({"plugin": PLUGIN_SLUG, "version": 2})];
        assert_eq!(extract_plugin_version(&plugins).as_deref(), Some("2"));
    }
}
