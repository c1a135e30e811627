//! JSON error contract returned to HTTP callers.

use serde::{Deserialize, Serialize};

/// Fixed code reported for structural validation failures.
pub const VALIDATION_ERROR_CODE: &str = "Validation_Error";

/// Fixed category reported for structural validation failures.
pub const VALIDATION_ERROR_TYPE: &str = "Validation Error";

/// Resource key of the generic message for unclassified failures.
pub const UNHANDLED_EXCEPTION_CODE: &str = "UnhandledException";

/// One entry of a 400 response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub error_code: String,
    pub error_message: String,
    pub error_type: String,
    pub severity: String,
}

impl ErrorDetail {
    /// Detail for a structural validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            error_code: VALIDATION_ERROR_CODE.to_owned(),
            error_message: message.into(),
            error_type: VALIDATION_ERROR_TYPE.to_owned(),
            severity: crate::Severity::Warning.as_str().to_owned(),
        }
    }
}

/// Body of a 500 response.
///
/// `exception` is only populated in diagnostic mode; production responses
/// carry the generic message alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetail {
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionDiagnostic>,
}

/// Diagnostic view of an unclassified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDiagnostic {
    /// Top-level error message.
    pub message: String,
    /// Messages of the underlying causes, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ExceptionDiagnostic {
    #[must_use]
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn error_detail_uses_camel_case() {
        let detail = ErrorDetail {
            error_code: "Name_Required".to_owned(),
            error_message: "Name is required".to_owned(),
            error_type: "BrokenRule".to_owned(),
            severity: "Error".to_owned(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "errorCode": "Name_Required",
                "errorMessage": "Name is required",
                "errorType": "BrokenRule",
                "severity": "Error"
            })
        );
    }

    #[test]
    fn exception_payload_is_omitted_when_absent() {
        let detail = ExceptionDetail {
            error_message: "Something went wrong".to_owned(),
            exception: None,
        };
        let json = serde_json::to_string(&detail).unwrap();
        assert_eq!(json, r#"{"errorMessage":"Something went wrong"}"#);
    }

    #[test]
    fn diagnostic_collects_cause_chain() {
        let err = anyhow::anyhow!("connection refused").context("loading products");
        let diag = ExceptionDiagnostic::from_anyhow(&err);
        assert_eq!(diag.message, "loading products");
        assert_eq!(diag.causes, ["connection refused"]);
    }
}
