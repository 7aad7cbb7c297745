//! Uniform result envelope shared by every adapter operation, plus the
//! payload-normalization helpers used by the shared invoke routine.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Literal marker the service uses to signal a successful operation.
pub(crate) const SUCCESS_MARKER: &str = "SUCCESS";

/// Failure origin classification carried by [`ApiFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    /// Transport/protocol-level fault reported by the service itself.
    Fault,
    /// The remote call returned no usable payload.
    Fatal,
    /// The call completed but the business operation was rejected.
    Error,
    /// Unexpected failure while connecting or performing the call.
    Exception,
}

impl ErrorLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fault => "fault",
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Exception => "exception",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed operation. `level` distinguishes the failure origin; `message`
/// carries the upstream-provided explanation when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiFailure {
    pub level: ErrorLevel,
    pub message: Option<String>,
}

impl ApiFailure {
    pub fn new(level: ErrorLevel, message: impl Into<String>) -> Self {
        Self { level, message: Some(message.into()) }
    }

    /// Failure for unexpected errors; no upstream message exists.
    pub fn exception() -> Self {
        Self { level: ErrorLevel::Exception, message: None }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.level, message),
            None => f.write_str(self.level.as_str()),
        }
    }
}

/// Outcome of one adapter operation.
///
/// Operations that fall back to returning the upstream payload verbatim use
/// the `Raw` variant; its `Value` still carries the injected
/// `result`/`message`/`level` fields, so callers can inspect why the
/// documented success shape was not produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    /// The documented success shape.
    Ok(T),
    /// Upstream payload did not match the documented success shape.
    Raw(Value),
    /// The operation did not take effect.
    Err(ApiFailure),
}

impl<T> ApiResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// The success payload, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(data) => Some(data),
            _ => None,
        }
    }

    /// The failure, if any.
    pub fn err(self) -> Option<ApiFailure> {
        match self {
            Self::Err(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Unwrap the payload nested under `"<operation>Result"`.
///
/// The key is looked up at the top level first and, when absent, one level
/// deeper under the response's first key.
pub(crate) fn extract_payload(operation: &str, response: &Value) -> Value {
    let key = format!("{operation}Result");

    let direct = &response[key.as_str()];
    if !direct.is_null() {
        return direct.clone();
    }

    if let Some(map) = response.as_object() {
        if let Some((_, first)) = map.iter().next() {
            let nested = &first[key.as_str()];
            if !nested.is_null() {
                return nested.clone();
            }
        }
    }

    Value::Null
}

/// Normalize an extracted payload per the shared invoke contract.
///
/// Non-object payloads are fatal; a `faultcode` key is a service fault.
/// Otherwise the payload is returned with an injected `result` boolean
/// derived from the SUCCESS marker, plus `message` and `level` fields when
/// the operation was rejected.
pub(crate) fn normalize(mut payload: Value) -> Result<Value, ApiFailure> {
    let map = match payload.as_object_mut() {
        Some(map) => map,
        None => return Err(ApiFailure::new(ErrorLevel::Fatal, "No data returned")),
    };

    if map.contains_key("faultcode") {
        let message = map
            .get("faultstring")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(ApiFailure { level: ErrorLevel::Fault, message });
    }

    let succeeded = map.get("OperationResult").and_then(Value::as_str) == Some(SUCCESS_MARKER);
    map.insert("result".to_string(), Value::Bool(succeeded));
    if !succeeded {
        let message = map.get("OperationMessage").cloned().unwrap_or(Value::Null);
        map.insert("message".to_string(), message);
        map.insert("level".to_string(), Value::String(ErrorLevel::Error.as_str().to_string()));
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_payload_at_top_level() {
        let response = json!({"RenewResult": {"OperationResult": "SUCCESS"}});
        let payload = extract_payload("Renew", &response);
        assert_eq!(payload["OperationResult"], "SUCCESS");
    }

    #[test]
    fn extracts_payload_one_level_deeper() {
        let response = json!({"RenewResponse": {"RenewResult": {"OperationResult": "SUCCESS"}}});
        let payload = extract_payload("Renew", &response);
        assert_eq!(payload["OperationResult"], "SUCCESS");
    }

    #[test]
    fn missing_payload_extracts_null() {
        let response = json!({"Unrelated": {"AlsoUnrelated": 1}});
        assert!(extract_payload("Renew", &response).is_null());
    }

    #[test]
    fn normalize_rejects_non_object_payload() {
        let failure = normalize(Value::Null).unwrap_err();
        assert_eq!(failure.level, ErrorLevel::Fatal);
        assert_eq!(failure.message.as_deref(), Some("No data returned"));

        let failure = normalize(json!("scalar")).unwrap_err();
        assert_eq!(failure.level, ErrorLevel::Fatal);
    }

    #[test]
    fn normalize_detects_fault() {
        let failure = normalize(json!({
            "faultcode": "soap:Server",
            "faultstring": "internal service error",
        }))
        .unwrap_err();

        assert_eq!(failure.level, ErrorLevel::Fault);
        assert_eq!(failure.message.as_deref(), Some("internal service error"));
    }

    #[test]
    fn normalize_injects_success_flag() {
        let payload = normalize(json!({"OperationResult": "SUCCESS"})).unwrap();
        assert_eq!(payload["result"], true);
        assert!(payload.get("level").is_none());
    }

    #[test]
    fn normalize_marks_business_rejection() {
        let payload = normalize(json!({
            "OperationResult": "FAILED",
            "OperationMessage": "insufficient balance",
        }))
        .unwrap();

        assert_eq!(payload["result"], false);
        assert_eq!(payload["message"], "insufficient balance");
        assert_eq!(payload["level"], "error");
    }

    #[test]
    fn error_level_strings() {
        assert_eq!(ErrorLevel::Fault.as_str(), "fault");
        assert_eq!(ErrorLevel::Fatal.as_str(), "fatal");
        assert_eq!(ErrorLevel::Error.as_str(), "error");
        assert_eq!(ErrorLevel::Exception.as_str(), "exception");
    }
}
