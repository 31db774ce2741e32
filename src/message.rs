//! Call envelope: the request/response pair exchanged per invocation.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Result buffer of the response returned for an unregistered function name.
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// A call to a named handler.
///
/// The function name is matched exactly (case-sensitive). The argument is
/// opaque to the transport and only interpreted by the target handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    function_name: String,
    #[serde(with = "serde_bytes")]
    argument_buffer: Vec<u8>,
}

impl CallRequest {
    /// Build a request for `function_name` carrying `argument`.
    pub fn new(function_name: impl Into<String>, argument: impl Into<Vec<u8>>) -> Self {
        Self {
            function_name: function_name.into(),
            argument_buffer: argument.into(),
        }
    }

    /// Build a request with an empty argument.
    pub fn without_argument(function_name: impl Into<String>) -> Self {
        Self::new(function_name, Vec::new())
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn argument(&self) -> &[u8] {
        &self.argument_buffer
    }

    /// The argument decoded as UTF-8, replacing invalid sequences.
    pub fn argument_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.argument_buffer)
    }

    pub fn into_argument(self) -> Vec<u8> {
        self.argument_buffer
    }
}

/// Outcome of a call: a success flag and an opaque result buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    success: bool,
    #[serde(with = "serde_bytes")]
    result_buffer: Vec<u8>,
}

impl CallResponse {
    pub fn new(success: bool, result: impl Into<Vec<u8>>) -> Self {
        Self {
            success,
            result_buffer: result.into(),
        }
    }

    /// A successful response carrying `result`.
    pub fn ok(result: impl Into<Vec<u8>>) -> Self {
        Self::new(true, result)
    }

    /// A failed response carrying `message`.
    pub fn failure(message: impl Into<Vec<u8>>) -> Self {
        Self::new(false, message)
    }

    /// The sentinel response for a function name with no registered handler.
    pub fn unknown() -> Self {
        Self::failure(UNKNOWN_FUNCTION)
    }

    /// Whether this is the unknown-function sentinel.
    pub fn is_unknown(&self) -> bool {
        !self.success && self.result_buffer == UNKNOWN_FUNCTION.as_bytes()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn result(&self) -> &[u8] {
        &self.result_buffer
    }

    /// The result decoded as UTF-8, replacing invalid sequences.
    pub fn result_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.result_buffer)
    }

    pub fn into_result(self) -> Vec<u8> {
        self.result_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accessors() {
        let request = CallRequest::new("SayHello", "hi there");
        assert_eq!(request.function_name(), "SayHello");
        assert_eq!(request.argument(), b"hi there");
        assert_eq!(request.argument_str(), "hi there");
        assert_eq!(request.into_argument(), b"hi there".to_vec());
    }

    #[test]
    fn test_request_without_argument() {
        let request = CallRequest::without_argument("Ping");
        assert!(request.argument().is_empty());
    }

    #[test]
    fn test_unknown_sentinel() {
        let response = CallResponse::unknown();
        assert!(!response.success());
        assert_eq!(response.result(), b"unknown");
        assert!(response.is_unknown());
    }

    #[test]
    fn test_handler_failure_with_unknown_text_is_still_unknown_shaped() {
        // The sentinel is defined by its contents, not by who produced it.
        assert!(CallResponse::failure("unknown").is_unknown());
        assert!(!CallResponse::ok("unknown").is_unknown());
        assert!(!CallResponse::failure("unknown function").is_unknown());
    }

    #[test]
    fn test_result_str_is_lossy() {
        let response = CallResponse::ok(vec![b'o', b'k', 0xFF]);
        assert_eq!(response.result_str(), "ok\u{FFFD}");
    }
}
