//! Business-rule errors raised by handlers.
//!
//! An [`ApiError`] is not a transport failure. When a handler returns one,
//! dispatch renders it as a JSON body the client can act on:
//!
//! ```json
//! {"error": "value:invalid", "data": "email", "message": "Invalid email."}
//! ```

use serde::Serialize;
use thiserror::Error;

/// A structured handler error: `error` is a machine-readable code, `data`
/// names the offending parameter (or resource), `message` is for humans.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("{error}: {message}")]
pub struct ApiError {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, data: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error: error.into(), data: data.into(), message: message.into() }
    }

    /// The input value of `field` is missing or invalid.
    pub fn value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:invalid", field, message)
    }

    /// The resource named by `field` does not exist.
    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:notfound", field, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new("permission:forbidden", "permission", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_error_data_message() {
        let err = ApiError::value("email", "Invalid email.");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "value:invalid", "data": "email", "message": "Invalid email."})
        );
    }

    #[test]
    fn constructors_pick_codes() {
        assert_eq!(ApiError::not_found("Blog", "missing").error, "value:notfound");
        let denied = ApiError::permission("admin only");
        assert_eq!(denied.error, "permission:forbidden");
        assert_eq!(denied.data, "permission");
    }
}
