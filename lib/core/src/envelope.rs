//! The REST response envelope shared by every backend endpoint.
//!
//! Every remote call answers with `{ code, message, data }`. A `code` of 200
//! means success; any other code is a reportable failure whose `message` is
//! shown to the user.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The code the backend uses for a successful response.
pub const SUCCESS_CODE: i32 = 200;

/// A typed view of the backend response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Status code; 200 is success.
    pub code: i32,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
    /// The payload, present on success.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response wrapping `data`.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: String::from("ok"),
            data: Some(data),
        }
    }

    /// Creates a failure response with the given code and message.
    #[must_use]
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Returns true if the response carries the success code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Unwraps the envelope into the payload.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] carrying the backend code and message when the
    /// response is not a success.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ApiError {
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// A non-success response from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The backend status code.
    pub code: i32,
    /// The user-facing message.
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request failed with code {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
