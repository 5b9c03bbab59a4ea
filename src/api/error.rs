//! Error taxonomy for API calls.
//!
//! Four outcomes matter to callers: no credential held, credential rejected
//! by the server, a structured rejection (validation and friends), and
//! transport failure. Malformed credentials never reach this module; the
//! identity resolver absorbs them into an anonymous viewer.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No credential is held; the caller should send the user to login.
    /// No network call was made.
    #[error("You must log in first")]
    Unauthenticated,

    /// The server rejected the held credential (401/403). The stored
    /// session has already been cleared by the time this is returned.
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    /// The server refused the request with a structured error.
    #[error("{message}")]
    RequestFailed { message: String },

    /// No usable response from the server.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// Whether the caller should redirect to login.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthenticated | ApiError::SessionExpired)
    }
}

/// The server's error envelope: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Whether a status is the uniform "session invalid" signal.
pub fn is_session_invalid(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Build a [`ApiError::RequestFailed`] from a non-success response, taking
/// the server's `error` field when present, else a generic
/// `"<operation> failed (<status>)"` message.
///
/// The session-invalid statuses are the gateway's concern: on authenticated
/// calls it tears the session down and returns
/// [`ApiError::SessionExpired`] before reaching this function.
pub fn request_failed(operation: &str, status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| format!("{} failed ({})", operation, status.as_u16()));

    ApiError::RequestFailed { message }
}
