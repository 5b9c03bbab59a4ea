//! HTTP gateway to the SampleShare API.
//!
//! The [`Gateway`] owns the HTTP client, the base URL, and the persisted
//! session. Every authenticated call requires a held credential up front
//! (no network round-trip just to learn we are logged out), carries it as a
//! bearer header, and treats 401/403 as the uniform "session invalid"
//! signal: the stored credential and cached role are cleared together and
//! the call fails with [`ApiError::SessionExpired`]. That teardown and
//! explicit logout are the only two ways a session ends.

pub mod envelope;
pub mod error;
pub mod models;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::identity::{self, Viewer};
use crate::session::SessionStore;
use error::ApiError;
use models::{
    CommentPosted, CommentRequest, LoginRequest, LoginResponse, RegisterRequest, Sample,
    SampleFields,
};

/// The API surface the view controllers depend on.
///
/// A trait seam so controllers can be exercised against an in-memory fake.
#[async_trait]
pub trait SampleService {
    /// The viewer derived from the held credential and cached role.
    fn viewer(&self) -> Viewer;

    async fn list_samples(&mut self) -> Result<Vec<Sample>, ApiError>;
    async fn get_sample(&mut self, id: &str) -> Result<Sample, ApiError>;
    async fn create_sample(
        &mut self,
        fields: &SampleFields,
        audio: &Path,
    ) -> Result<Sample, ApiError>;
    async fn update_sample(&mut self, id: &str, fields: &SampleFields)
        -> Result<Sample, ApiError>;
    async fn delete_sample(&mut self, id: &str) -> Result<(), ApiError>;

    async fn add_comment(&mut self, sample_id: &str, text: &str)
        -> Result<CommentPosted, ApiError>;
    async fn update_comment(
        &mut self,
        sample_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<(), ApiError>;
    async fn delete_comment(&mut self, sample_id: &str, comment_id: &str)
        -> Result<(), ApiError>;
}

pub struct Gateway {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl Gateway {
    pub fn new(base_url: &str, timeout: Duration, session: SessionStore) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /login`. On success the credential and role are written to the
    /// session store together.
    ///
    /// A 401 here is a wrong password, not an expired session, so it maps to
    /// [`ApiError::RequestFailed`] with the server's message.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.failure("Login", response, false).await);
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|_| unreadable_response("Login"))?;

        if let Err(e) = self.session.set(login.token.clone(), login.role.clone()) {
            // The login itself succeeded; a persistence failure only costs
            // the next invocation its session.
            warn!(error = %e, "Failed to persist session");
        }
        Ok(login)
    }

    /// `POST /register`. Does not log the user in; the caller follows up
    /// with [`Gateway::login`].
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/register"))
            .json(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.failure("Registration", response, false).await);
        }
        Ok(())
    }

    /// Explicit logout: drop the stored credential and cached role.
    pub fn logout(&mut self) -> Result<()> {
        self.session.clear()
    }

    fn require_token(&self) -> Result<String, ApiError> {
        self.session
            .token()
            .map(String::from)
            .ok_or(ApiError::Unauthenticated)
    }

    /// Turn a non-success response into an [`ApiError`]. For authenticated
    /// calls, 401/403 tears down the session first.
    async fn failure(
        &mut self,
        operation: &str,
        response: reqwest::Response,
        authenticated: bool,
    ) -> ApiError {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        self.interpret_failure(operation, status, &body, authenticated)
    }

    fn interpret_failure(
        &mut self,
        operation: &str,
        status: StatusCode,
        body: &[u8],
        authenticated: bool,
    ) -> ApiError {
        if authenticated && error::is_session_invalid(status) {
            debug!(%status, operation, "Server rejected credential, clearing session");
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "Failed to clear session file");
            }
            return ApiError::SessionExpired;
        }
        error::request_failed(operation, status, body)
    }
}

fn unreadable_response(operation: &str) -> ApiError {
    ApiError::RequestFailed {
        message: format!("{} returned an unreadable response", operation),
    }
}

#[async_trait]
impl SampleService for Gateway {
    fn viewer(&self) -> Viewer {
        identity::resolve_with_cached_role(self.session.token(), self.session.role())
    }

    /// `GET /samples`. Public; tolerates the known envelope shapes.
    async fn list_samples(&mut self) -> Result<Vec<Sample>, ApiError> {
        let response = self.http.get(self.url("/samples")).send().await?;
        if !response.status().is_success() {
            return Err(self.failure("Loading samples", response, false).await);
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|_| unreadable_response("Loading samples"))?;
        Ok(envelope::parse_collection_envelope(body))
    }

    /// `GET /samples/:id`, including the embedded comment thread. Public.
    async fn get_sample(&mut self, id: &str) -> Result<Sample, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/samples/{}", id)))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("Loading sample", response, false).await);
        }
        response
            .json()
            .await
            .map_err(|_| unreadable_response("Loading sample"))
    }

    /// `POST /samples`: multipart upload of the field map plus the audio
    /// file.
    async fn create_sample(
        &mut self,
        fields: &SampleFields,
        audio: &Path,
    ) -> Result<Sample, ApiError> {
        let token = self.require_token()?;

        let bytes = tokio::fs::read(audio).await.map_err(|e| ApiError::RequestFailed {
            message: format!("Failed to read audio file: {}", e),
        })?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();
        let mime = mime_guess::from_path(audio).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())?;

        let mut form = Form::new().part("audio", part);
        if let Some(title) = &fields.title {
            form = form.text("title", title.clone());
        }
        if let Some(bpm) = fields.bpm {
            form = form.text("bpm", bpm.to_string());
        }
        if let Some(key) = &fields.key {
            form = form.text("key", key.clone());
        }
        if let Some(genre) = &fields.genre {
            form = form.text("genre", genre.clone());
        }
        if let Some(url) = &fields.url {
            form = form.text("url", url.clone());
        }

        let response = self
            .http
            .post(self.url("/samples"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("Create", response, true).await);
        }
        response.json().await.map_err(|_| unreadable_response("Create"))
    }

    /// `PUT /samples/:id`, returning the server's canonical sample so the
    /// caller can patch its local copy without re-fetching.
    async fn update_sample(
        &mut self,
        id: &str,
        fields: &SampleFields,
    ) -> Result<Sample, ApiError> {
        let token = self.require_token()?;
        let response = self
            .http
            .put(self.url(&format!("/samples/{}", id)))
            .bearer_auth(token)
            .json(fields)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("Update", response, true).await);
        }
        response.json().await.map_err(|_| unreadable_response("Update"))
    }

    /// `DELETE /samples/:id`.
    async fn delete_sample(&mut self, id: &str) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let response = self
            .http
            .delete(self.url(&format!("/samples/{}", id)))
            .bearer_auth(token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("Delete", response, true).await);
        }
        Ok(())
    }

    /// `POST /samples/:id/comments`. The response carries the entire
    /// updated sample, not just the new comment.
    async fn add_comment(
        &mut self,
        sample_id: &str,
        text: &str,
    ) -> Result<CommentPosted, ApiError> {
        let token = self.require_token()?;
        let response = self
            .http
            .post(self.url(&format!("/samples/{}/comments", sample_id)))
            .bearer_auth(token)
            .json(&CommentRequest {
                text: text.to_string(),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("Adding comment", response, true).await);
        }
        response
            .json()
            .await
            .map_err(|_| unreadable_response("Adding comment"))
    }

    /// `PUT /samples/:id/comments/:cid`. The server may answer with the
    /// updated comment or a bare ack; either way the caller patches its
    /// local copy with the text it sent.
    async fn update_comment(
        &mut self,
        sample_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let response = self
            .http
            .put(self.url(&format!("/samples/{}/comments/{}", sample_id, comment_id)))
            .bearer_auth(token)
            .json(&CommentRequest {
                text: text.to_string(),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("Updating comment", response, true).await);
        }
        Ok(())
    }

    /// `DELETE /samples/:id/comments/:cid`.
    async fn delete_comment(&mut self, sample_id: &str, comment_id: &str)
        -> Result<(), ApiError> {
        let token = self.require_token()?;
        let response = self
            .http
            .delete(self.url(&format!("/samples/{}/comments/{}", sample_id, comment_id)))
            .bearer_auth(token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.failure("Deleting comment", response, true).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gateway_with_session(token: Option<&str>) -> (Gateway, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut session = SessionStore::load(dir.path()).unwrap();
        if let Some(token) = token {
            session
                .set(token.to_string(), Some("user".to_string()))
                .unwrap();
        }
        let gateway =
            Gateway::new("http://localhost:3000", Duration::from_secs(5), session).unwrap();
        (gateway, dir)
    }

    #[test]
    fn test_require_token_without_session() {
        let (gateway, _dir) = gateway_with_session(None);
        assert!(matches!(
            gateway.require_token(),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn test_forbidden_on_authenticated_call_tears_down_session() {
        let (mut gateway, dir) = gateway_with_session(Some("tok"));
        let err =
            gateway.interpret_failure("Deleting comment", StatusCode::FORBIDDEN, b"{}", true);
        assert!(matches!(err, ApiError::SessionExpired));
        assert!(gateway.session().token().is_none());
        assert!(gateway.session().role().is_none());

        // Teardown reaches the disk, not just memory
        let reloaded = SessionStore::load(dir.path()).unwrap();
        assert!(!reloaded.is_authenticated());
    }

    #[test]
    fn test_unauthorized_on_public_call_keeps_session() {
        let (mut gateway, _dir) = gateway_with_session(Some("tok"));
        let err = gateway.interpret_failure(
            "Login",
            StatusCode::UNAUTHORIZED,
            br#"{"error":"Invalid credentials"}"#,
            false,
        );
        match err {
            ApiError::RequestFailed { message } => assert_eq!(message, "Invalid credentials"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gateway.session().token(), Some("tok"));
    }

    #[test]
    fn test_other_statuses_do_not_clear_session() {
        let (mut gateway, _dir) = gateway_with_session(Some("tok"));
        let err = gateway.interpret_failure(
            "Delete",
            StatusCode::INTERNAL_SERVER_ERROR,
            b"",
            true,
        );
        assert!(matches!(err, ApiError::RequestFailed { .. }));
        assert_eq!(gateway.session().token(), Some("tok"));
    }

    #[test]
    fn test_viewer_prefers_cached_role() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let token = format!(
            "h.{}.s",
            URL_SAFE_NO_PAD.encode(r#"{"userId":"u1","role":"user"}"#)
        );
        let dir = TempDir::new().unwrap();
        let mut session = SessionStore::load(dir.path()).unwrap();
        session.set(token, Some("admin".to_string())).unwrap();
        let gateway =
            Gateway::new("http://localhost:3000", Duration::from_secs(5), session).unwrap();

        let viewer = gateway.viewer();
        assert_eq!(viewer.id.as_deref(), Some("u1"));
        assert_eq!(viewer.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let dir = TempDir::new().unwrap();
        let session = SessionStore::load(dir.path()).unwrap();
        let gateway =
            Gateway::new("http://localhost:3000/", Duration::from_secs(5), session).unwrap();
        assert_eq!(gateway.url("/samples"), "http://localhost:3000/samples");
    }
}
