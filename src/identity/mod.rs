//! Viewer identity derived from the bearer token.
//!
//! The token is a three-segment dot-separated string whose middle segment is
//! a base64url JSON payload carrying `userId` and `role`. The decode here is
//! strictly advisory: it never verifies the signature and only feeds UI
//! gating. The server re-checks every mutation, so a forged or stale payload
//! buys nothing beyond a button that fails with 401/403.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Who the client believes is looking at the screen.
///
/// Both fields are `None` whenever the credential is absent or undecodable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Viewer {
    pub id: Option<String>,
    pub role: Option<String>,
}

impl Viewer {
    pub const fn anonymous() -> Self {
        Self {
            id: None,
            role: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    role: Option<String>,
}

/// Decode a credential into a [`Viewer`].
///
/// Any failure (missing credential, too few segments, bad base64, bad JSON)
/// collapses to the anonymous viewer. This function never errors.
pub fn resolve(credential: Option<&str>) -> Viewer {
    let token = match credential {
        Some(t) => t,
        None => return Viewer::anonymous(),
    };

    let mut segments = token.split('.');
    let payload_b64 = match (segments.next(), segments.next()) {
        (Some(_), Some(p)) => p,
        _ => return Viewer::anonymous(),
    };

    // Tokens are minted without padding but tolerate padded input.
    let bytes = match URL_SAFE_NO_PAD.decode(payload_b64.trim_end_matches('=')) {
        Ok(b) => b,
        Err(_) => return Viewer::anonymous(),
    };

    match serde_json::from_slice::<TokenPayload>(&bytes) {
        Ok(payload) => Viewer {
            id: payload.user_id,
            role: payload.role,
        },
        Err(_) => Viewer::anonymous(),
    }
}

/// Decode a credential, letting a role cached at login time win over the
/// token's embedded role. Covers servers whose tokens omit the role claim.
pub fn resolve_with_cached_role(credential: Option<&str>, cached_role: Option<&str>) -> Viewer {
    let mut viewer = resolve(credential);
    if let Some(role) = cached_role {
        viewer.role = Some(role.to_string());
    }
    viewer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(json: &str) -> String {
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(json))
    }

    #[test]
    fn test_resolve_none() {
        assert_eq!(resolve(None), Viewer::anonymous());
    }

    #[test]
    fn test_resolve_admin_token() {
        let token = token_with_payload(r#"{"userId":"u1","role":"admin"}"#);
        let viewer = resolve(Some(&token));
        assert_eq!(viewer.id.as_deref(), Some("u1"));
        assert_eq!(viewer.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_resolve_payload_missing_claims() {
        let token = token_with_payload(r#"{"iat":12345}"#);
        assert_eq!(resolve(Some(&token)), Viewer::anonymous());
    }

    #[test]
    fn test_resolve_too_few_segments() {
        assert_eq!(resolve(Some("justonesegment")), Viewer::anonymous());
    }

    #[test]
    fn test_resolve_bad_base64() {
        assert_eq!(resolve(Some("h.!!!not-base64!!!.s")), Viewer::anonymous());
    }

    #[test]
    fn test_resolve_payload_not_json() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("plain text"));
        assert_eq!(resolve(Some(&token)), Viewer::anonymous());
    }

    #[test]
    fn test_resolve_tolerates_padding() {
        let b64 = URL_SAFE_NO_PAD.encode(r#"{"userId":"u2","role":"user"}"#);
        let token = format!("h.{}==.s", b64);
        // Extra padding is stripped before decoding
        let viewer = resolve(Some(&token));
        assert_eq!(viewer.id.as_deref(), Some("u2"));
    }

    #[test]
    fn test_cached_role_takes_precedence() {
        let token = token_with_payload(r#"{"userId":"u1","role":"user"}"#);
        let viewer = resolve_with_cached_role(Some(&token), Some("admin"));
        assert_eq!(viewer.id.as_deref(), Some("u1"));
        assert_eq!(viewer.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_cached_role_fills_missing_claim() {
        let token = token_with_payload(r#"{"userId":"u1"}"#);
        let viewer = resolve_with_cached_role(Some(&token), Some("user"));
        assert_eq!(viewer.role.as_deref(), Some("user"));
    }

    #[test]
    fn test_no_cached_role_keeps_token_role() {
        let token = token_with_payload(r#"{"userId":"u1","role":"user"}"#);
        let viewer = resolve_with_cached_role(Some(&token), None);
        assert_eq!(viewer.role.as_deref(), Some("user"));
    }
}
