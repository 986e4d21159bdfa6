use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::errors::AppError;
use crate::models::Role;
use crate::state::AppState;

pub const OPERATOR_ID: &str = "admin";

/// The authenticated caller. Issued by the identity service and trusted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "sub")]
    pub id: String,
    pub role: Role,
}

impl Identity {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_owner_or_admin(&self, owner_id: &str) -> Result<(), AppError> {
        if self.is_admin() || self.id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Whose record a create acts on: admins may name any user, everyone
    /// else only themselves.
    pub fn acting_for(&self, requested: Option<&str>) -> Result<String, AppError> {
        match requested {
            Some(user_id) if user_id != self.id => {
                self.require_admin()?;
                Ok(user_id.to_string())
            }
            _ => Ok(self.id.clone()),
        }
    }
}

fn sign(secret: &str, payload: &str) -> Option<Hmac<Sha1>> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload.as_bytes());
    Some(mac)
}

pub fn issue_token(secret: &str, identity: &Identity) -> anyhow::Result<String> {
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(identity)?);
    let mac = sign(secret, &payload).ok_or_else(|| anyhow::anyhow!("invalid signing key"))?;
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{payload}.{signature}"))
}

pub fn verify_token(secret: &str, token: &str) -> Option<Identity> {
    let (payload, signature) = token.split_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    sign(secret, payload)?.verify_slice(&signature).ok()?;
    let raw = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&raw).ok()
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let token = auth.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

        // Static operator token for development and local administration.
        // Deployments should issue signed admin tokens instead.
        if !state.config.admin_token.is_empty() && token == state.config.admin_token {
            return Ok(Identity::admin(OPERATOR_ID));
        }

        verify_token(&state.config.auth_secret, token).ok_or_else(|| {
            tracing::warn!("rejected bearer token");
            AppError::Unauthorized
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let identity = Identity::user("u-1");
        let token = issue_token("secret", &identity).unwrap();
        assert_eq!(verify_token("secret", &token), Some(identity));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("secret", &Identity::admin("a-1")).unwrap();
        assert_eq!(verify_token("other", &token), None);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue_token("secret", &Identity::user("u-1")).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"u-1","role":"admin"}"#);
        assert_eq!(verify_token("secret", &format!("{forged}.{signature}")), None);
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(verify_token("secret", "not-a-token"), None);
        assert_eq!(verify_token("secret", "a.b"), None);
    }

    #[test]
    fn test_acting_for() {
        let user = Identity::user("u-1");
        assert_eq!(user.acting_for(None).unwrap(), "u-1");
        assert_eq!(user.acting_for(Some("u-1")).unwrap(), "u-1");
        assert!(matches!(user.acting_for(Some("u-2")), Err(AppError::Forbidden)));

        let admin = Identity::admin("a-1");
        assert_eq!(admin.acting_for(Some("u-2")).unwrap(), "u-2");
    }

    #[test]
    fn test_ownership() {
        let user = Identity::user("u-1");
        assert!(user.require_owner_or_admin("u-1").is_ok());
        assert!(user.require_owner_or_admin("u-2").is_err());
        assert!(Identity::admin("a").require_owner_or_admin("u-2").is_ok());
    }
}
