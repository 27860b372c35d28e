//! HS256 compact bearer tokens (`header.payload.signature`, base64url).
//!
//! Tokens carry the user's identity, role and approval state so the
//! middleware can gate requests without a store round-trip.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::{Role, User, UserId, UserStatus};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const MAX_TOKEN_LEN: usize = 4096;

/// Payload of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    /// User e-mail.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Access level at issue time.
    pub role: Role,
    /// Approval state at issue time.
    pub status: UserStatus,
    /// Approval timestamp.
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    /// Approving admin.
    #[serde(default)]
    pub approved_by: Option<UserId>,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not three base64url segments of valid JSON, or wrong algorithm.
    #[error("malformed token")]
    Malformed,
    /// The MAC does not verify.
    #[error("invalid signature")]
    BadSignature,
    /// `exp` is in the past.
    #[error("token expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Unauthorized("Session expired. Please log in again.".to_string()),
            TokenError::Malformed | TokenError::BadSignature => {
                Self::Unauthorized("Invalid token provided".to_string())
            }
        }
    }
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Issues and verifies tokens with one shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"***")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    /// Creates a signer whose tokens live `ttl_hours`.
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::hours(ttl_hours),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        <HmacSha256 as Mac>::new_from_slice(&self.secret).map_err(|_| TokenError::Malformed)
    }

    /// Issues a token for `user` valid from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] if the claims cannot be serialized.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            status: user.status,
            approved_at: user.approved_at,
            approved_by: user.approved_by,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER_JSON),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verifies signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns the [`TokenError`] describing the first failed check.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }
        let mut parts = token.split('.');
        let (Some(header_part), Some(payload_part), Some(signature_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|_| TokenError::Malformed)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if header.alg != "HS256" {
            return Err(TokenError::Malformed);
        }

        let expected = URL_SAFE_NO_PAD.decode(signature_part).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(format!("{header_part}.{payload_part}").as_bytes());
        mac.verify_slice(&expected).map_err(|_| TokenError::BadSignature)?;

        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn user(status: UserStatus) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            status,
            created_at: now,
            updated_at: now,
            approved_at: None,
            approved_by: None,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let signer = TokenSigner::new("secret", 12);
        let account = user(UserStatus::Approved);
        let Ok(token) = signer.issue(&account) else {
            panic!("issue failed");
        };
        let Ok(claims) = signer.verify(&token) else {
            panic!("verify failed");
        };
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
    }

    #[test]
    fn other_secret_is_rejected() {
        let Ok(token) = TokenSigner::new("a", 12).issue(&user(UserStatus::Approved)) else {
            panic!("issue failed");
        };
        assert_eq!(TokenSigner::new("b", 12).verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = TokenSigner::new("secret", 12);
        let Ok(token) = signer.issue(&user(UserStatus::Pending)) else {
            panic!("issue failed");
        };
        let parts: Vec<&str> = token.split('.').collect();
        let [header, _, signature] = parts.as_slice() else {
            panic!("unexpected shape");
        };
        let forged = URL_SAFE_NO_PAD.encode(br#"{"role":"admin"}"#);
        let tampered = format!("{header}.{forged}.{signature}");
        assert_eq!(signer.verify(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_token_is_rejected_with_session_message() {
        let signer = TokenSigner::new("secret", 12);
        let issued = Utc::now() - Duration::hours(13);
        let Ok(token) = signer.issue_at(&user(UserStatus::Approved), issued) else {
            panic!("issue failed");
        };
        let result = signer.verify(&token);
        assert_eq!(result, Err(TokenError::Expired));
        let Err(err) = result else {
            panic!("expected error");
        };
        assert_eq!(
            AppError::from(err).to_string(),
            "Session expired. Please log in again."
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let signer = TokenSigner::new("secret", 12);
        assert_eq!(signer.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(signer.verify("a.b.c.d"), Err(TokenError::Malformed));
    }
}
