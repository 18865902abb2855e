//! Stateless session tokens: `base64url(payload) "." base64url(hmac_sha256(payload))`.
//!
//! Nothing is stored server side; rotating the secret (or the password it is
//! derived from) invalidates every outstanding token.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// The only identity a token can carry.
pub const SUBJECT: &str = "admin";

/// Domain separation for secrets derived from the admin password.
const SECRET_DOMAIN: &str = "cloudnav:";

/// Tokens issued up to this far in the future are still accepted.
const CLOCK_SKEW_SECONDS: i64 = 30;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to encode session payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid session secret")]
    Key,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expires at, unix seconds. Fixed at issue time; use does not extend it.
    pub exp: i64,
}

impl SessionClaims {
    #[must_use]
    pub fn new(now: i64, ttl_seconds: i64) -> Self {
        Self {
            sub: SUBJECT.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_seconds),
        }
    }

    /// Seconds until expiry as seen at `now`, never negative.
    #[must_use]
    pub fn remaining(&self, now: i64) -> i64 {
        self.exp.saturating_sub(now).max(0)
    }
}

/// Secret used when none is configured: follows the password when it rotates.
#[must_use]
pub fn derive_secret(password: &str) -> String {
    let digest = Sha256::digest(format!("{SECRET_DOMAIN}{password}").as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

/// # Errors
/// Returns an error if the claims cannot be encoded.
pub fn sign(claims: &SessionClaims, secret: &str) -> Result<String, TokenError> {
    let payload = serde_json::to_vec(claims)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::Key)?;
    mac.update(&payload);
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        Base64UrlUnpadded::encode_string(&payload),
        Base64UrlUnpadded::encode_string(&signature)
    ))
}

/// Claims of a valid token, `None` for anything else.
///
/// Failures are deliberately indistinguishable to the caller.
#[must_use]
pub fn verify(token: &str, secret: &str) -> Option<SessionClaims> {
    verify_at(token, secret, chrono::Utc::now().timestamp())
}

#[must_use]
pub fn verify_at(token: &str, secret: &str, now: i64) -> Option<SessionClaims> {
    let (payload_part, signature_part) = token.trim().rsplit_once('.')?;
    let payload = Base64UrlUnpadded::decode_vec(payload_part).ok()?;
    let signature = Base64UrlUnpadded::decode_vec(signature_part).ok()?;

    // `verify_slice` compares in constant time and rejects length mismatches.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(&payload);
    mac.verify_slice(&signature).ok()?;

    let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;
    let valid = claims.sub == SUBJECT
        && claims.exp > now
        && claims.iat <= now.saturating_add(CLOCK_SKEW_SECONDS);

    valid.then_some(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 24 * 60 * 60;

    #[test]
    fn sign_then_verify_returns_claims() {
        let claims = SessionClaims::new(NOW, 7 * DAY);
        let token = sign(&claims, "secret").unwrap();
        assert_eq!(verify_at(&token, "secret", NOW + 10), Some(claims));
    }

    #[test]
    fn different_secret_is_rejected() {
        let token = sign(&SessionClaims::new(NOW, DAY), "secret").unwrap();
        assert_eq!(verify_at(&token, "other", NOW), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign(&SessionClaims::new(NOW, DAY), "secret").unwrap();
        assert_eq!(verify_at(&token, "secret", NOW + DAY), None);
        assert!(verify_at(&token, "secret", NOW + DAY - 1).is_some());
    }

    #[test]
    fn future_issued_token_is_rejected_beyond_skew() {
        let ahead = sign(&SessionClaims::new(NOW + 31, DAY), "secret").unwrap();
        assert_eq!(verify_at(&ahead, "secret", NOW), None);

        let within = sign(&SessionClaims::new(NOW + 30, DAY), "secret").unwrap();
        assert!(verify_at(&within, "secret", NOW).is_some());
    }

    #[test]
    fn wrong_subject_is_rejected() {
        let claims = SessionClaims {
            sub: "root".to_string(),
            ..SessionClaims::new(NOW, DAY)
        };
        let token = sign(&claims, "secret").unwrap();
        assert_eq!(verify_at(&token, "secret", NOW), None);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = sign(&SessionClaims::new(NOW, DAY), "secret").unwrap();
        let (_, signature) = token.rsplit_once('.').unwrap();
        let forged = SessionClaims::new(NOW, 3650 * DAY);
        let forged_payload = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{forged_payload}.{signature}");
        assert_eq!(verify_at(&forged_token, "secret", NOW), None);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["", ".", "abc", "a.b.c", "!!!.???", "eyJ9.", ".c2ln"] {
            assert_eq!(verify_at(token, "secret", NOW), None, "token {token:?}");
        }
    }

    #[test]
    fn derived_secret_is_stable_and_password_bound() {
        assert_eq!(derive_secret("hunter2"), derive_secret("hunter2"));
        assert_ne!(derive_secret("hunter2"), derive_secret("hunter3"));
        assert!(!derive_secret("hunter2").contains('='));
    }

    #[test]
    fn remaining_lifetime_never_negative() {
        let claims = SessionClaims::new(NOW, 60);
        assert_eq!(claims.remaining(NOW), 60);
        assert_eq!(claims.remaining(NOW + 120), 0);
    }
}
