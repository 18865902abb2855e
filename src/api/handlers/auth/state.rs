//! Auth configuration and the derived signing state.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use super::token::{self, SessionClaims, TokenError};

pub const DEFAULT_SESSION_DAYS: u32 = 7;
pub const DEFAULT_COOKIE_NAME: &str = "cloudnav_session";

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    password: Option<SecretString>,
    session_secret: Option<SecretString>,
    session_days: u32,
    cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            password: None,
            session_secret: None,
            session_days: DEFAULT_SESSION_DAYS,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        }
    }

    /// Blank values are ignored.
    #[must_use]
    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = non_blank(password);
        self
    }

    /// Blank values are ignored; the secret is then derived from the password.
    #[must_use]
    pub fn with_session_secret(mut self, secret: SecretString) -> Self {
        self.session_secret = non_blank(secret);
        self
    }

    #[must_use]
    pub fn with_session_days(mut self, days: u32) -> Self {
        self.session_days = days.max(1);
        self
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        let name = name.trim();
        if !name.is_empty() {
            self.cookie_name = name.to_string();
        }
        self
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        i64::from(self.session_days) * SECONDS_PER_DAY
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    #[must_use]
    pub fn has_session_secret(&self) -> bool {
        self.session_secret.is_some()
    }
}

fn non_blank(value: SecretString) -> Option<SecretString> {
    let trimmed = value.expose_secret().trim();
    (!trimmed.is_empty()).then(|| SecretString::from(trimmed.to_string()))
}

/// Shared by every handler behind an `Arc`.
#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    signing_secret: Option<SecretString>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let signing_secret = config.password.as_ref().map(|password| {
            config.session_secret.clone().unwrap_or_else(|| {
                SecretString::from(token::derive_secret(password.expose_secret()))
            })
        });
        Self {
            config,
            signing_secret,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// False when no admin password is set; every auth path then answers 503.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.signing_secret.is_some()
    }

    /// Digests are compared, never the raw strings.
    #[must_use]
    pub fn check_password(&self, candidate: &str) -> bool {
        let Some(password) = &self.config.password else {
            return false;
        };
        Sha256::digest(candidate.trim().as_bytes())
            == Sha256::digest(password.expose_secret().as_bytes())
    }

    /// Sign a fresh admin token issued at `now`; `None` when unconfigured.
    ///
    /// # Errors
    /// Returns an error if the token cannot be signed.
    pub fn issue(&self, now: i64) -> Result<Option<(String, SessionClaims)>, TokenError> {
        let Some(secret) = &self.signing_secret else {
            return Ok(None);
        };
        let claims = SessionClaims::new(now, self.config.session_ttl_seconds());
        let signed = token::sign(&claims, secret.expose_secret())?;
        Ok(Some((signed, claims)))
    }

    #[must_use]
    pub fn verify(&self, candidate: &str) -> Option<SessionClaims> {
        let secret = self.signing_secret.as_ref()?;
        token::verify(candidate, secret.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(password: &str) -> AuthState {
        AuthState::new(AuthConfig::new().with_password(SecretString::from(password.to_string())))
    }

    #[test]
    fn blank_password_leaves_auth_unconfigured() {
        let state = configured("   ");
        assert!(!state.is_configured());
        assert!(!state.check_password(""));
        assert!(state.issue(0).unwrap().is_none());
    }

    #[test]
    fn password_is_trimmed_on_both_sides() {
        let state = configured(" hunter2 ");
        assert!(state.check_password("hunter2"));
        assert!(state.check_password("  hunter2\n"));
        assert!(!state.check_password("hunter3"));
    }

    #[test]
    fn issued_token_verifies_with_configured_lifetime() {
        let state = AuthState::new(
            AuthConfig::new()
                .with_password(SecretString::from("pw".to_string()))
                .with_session_days(2),
        );
        let now = chrono::Utc::now().timestamp();
        let (signed, claims) = state.issue(now).unwrap().unwrap();
        assert_eq!(claims.exp - claims.iat, 2 * SECONDS_PER_DAY);
        assert_eq!(state.verify(&signed), Some(claims));
    }

    #[test]
    fn explicit_secret_overrides_derived_one() {
        let derived = configured("pw");
        let explicit = AuthState::new(
            AuthConfig::new()
                .with_password(SecretString::from("pw".to_string()))
                .with_session_secret(SecretString::from("s3cret".to_string())),
        );
        let now = chrono::Utc::now().timestamp();
        let (signed, _) = explicit.issue(now).unwrap().unwrap();
        assert!(explicit.verify(&signed).is_some());
        assert!(derived.verify(&signed).is_none());
    }

    #[test]
    fn cookie_name_and_days_fall_back() {
        let config = AuthConfig::new()
            .with_cookie_name("  ".to_string())
            .with_session_days(0);
        assert_eq!(config.cookie_name(), DEFAULT_COOKIE_NAME);
        assert_eq!(config.session_ttl_seconds(), SECONDS_PER_DAY);
    }
}
