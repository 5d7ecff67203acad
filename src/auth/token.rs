//! HS256 JWT minting.
//!
//! Tokens are signed with the requesting app's secret, so each app can verify
//! the tokens issued for it and nothing else. Verification lives in the
//! consuming services, not here.

use super::error::TokenError;
use super::storage::{App, User};
use base64ct::{Base64UrlUnpadded, Encoding};
use ring::hmac;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use ulid::Ulid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub uid: i64,
    pub email: String,
    pub app_id: i32,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

pub trait TokenIssuer: Send + Sync {
    /// Mint a token for `user` scoped to `app`, valid for `ttl`.
    ///
    /// # Errors
    /// Returns an error if the app has no usable key or the claims cannot be encoded.
    fn issue(&self, user: &User, app: &App, ttl: Duration) -> Result<String, TokenError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JwtIssuer;

impl JwtIssuer {
    /// Mint a token as if the current time were `now`.
    ///
    /// # Errors
    /// Returns an error if the app secret is empty, `ttl` overflows the
    /// timestamp range, or the claims cannot be encoded.
    pub fn issue_at(
        &self,
        user: &User,
        app: &App,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let secret = app.secret.expose_secret();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret(app.id));
        }

        let iat = now.unix_timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or(TokenError::InvalidTtl)?;

        let claims = TokenClaims {
            uid: user.id,
            email: user.email.clone(),
            app_id: app.id,
            iat,
            exp,
            jti: Ulid::new().to_string(),
        };

        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        let signature = hmac::sign(&key, signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(signature.as_ref());

        Ok(format!("{signing_input}.{signature_b64}"))
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, user: &User, app: &App, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(user, app, ttl, OffsetDateTime::now_utc())
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}
