//! Signed bearer tokens.
//!
//! A token is `base64url(claims) "." base64url(mac)`, where the claims are
//! JSON and the mac is the BLAKE3 keyed hash of the encoded claims. Access and
//! refresh tokens are keyed differently, so one kind never verifies as the
//! other even when both secrets are equal.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::store::Account;

const ACCESS_CONTEXT: &str = "pixel 2024-06-01 access token mac";
const REFRESH_CONTEXT: &str = "pixel 2024-06-01 refresh token mac";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: u64,
    pub username: String,
    pub email: String,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("expect {expected:?} token, found {found:?}")]
    WrongType { expected: TokenKind, found: TokenKind },

    #[error("can't encode claims: {0}")]
    Encode(#[from] serde_json::Error),
}

struct SigningKey {
    key: [u8; 32],
    ttl: TimeDelta,
}

/// Issues and verifies both kinds of token.
pub struct TokenSigner {
    access: SigningKey,
    refresh: SigningKey,
}

impl TokenSigner {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: SigningKey::derive(ACCESS_CONTEXT, &config.access_secret, config.access_ttl),
            refresh: SigningKey::derive(REFRESH_CONTEXT, &config.refresh_secret, config.refresh_ttl),
        }
    }

    pub fn issue(&self, kind: TokenKind, account: &Account, now: DateTime<Utc>) -> Result<String, TokenError> {
        let signing_key = self.key(kind);
        let claims = Claims {
            sub: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            typ: kind,
            iat: now.timestamp(),
            exp: now.checked_add_signed(signing_key.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC).timestamp(),
            jti: Uuid::new_v4(),
        };

        let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let mac = blake3::keyed_hash(&signing_key.key, encoded.as_bytes());
        Ok(format!("{encoded}.{}", URL_SAFE_NO_PAD.encode(mac.as_bytes())))
    }

    pub fn issue_pair(&self, account: &Account, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, account, now)?,
            refresh_token: self.issue(TokenKind::Refresh, account, now)?,
        })
    }

    /// Checks format, signature, kind and expiry, in that order.
    pub fn verify(&self, kind: TokenKind, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (encoded, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;

        let signature: [u8; 32] = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?
            .try_into()
            .map_err(|_| TokenError::Malformed)?;

        // blake3::Hash compares in constant time
        let expected = blake3::keyed_hash(&self.key(kind).key, encoded.as_bytes());
        if expected != blake3::Hash::from_bytes(signature) {
            return Err(TokenError::BadSignature);
        }

        let payload = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.typ != kind {
            return Err(TokenError::WrongType { expected: kind, found: claims.typ });
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn key(&self, kind: TokenKind) -> &SigningKey {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

impl SigningKey {
    fn derive(context: &str, secret: &str, ttl: std::time::Duration) -> Self {
        Self { key: blake3::derive_key(context, secret.as_bytes()), ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn signer() -> TokenSigner {
        let mut config = AuthConfig::new("access-secret", "refresh-secret");
        config.access_ttl = Duration::from_secs(60);
        config.refresh_ttl = Duration::from_secs(3600);
        TokenSigner::new(&config)
    }

    fn account() -> Account {
        Account { id: 7, username: "alice".into(), email: "alice@example.com".into(), ..Account::default() }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let signer = signer();
        let token = signer.issue(TokenKind::Access, &account(), now()).unwrap();
        let claims = signer.verify(TokenKind::Access, &token, now()).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn tokens_are_unique() {
        let signer = signer();
        let pair_1 = signer.issue_pair(&account(), now()).unwrap();
        let pair_2 = signer.issue_pair(&account(), now()).unwrap();

        assert_ne!(pair_1.access_token, pair_2.access_token);
        assert_ne!(pair_1.refresh_token, pair_2.refresh_token);
    }

    #[test]
    fn kinds_do_not_mix() {
        let signer = signer();
        let pair = signer.issue_pair(&account(), now()).unwrap();

        assert!(matches!(signer.verify(TokenKind::Refresh, &pair.access_token, now()), Err(TokenError::BadSignature)));
        assert!(matches!(signer.verify(TokenKind::Access, &pair.refresh_token, now()), Err(TokenError::BadSignature)));
        assert!(signer.verify(TokenKind::Refresh, &pair.refresh_token, now()).is_ok());
    }

    #[test]
    fn same_secret_still_checks_kind() {
        let signer = TokenSigner::new(&AuthConfig::new("same", "same"));
        let access = signer.issue(TokenKind::Access, &account(), now()).unwrap();

        assert!(signer.verify(TokenKind::Refresh, &access, now()).is_err());
    }

    #[test]
    fn expiry() {
        let signer = signer();
        let token = signer.issue(TokenKind::Access, &account(), now()).unwrap();

        assert!(signer.verify(TokenKind::Access, &token, now() + TimeDelta::seconds(59)).is_ok());
        assert!(matches!(signer.verify(TokenKind::Access, &token, now() + TimeDelta::seconds(60)), Err(TokenError::Expired)));
    }

    #[test]
    fn tampering() {
        let signer = signer();
        let token = signer.issue(TokenKind::Access, &account(), now()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged = Account { id: 1, ..account() };
        let other = signer.issue(TokenKind::Access, &forged, now()).unwrap();
        let (forged_claims, _) = other.split_once('.').unwrap();

        let spliced = format!("{forged_claims}.{signature}");
        assert!(matches!(signer.verify(TokenKind::Access, &spliced, now()), Err(TokenError::BadSignature)));
        assert!(matches!(signer.verify(TokenKind::Access, "no-dot", now()), Err(TokenError::Malformed)));
        assert!(matches!(signer.verify(TokenKind::Access, "abc.def", now()), Err(TokenError::Malformed)));
    }
}
