//! Resolving the caller behind a bearer token.
//!
//! The gate answers with an identity or with nothing: a missing header, an
//! unknown token, a deleted or inactive account and a bad or expired
//! signature all look the same to the handler, which then answers 401.

pub mod token;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pixel_http::protocol::Request;
use tracing::{debug, warn};

use crate::store::{Account, Store};
use token::{TokenKind, TokenSigner};

const AUTHORIZATION: &str = "Authorization";
const BEARER: &str = "Bearer ";

/// The authenticated caller, attached to the request by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account: Account,
}

#[async_trait]
pub trait Authenticate: Send + Sync {
    async fn authenticate(&self, req: &Request) -> Option<Identity>;
}

pub struct AuthGate {
    store: Arc<dyn Store>,
    signer: Arc<TokenSigner>,
}

impl AuthGate {
    pub fn new(store: Arc<dyn Store>, signer: Arc<TokenSigner>) -> Self {
        Self { store, signer }
    }
}

#[async_trait]
impl Authenticate for AuthGate {
    async fn authenticate(&self, req: &Request) -> Option<Identity> {
        let token = req.header(AUTHORIZATION)?.strip_prefix(BEARER)?.trim();
        if token.is_empty() {
            return None;
        }

        let record = match self.store.find_token_by_access(token).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(path = req.path(), "unknown access token");
                return None;
            }
            Err(e) => {
                warn!(cause = %e, "can't look up access token");
                return None;
            }
        };

        let account = match self.store.find_account(record.account_id).await {
            Ok(Some(account)) if account.is_active => account,
            Ok(_) => {
                debug!(account_id = record.account_id, "token owner is gone or inactive");
                return None;
            }
            Err(e) => {
                warn!(cause = %e, "can't look up token owner");
                return None;
            }
        };

        match self.signer.verify(TokenKind::Access, token, Utc::now()) {
            Ok(claims) if claims.sub == account.id => Some(Identity { account }),
            Ok(claims) => {
                warn!(sub = claims.sub, account_id = account.id, "token subject does not match its record");
                None
            }
            Err(e) => {
                debug!(cause = %e, account_id = account.id, "access token rejected");
                None
            }
        }
    }
}
