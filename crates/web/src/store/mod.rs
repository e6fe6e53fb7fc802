//! The record store the handlers persist accounts and tokens in.
//!
//! Only the interface lives here; [`MemoryStore`] backs the tests and the
//! default binary. Deleted accounts stay in the store with `deleted_at` set
//! and are invisible to every lookup.

mod locks;
mod memory;
mod model;

use async_trait::async_trait;
use thiserror::Error;

pub use locks::{AccountGuard, AccountLocks};
pub use memory::MemoryStore;
pub use model::Account;
pub use model::AccountView;
pub use model::NewAccount;
pub use model::PublicAccountView;
pub use model::TokenRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a live account already uses email {email}")]
    EmailTaken { email: String },

    #[error("no live account with id {id}")]
    AccountNotFound { id: u64 },

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn email_taken<S: ToString>(email: S) -> Self {
        Self::EmailTaken { email: email.to_string() }
    }

    pub fn unavailable<S: ToString>(reason: S) -> Self {
        Self::Unavailable { reason: reason.to_string() }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_account(&self, id: u64) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Fails with [`StoreError::EmailTaken`] when a live account has the email.
    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Overwrites the live account with the same id and bumps `updated_at`.
    async fn save_account(&self, account: Account) -> Result<Account, StoreError>;

    /// Soft delete; returns whether a live account was deleted.
    async fn delete_account(&self, id: u64) -> Result<bool, StoreError>;

    async fn count_accounts(&self) -> Result<usize, StoreError>;

    async fn find_token_by_access(&self, access_token: &str) -> Result<Option<TokenRecord>, StoreError>;

    async fn find_token_by_refresh(&self, refresh_token: &str) -> Result<Option<TokenRecord>, StoreError>;

    /// Inserts the record when its id is 0, replaces it otherwise.
    async fn save_token(&self, token: TokenRecord) -> Result<TokenRecord, StoreError>;
}
