use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lockout::{LockoutState, OneTimeSecret};

/// A user account as persisted. Never serialized to a client directly: the
/// handlers answer with [`AccountView`] or [`PublicAccountView`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    /// Path under the avatars directory.
    pub avatar: Option<String>,
    /// Login throttling.
    pub auth: LockoutState,
    pub otp: OneTimeSecret<u32>,
    pub reset: OneTimeSecret<String>,
}

impl Account {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// The token pair last issued to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TokenRecord {
    #[serde(rename = "ID")]
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(rename = "UserID")]
    pub account_id: u64,
    pub access_token: String,
    pub refresh_token: String,
}

/// The account as its owner sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// The account as anyone else sees it: no email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicAccountView {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    pub username: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            created_at: account.created_at,
            updated_at: account.updated_at,
            deleted_at: account.deleted_at,
            username: account.username.clone(),
            email: account.email.clone(),
            is_active: account.is_active,
            avatar: account.avatar.clone(),
        }
    }
}

impl From<&Account> for PublicAccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            created_at: account.created_at,
            updated_at: account.updated_at,
            username: account.username.clone(),
            is_active: account.is_active,
            avatar: account.avatar.clone(),
        }
    }
}
