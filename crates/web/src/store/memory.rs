use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::{Account, NewAccount, Store, StoreError, TokenRecord};

#[derive(Debug, Default)]
struct Tables {
    accounts: Vec<Account>,
    tokens: Vec<TokenRecord>,
    next_account_id: u64,
    next_token_id: u64,
}

/// An in-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn live(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(|account| account.is_live())
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.live().any(|account| account.email.eq_ignore_ascii_case(email) && Some(account.id) != except)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_account(&self, id: u64) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.live().find(|account| account.id == id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.live().find(|account| account.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&account.email, None) {
            return Err(StoreError::email_taken(account.email));
        }

        tables.next_account_id += 1;
        let now = Utc::now();
        let account = Account {
            id: tables.next_account_id,
            created_at: now,
            updated_at: now,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            ..Account::default()
        };

        debug!(id = account.id, "account created");
        tables.accounts.push(account.clone());
        Ok(account)
    }

    async fn save_account(&self, mut account: Account) -> Result<Account, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&account.email, Some(account.id)) {
            return Err(StoreError::email_taken(account.email));
        }

        let slot = tables
            .accounts
            .iter_mut()
            .find(|stored| stored.id == account.id && stored.is_live())
            .ok_or(StoreError::AccountNotFound { id: account.id })?;

        account.updated_at = Utc::now();
        *slot = account.clone();
        Ok(account)
    }

    async fn delete_account(&self, id: u64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.accounts.iter_mut().find(|account| account.id == id && account.is_live()) {
            Some(account) => {
                account.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_accounts(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().await.live().count())
    }

    async fn find_token_by_access(&self, access_token: &str) -> Result<Option<TokenRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.tokens.iter().find(|token| token.access_token == access_token).cloned())
    }

    async fn find_token_by_refresh(&self, refresh_token: &str) -> Result<Option<TokenRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.tokens.iter().find(|token| token.refresh_token == refresh_token).cloned())
    }

    async fn save_token(&self, mut token: TokenRecord) -> Result<TokenRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        token.updated_at = now;

        if let Some(slot) = tables.tokens.iter_mut().find(|stored| token.id != 0 && stored.id == token.id) {
            *slot = token.clone();
            return Ok(token);
        }

        tables.next_token_id += 1;
        token.id = tables.next_token_id;
        token.created_at = now;
        tables.tokens.push(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str) -> NewAccount {
        NewAccount { username: "alice".into(), email: email.into(), password_hash: "hash".into() }
    }

    #[tokio::test]
    async fn create_and_find() {
        let store = MemoryStore::new();
        let created = store.create_account(new_account("alice@example.com")).await.unwrap();

        assert_eq!(created.id, 1);
        assert!(!created.is_active);
        assert_eq!(store.find_account(1).await.unwrap(), Some(created.clone()));
        assert_eq!(store.find_account_by_email("Alice@Example.com").await.unwrap(), Some(created));
        assert_eq!(store.count_accounts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn email_is_unique_among_live_accounts() {
        let store = MemoryStore::new();
        let first = store.create_account(new_account("alice@example.com")).await.unwrap();

        let clash = store.create_account(new_account("alice@example.com")).await;
        assert_eq!(clash, Err(StoreError::email_taken("alice@example.com")));

        assert!(store.delete_account(first.id).await.unwrap());
        assert!(!store.delete_account(first.id).await.unwrap());
        assert_eq!(store.find_account(first.id).await.unwrap(), None);
        assert_eq!(store.count_accounts().await.unwrap(), 0);

        let second = store.create_account(new_account("alice@example.com")).await.unwrap();
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn save_checks_email_and_liveness() {
        let store = MemoryStore::new();
        let alice = store.create_account(new_account("alice@example.com")).await.unwrap();
        let bob = store.create_account(new_account("bob@example.com")).await.unwrap();

        let stolen = Account { email: "alice@example.com".into(), ..bob.clone() };
        assert!(matches!(store.save_account(stolen).await, Err(StoreError::EmailTaken { .. })));

        let activated = store.save_account(Account { is_active: true, ..alice.clone() }).await.unwrap();
        assert!(activated.is_active);
        assert!(activated.updated_at >= alice.updated_at);

        store.delete_account(bob.id).await.unwrap();
        assert_eq!(store.save_account(bob.clone()).await, Err(StoreError::AccountNotFound { id: bob.id }));
    }

    #[tokio::test]
    async fn tokens() {
        let store = MemoryStore::new();
        let record = TokenRecord { account_id: 1, access_token: "a1".into(), refresh_token: "r1".into(), ..TokenRecord::default() };
        let saved = store.save_token(record).await.unwrap();
        assert_eq!(saved.id, 1);

        let rotated = TokenRecord { access_token: "a2".into(), refresh_token: "r2".into(), ..saved };
        store.save_token(rotated).await.unwrap();

        assert_eq!(store.find_token_by_access("a1").await.unwrap(), None);
        assert_eq!(store.find_token_by_refresh("r2").await.unwrap().map(|token| token.id), Some(1));
        assert_eq!(store.find_token_by_access("a2").await.unwrap().map(|token| token.account_id), Some(1));
    }
}
