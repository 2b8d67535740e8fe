use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Account, Role, TokenPair};
use crate::db::repository::UserRepository;
use crate::error::DatabaseError;

/// Process-local user store. Used for development and tests.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, account: &Account) -> Result<Account, DatabaseError> {
        let mut accounts = self.accounts.write().await;

        // Checked under the write lock, so concurrent signups cannot both pass
        if accounts.contains_key(&account.id) || accounts.values().any(|a| a.email == account.email) {
            return Err(DatabaseError::Duplicate);
        }

        accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn update_user_tokens(&self, id: Uuid, tokens: &[TokenPair]) -> Result<(), DatabaseError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        account.tokens = tokens.to_vec();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user_tokens(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        account.tokens.clear();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<Account>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.tokens.iter().any(|pair| pair.contains(token)))
            .cloned())
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> Result<Option<Account>, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|account| {
            account.role = role;
            account.updated_at = Utc::now();
            account.clone()
        }))
    }
}
