use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{Account, Role, TokenPair};
use crate::error::DatabaseError;

/// Storage contract the account use cases run against.
///
/// Implementations must reject a second account with the same email
/// (`DatabaseError::Duplicate`) so the signup pre-check is not the only guard.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, account: &Account) -> Result<Account, DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError>;

    /// Replaces the whole stored token set. Callers pass a one-element slice,
    /// which gives single-session semantics: each issue evicts the previous pair.
    async fn update_user_tokens(&self, id: Uuid, tokens: &[TokenPair]) -> Result<(), DatabaseError>;

    async fn delete_user_tokens(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Matches either half of any stored pair.
    async fn find_user_by_token(&self, token: &str) -> Result<Option<Account>, DatabaseError>;

    /// Returns `None` when the id does not resolve.
    async fn update_user_role(&self, id: Uuid, role: Role) -> Result<Option<Account>, DatabaseError>;
}
