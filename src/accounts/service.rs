use std::sync::{Arc, OnceLock};

use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::dto::{
    AuthResponse, PromoteResponse, RefreshRequest, SigninRequest, SignoutRequest, SignoutResponse,
    SignupRequest,
};
use crate::auth::password::{PasswordHasher, MAX_PASSWORD_BYTES};
use crate::auth::token::TokenService;
use crate::db::models::{Account, Role, TokenPair};
use crate::db::repository::UserRepository;
use crate::error::{AppError, AuthError, DatabaseError, PasswordError};

/// Orchestrates sign-up, sign-in, sign-out, refresh and promotion over the
/// injected repository, hasher and token service. Holds no per-request state.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
    // Verified against when sign-in finds no account, so a miss costs as
    // much as a wrong password. Hashed on first use with the injected hasher.
    decoy_hash: OnceLock<String>,
}

const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
            decoy_hash: OnceLock::new(),
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, AppError> {
        validate_credentials(&request.email, &request.password)?;

        // A failed lookup is an error, never "no such user"
        if self.users.find_user_by_email(&request.email).await?.is_some() {
            warn!("Signup rejected, email already registered: {}", request.email);
            return Err(AuthError::DuplicateEmail.into());
        }

        let password_hash = self.passwords.hash(&request.password)?;
        let account = Account::new(request.email, request.first_name, request.last_name, password_hash);

        let account = match self.users.create_user(&account).await {
            Ok(account) => account,
            Err(DatabaseError::Duplicate) => return Err(AuthError::DuplicateEmail.into()),
            Err(e) => return Err(e.into()),
        };

        let pair = self.issue_and_store(&account).await?;
        info!("Registered account {}", account.id);

        Ok(auth_response(account, pair, "User registered successfully"))
    }

    pub async fn signin(&self, request: SigninRequest) -> Result<AuthResponse, AppError> {
        let account = match self.users.find_user_by_email(&request.email).await? {
            Some(account) => account,
            None => {
                // Result ignored: the work is done only to match the timing
                let _ = self.passwords.verify(self.decoy_hash(), &request.password);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        match self.passwords.verify(&account.password, &request.password) {
            Ok(()) => {}
            Err(PasswordError::Mismatch) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e.into()),
        }

        let pair = self.issue_and_store(&account).await?;
        info!("Account {} signed in", account.id);

        Ok(auth_response(account, pair, "Login successful"))
    }

    /// Clears the stored token set. The presented access token must be the
    /// stored one, so a token that was already signed out (or replaced by a
    /// newer sign-in) is refused even while its signature is still valid.
    pub async fn signout(&self, request: SignoutRequest) -> Result<SignoutResponse, AppError> {
        let account_id = self
            .tokens
            .validate_access_token(&request.access_token)
            .map_err(|_| AuthError::InvalidToken)?;

        let account = self
            .users
            .find_user_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !account.holds_access_token(&request.access_token) {
            return Err(AuthError::InvalidToken.into());
        }

        self.users.delete_user_tokens(account_id).await?;
        info!("Account {} signed out", account_id);

        Ok(SignoutResponse {
            message: "Logout successful".to_string(),
        })
    }

    /// Exchanges a refresh token for a new pair, re-reading email and role
    /// from the store rather than trusting the refresh token's claims. The
    /// presented token must still be stored, so sign-out or a newer sign-in
    /// revokes it.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<AuthResponse, AppError> {
        let claims = self.tokens.validate_refresh_token(&request.refresh_token)?;
        let account_id = claims.account_id()?;

        let account = self
            .users
            .find_user_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !account.holds_refresh_token(&request.refresh_token) {
            warn!("Refresh rejected for account {}: token no longer stored", account_id);
            return Err(AuthError::InvalidToken.into());
        }

        let pair = self.issue_and_store(&account).await?;

        Ok(auth_response(account, pair, "Token refreshed"))
    }

    /// Grants the admin role. Only an existing admin may promote, and never
    /// themself.
    pub async fn promote(&self, caller_id: Uuid, target_id: Uuid) -> Result<PromoteResponse, AppError> {
        let caller = self
            .users
            .find_user_by_id(caller_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if caller.role != Role::Admin {
            warn!("Account {} attempted promotion without admin role", caller_id);
            return Err(AuthError::Forbidden("admin role required".into()).into());
        }
        if caller_id == target_id {
            return Err(AuthError::Forbidden("cannot promote yourself".into()).into());
        }

        let account = self
            .users
            .update_user_role(target_id, Role::Admin)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        info!("Account {} promoted {} to admin", caller_id, target_id);

        Ok(PromoteResponse {
            user: account.sanitized(),
            message: "User promoted successfully".to_string(),
        })
    }

    async fn issue_and_store(&self, account: &Account) -> Result<TokenPair, AppError> {
        let pair = self.tokens.issue_tokens(account.id, &account.email, account.role)?;
        self.users
            .update_user_tokens(account.id, std::slice::from_ref(&pair))
            .await?;
        Ok(pair)
    }

    fn decoy_hash(&self) -> &str {
        self.decoy_hash
            .get_or_init(|| self.passwords.hash(DECOY_PASSWORD).unwrap_or_default())
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if !email.contains('@') {
        return Err(AppError::ValidationError("a valid email is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::ValidationError("password must not be empty".into()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::ValidationError(format!(
            "password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

fn auth_response(account: Account, pair: TokenPair, message: &str) -> AuthResponse {
    AuthResponse {
        user: account.sanitized(),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        message: message.to_string(),
    }
}
