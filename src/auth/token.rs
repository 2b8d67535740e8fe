use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Role, TokenPair};
use crate::error::TokenError;

pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Account ID
    pub email: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,     // Issued at
    pub exp: i64,     // Expiration time
    #[serde(default)]
    pub jti: String,  // Unique per token, so pairs issued in the same second differ
}

impl Claims {
    pub fn account_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::MalformedClaims)
    }
}

/// Mints and checks signed access/refresh token pairs.
pub trait TokenService: Send + Sync {
    fn issue_tokens(&self, account_id: Uuid, email: &str, role: Role) -> Result<TokenPair, TokenError>;

    fn validate_access_token(&self, token: &str) -> Result<Uuid, TokenError>;

    fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError>;

    /// Re-issues a pair from the refresh token's own claims. Does not look
    /// the account up, so a role change since issuance is not picked up.
    fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims = self.validate_refresh_token(refresh_token)?;
        let account_id = claims.account_id()?;
        self.issue_tokens(account_id, &claims.email, claims.role)
    }
}

/// HS256 JWTs signed with one shared secret.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &str) -> Self {
        Self::with_lifetimes(
            secret,
            Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
            Duration::days(REFRESH_TOKEN_TTL_DAYS),
        )
    }

    pub fn with_lifetimes(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn decode_token(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongTokenType);
        }
        Ok(claims)
    }
}

impl TokenService for JwtTokenService {
    fn issue_tokens(&self, account_id: Uuid, email: &str, role: Role) -> Result<TokenPair, TokenError> {
        // Whole seconds, so the pair's timestamps agree with the `iat`/`exp` claims
        let now = Utc
            .timestamp_opt(Utc::now().timestamp(), 0)
            .single()
            .ok_or_else(|| TokenError::Signing("clock out of range".into()))?;
        let access_exp = now + self.access_ttl;
        let refresh_exp = now + self.refresh_ttl;

        let claims = |token_type, exp: i64| Claims {
            sub: account_id.to_string(),
            email: email.to_string(),
            role,
            token_type,
            iat: now.timestamp(),
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        let access_token = self.sign(&claims(TokenType::Access, access_exp.timestamp()))?;
        let refresh_token = self.sign(&claims(TokenType::Refresh, refresh_exp.timestamp()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at: access_exp,
            created_at: now,
        })
    }

    fn validate_access_token(&self, token: &str) -> Result<Uuid, TokenError> {
        self.decode_token(token, TokenType::Access)?.account_id()
    }

    fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.decode_token(token, TokenType::Refresh)?;
        claims.account_id()?;
        Ok(claims)
    }
}
