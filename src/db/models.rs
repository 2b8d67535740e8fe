use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub country: String,
    pub region: String,
    pub city: String,
    pub street: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub bio: String,
    pub gender: String,
    pub profile_picture: String,
    pub phone_number: String,
    pub address: Address,
}

/// One issued access/refresh pair. `expires_at` is the access token expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn contains(&self, token: &str) -> bool {
        self.access_token == token || self.refresh_token == token
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Live credentials, never part of a serialized account
    #[serde(default, skip_serializing)]
    pub tokens: Vec<TokenPair>,
}

impl Account {
    /// Builds a fresh `user`-role account around an already hashed password.
    pub fn new(email: String, first_name: String, last_name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            first_name,
            last_name,
            password: password_hash,
            role: Role::User,
            profile: Profile::default(),
            created_at: now,
            updated_at: now,
            tokens: Vec::new(),
        }
    }

    /// Copy safe to hand out of the core: the password hash and the stored
    /// token pairs are cleared.
    pub fn sanitized(mut self) -> Self {
        self.password.clear();
        self.tokens.clear();
        self
    }

    pub fn holds_access_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|pair| pair.access_token == token)
    }

    pub fn holds_refresh_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|pair| pair.refresh_token == token)
    }
}
