use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::Account;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignoutRequest {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Issued on sign-up, sign-in and refresh. `user` is always sanitized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: Account,
    pub access_token: String,
    pub refresh_token: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignoutResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromoteResponse {
    pub user: Account,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
}
