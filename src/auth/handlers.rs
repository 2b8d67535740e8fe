use actix_web::{web, HttpResponse};
use tracing::{error, info};
use uuid::Uuid;

use crate::accounts::dto::{RefreshRequest, SigninRequest, SignoutRequest, SignupRequest, WhoAmIResponse};
use crate::auth::gate::Identity;
use crate::error::AppError;
use crate::AppState;

pub async fn sign_up(
    req: web::Json<SignupRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for email: {}", req.email);
    let email = req.email.clone();

    match state.accounts.signup(req.into_inner()).await {
        Ok(response) => {
            info!("Registration successful for email: {}", email);
            Ok(HttpResponse::Created().json(response))
        }
        Err(e) => {
            error!("Registration failed for email: {}: {}", email, e);
            Err(e)
        }
    }
}

pub async fn sign_in(
    req: web::Json<SigninRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);
    let email = req.email.clone();

    match state.accounts.signin(req.into_inner()).await {
        Ok(response) => {
            info!("Login successful for email: {}", email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("Login failed for email: {}: {}", email, e);
            Err(e)
        }
    }
}

/// Behind the required gate, so `identity` always carries a validated token.
pub async fn sign_out(
    identity: Identity,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .accounts
        .signout(SignoutRequest { access_token: identity.token })
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

pub async fn promote(
    identity: Identity,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let target_id = Uuid::parse_str(&path.into_inner())
        .map_err(|_| AppError::ValidationError("invalid account id".into()))?;

    let response = state.accounts.promote(identity.account_id, target_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn refresh(
    req: web::Json<RefreshRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let response = state.accounts.refresh(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Behind the optional gate: answers for anonymous and known callers alike.
pub async fn whoami(identity: Option<Identity>) -> HttpResponse {
    HttpResponse::Ok().json(WhoAmIResponse {
        authenticated: identity.is_some(),
        account_id: identity.map(|identity| identity.account_id),
    })
}
