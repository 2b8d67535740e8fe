//! Bearer-token gate placed in front of protected routes.
//!
//! [`AuthGate`] resolves the `Authorization` header through the
//! [`TokenService`] and stores the resulting [`Identity`] in the request
//! extensions, where handlers pick it up as an extractor.

use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use tracing::debug;
use uuid::Uuid;

use crate::auth::token::TokenService;
use crate::error::{AppError, AuthError};

/// The caller behind a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: Uuid,
    pub token: String,
}

/// Parses `Bearer <token>` and validates the token.
pub fn resolve_bearer(header: Option<&str>, tokens: &dyn TokenService) -> Result<Identity, AppError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    let parts: Vec<&str> = header.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        return Err(AuthError::MalformedAuthHeader.into());
    }

    let token = parts[1];
    let account_id = tokens.validate_access_token(token)?;

    Ok(Identity {
        account_id,
        token: token.to_string(),
    })
}

fn authorization_header(req: &ServiceRequest) -> Result<Option<&str>, AppError> {
    match req.headers().get(header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| AuthError::MalformedAuthHeader.into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateMode {
    Required,
    Optional,
}

/// Middleware factory. `required` rejects with 401 before the handler runs;
/// `optional` lets anonymous or invalid callers through without an identity.
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<dyn TokenService>,
    mode: GateMode,
}

impl AuthGate {
    pub fn required(tokens: Arc<dyn TokenService>) -> Self {
        Self { tokens, mode: GateMode::Required }
    }

    pub fn optional(tokens: Arc<dyn TokenService>) -> Self {
        Self { tokens, mode: GateMode::Optional }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateMiddleware {
            service,
            tokens: self.tokens.clone(),
            mode: self.mode,
        }))
    }
}

pub struct AuthGateMiddleware<S> {
    service: S,
    tokens: Arc<dyn TokenService>,
    mode: GateMode,
}

impl<S, B> Service<ServiceRequest> for AuthGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let resolved = authorization_header(&req)
            .and_then(|header| resolve_bearer(header, self.tokens.as_ref()));

        match resolved {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
            }
            Err(e) if self.mode == GateMode::Required => {
                debug!("Rejected request to {}: {}", req.path(), e);
                let response = req.error_response(e).map_into_right_body();
                return Box::pin(async move { Ok(response) });
            }
            Err(e) => {
                debug!("Continuing anonymously on {}: {}", req.path(), e);
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or_else(|| AuthError::MissingCredentials.into()),
        )
    }
}
