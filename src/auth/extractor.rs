//! Request extractors that resolve the bearer token to a [`Principal`].

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::auth::jwt::JwtService;
use crate::domain::user::Principal;
use crate::errors::AppError;
use crate::state::AppState;

/// Required authentication. Rejects with 401 when the token is missing,
/// invalid, expired or revoked.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

/// Optional authentication for endpoints guests may also call. A missing
/// header yields `None`; a bad token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Principal>);

fn bearer_token(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".into()))?;
    JwtService::extract_from_header(header)
        .map(|t| Some(t.to_string()))
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".into()))
}

async fn resolve(state: Option<web::Data<AppState>>, token: Option<String>) -> Result<Option<Principal>, AppError> {
    let Some(token) = token else {
        return Ok(None);
    };
    let state = state.ok_or_else(|| AppError::Internal("application state missing".into()))?;
    let principal = state.auth.authenticate(&token).await.map_err(|e| {
        log::warn!(target: "auth", "token rejected: {e}");
        AppError::from(e)
    })?;
    Ok(Some(principal))
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move {
            let principal = resolve(state, token?)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Authentication credentials were not provided".into()))?;
            Ok(AuthUser(principal))
        })
    }
}

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move { Ok(MaybeUser(resolve(state, token?).await?)) })
    }
}
