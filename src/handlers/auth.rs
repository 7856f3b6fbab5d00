use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::application::auth_service::Registration;
use crate::auth::{AuthUser, TokenPair};
use crate::domain::user::{ProfileChanges, User};
use crate::errors::AppError;
use crate::handlers::MessageResponse;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email address.
    #[serde(alias = "email")]
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// Refresh token to revoke along with the access token.
    pub refresh: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 150))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    /// `F` or `M`
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCheckParams {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserCheckResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_taken: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_taken: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub gender: Option<String>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            phone: u.phone,
            gender: u.gender,
            is_staff: u.is_staff,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(p: TokenPair) -> Self {
        Self {
            access: p.access,
            refresh: p.refresh,
            token_type: "Bearer".to_string(),
            expires_in: p.access_expires_in,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenResponse,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed", body = crate::handlers::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::handlers::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let (user, tokens) = state
        .auth
        .register(Registration {
            username: body.username.trim().to_string(),
            email: body.email.trim().to_string(),
            full_name: body.full_name,
            phone: body.phone,
            password: body.password,
        })
        .await?;
    Ok(HttpResponse::Created().json(AuthResponse {
        user: user.into(),
        tokens: tokens.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::handlers::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let (user, tokens) = state.auth.login(body.username, body.password).await?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        user: user.into(),
        tokens: tokens.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid or revoked refresh token", body = crate::handlers::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn refresh(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let tokens = state.auth.refresh(&body.refresh).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(tokens)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body(content = LogoutRequest, description = "Optional refresh token"),
    responses(
        (status = 200, description = "Tokens revoked", body = MessageResponse),
        (status = 401, description = "Not signed in", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: Option<web::Json<LogoutRequest>>,
) -> Result<HttpResponse, AppError> {
    let refresh = body.and_then(|b| b.into_inner().refresh);
    state.auth.logout(principal, refresh).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully logged out")))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not signed in", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn profile(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<HttpResponse, AppError> {
    let user = state.auth.profile(principal.id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Validation failed", body = crate::handlers::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::handlers::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn update_profile(
    state: web::Data<AppState>,
    AuthUser(principal): AuthUser,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    let user = state
        .auth
        .update_profile(
            principal.id,
            ProfileChanges {
                username: body.username,
                full_name: body.full_name,
                email: body.email,
                phone: body.phone,
                gender: body.gender,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/user-check",
    params(
        ("username" = Option<String>, Query, description = "Username to probe"),
        ("email" = Option<String>, Query, description = "Email to probe"),
    ),
    responses(
        (status = 200, description = "Which identifiers are taken", body = UserCheckResponse),
        (status = 400, description = "Nothing to check", body = crate::handlers::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn user_check(
    state: web::Data<AppState>,
    query: web::Query<UserCheckParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let result = state
        .auth
        .check_availability(params.username, params.email)
        .await?;
    Ok(HttpResponse::Ok().json(UserCheckResponse {
        username_taken: result.username_taken,
        email_taken: result.email_taken,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset email queued if the account exists", body = MessageResponse)),
    tag = "auth"
)]
pub async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    state.auth.forgot_password(body.email).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "If an account exists for this email, a reset link has been sent",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid token or password", body = crate::handlers::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;
    state.auth.reset_password(body.token, body.password).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password has been reset")))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/token/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/profile", web::get().to(profile))
            .route("/profile", web::patch().to(update_profile))
            .route("/user-check", web::get().to(user_check))
            .route("/forgot-password", web::post().to(forgot_password))
            .route("/reset-password", web::post().to(reset_password)),
    );
}
