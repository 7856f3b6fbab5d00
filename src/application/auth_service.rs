use std::sync::Arc;

use crate::application::run_blocking;
use crate::auth::jwt::{JwtService, TokenKind, TokenPair};
use crate::auth::password::{hash_password, reset_token, verify_password, MIN_PASSWORD_LEN};
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, Principal, ProfileChanges, User};
use crate::notifications::{templates, EmailQueue};

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub password: String,
}

/// Which of the probed identifiers are already registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    pub username_taken: Option<bool>,
    pub email_taken: Option<bool>,
}

fn check_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: JwtService,
    emails: EmailQueue,
    frontend_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        jwt: JwtService,
        emails: EmailQueue,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            jwt,
            emails,
            frontend_url: frontend_url.into(),
        }
    }

    pub async fn register(&self, input: Registration) -> Result<(User, TokenPair), DomainError> {
        check_password(&input.password)?;
        let users = self.users.clone();
        let user = run_blocking(move || {
            if users.username_taken(&input.username)? {
                return Err(DomainError::Conflict("Username already exists".into()));
            }
            if users.email_taken(&input.email)? {
                return Err(DomainError::Conflict("Email already exists".into()));
            }
            let password_hash = hash_password(&input.password)?;
            users.create(NewUser {
                username: input.username,
                email: input.email,
                full_name: input.full_name,
                phone: input.phone,
                password_hash,
            })
        })
        .await?;

        log::info!(target: "auth", "user registered user_id={} username={}", user.id, user.username);
        self.emails.enqueue(templates::welcome(&user));
        let tokens = self.jwt.issue(&user)?;
        Ok((user, tokens))
    }

    /// `login` is a username or an email address.
    pub async fn login(&self, login: String, password: String) -> Result<(User, TokenPair), DomainError> {
        let users = self.users.clone();
        let attempted = login.clone();
        let user = run_blocking(move || {
            let creds = users
                .find_credentials(login.trim())?
                .filter(|c| verify_password(&password, &c.password_hash))
                .ok_or_else(|| DomainError::Unauthorized("Invalid credentials".into()))?;
            if !creds.user.is_active {
                return Err(DomainError::Unauthorized("Account is disabled".into()));
            }
            Ok(creds.user)
        })
        .await
        .inspect_err(|e| log::warn!(target: "auth", "login failed login={attempted}: {e}"))?;

        log::info!(target: "auth", "user logged in user_id={}", user.id);
        let tokens = self.jwt.issue(&user)?;
        Ok((user, tokens))
    }

    /// Rotates the refresh token: the presented one is revoked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let claims = self.jwt.verify(refresh_token, TokenKind::Refresh)?;
        let users = self.users.clone();
        let user = run_blocking(move || {
            if users.is_token_revoked(&claims.jti)? {
                return Err(DomainError::Unauthorized("Token has been revoked".into()));
            }
            let user = users
                .find_by_id(claims.sub)?
                .filter(|u| u.is_active)
                .ok_or_else(|| DomainError::Unauthorized("User not found".into()))?;
            users.revoke_token(&claims.jti, user.id, claims.expires_at())?;
            Ok(user)
        })
        .await?;
        self.jwt.issue(&user)
    }

    /// Revokes the presented access token and, when supplied, the caller's
    /// refresh token.
    pub async fn logout(&self, principal: Principal, refresh_token: Option<String>) -> Result<(), DomainError> {
        let refresh = match refresh_token {
            Some(token) => {
                let claims = self.jwt.verify(&token, TokenKind::Refresh)?;
                if claims.sub != principal.id {
                    return Err(DomainError::forbidden("Refresh token belongs to another user"));
                }
                Some(claims)
            }
            None => None,
        };
        let users = self.users.clone();
        let user_id = principal.id;
        run_blocking(move || {
            users.revoke_token(&principal.token_id, principal.id, principal.expires_at)?;
            if let Some(claims) = refresh {
                users.revoke_token(&claims.jti, claims.sub, claims.expires_at())?;
            }
            Ok(())
        })
        .await?;
        log::info!(target: "auth", "user logged out user_id={user_id}");
        Ok(())
    }

    /// Resolves a bearer access token to the caller.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, DomainError> {
        let claims = self.jwt.verify(token, TokenKind::Access)?;
        let users = self.users.clone();
        let jti = claims.jti.clone();
        let revoked = run_blocking(move || users.is_token_revoked(&jti)).await?;
        if revoked {
            return Err(DomainError::Unauthorized("Token has been revoked".into()));
        }
        Ok(claims.into_principal())
    }

    pub async fn profile(&self, user_id: uuid::Uuid) -> Result<User, DomainError> {
        let users = self.users.clone();
        run_blocking(move || users.find_by_id(user_id)?.ok_or(DomainError::NotFound("User"))).await
    }

    pub async fn update_profile(&self, user_id: uuid::Uuid, changes: ProfileChanges) -> Result<User, DomainError> {
        changes.validate()?;
        let users = self.users.clone();
        let user = run_blocking(move || users.update_profile(user_id, changes)).await?;
        log::info!(target: "auth", "profile updated user_id={user_id}");
        Ok(user)
    }

    pub async fn check_availability(
        &self,
        username: Option<String>,
        email: Option<String>,
    ) -> Result<Availability, DomainError> {
        if username.is_none() && email.is_none() {
            return Err(DomainError::invalid("Provide a username or an email to check"));
        }
        let users = self.users.clone();
        run_blocking(move || {
            Ok(Availability {
                username_taken: username.map(|u| users.username_taken(&u)).transpose()?,
                email_taken: email.map(|e| users.email_taken(&e)).transpose()?,
            })
        })
        .await
    }

    /// Always succeeds so the endpoint does not reveal which emails exist.
    pub async fn forgot_password(&self, email: String) -> Result<(), DomainError> {
        let token = reset_token();
        let users = self.users.clone();
        let stored = token.clone();
        let user = run_blocking(move || users.set_reset_token(email.trim(), &stored)).await?;
        match user {
            Some(user) => {
                log::info!(target: "auth", "password reset requested user_id={}", user.id);
                self.emails
                    .enqueue(templates::password_reset(&user, &self.frontend_url, &token));
            }
            None => log::info!(target: "auth", "password reset requested for unknown email"),
        }
        Ok(())
    }

    pub async fn reset_password(&self, token: String, new_password: String) -> Result<(), DomainError> {
        check_password(&new_password)?;
        let users = self.users.clone();
        let changed = run_blocking(move || {
            let hash = hash_password(&new_password)?;
            users.reset_password(&token, &hash)
        })
        .await?;
        if !changed {
            return Err(DomainError::invalid("Invalid or expired reset token"));
        }
        log::info!(target: "auth", "password reset completed");
        Ok(())
    }
}
