use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::user::{Principal, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub staff: bool,
    pub kind: TokenKind,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn into_principal(self) -> Principal {
        let expires_at = self.expires_at();
        Principal {
            id: self.sub,
            username: self.username,
            is_staff: self.staff,
            token_id: self.jti,
            expires_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    pub access_expires_in: i64,
}

/// HS256 signer for access and refresh tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, access_ttl_minutes: i64, refresh_ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::minutes(refresh_ttl_minutes),
        }
    }

    fn sign(&self, user_id: Uuid, username: &str, staff: bool, kind: TokenKind) -> Result<String, DomainError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            staff,
            kind,
            jti: Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| DomainError::Internal(format!("token signing failed: {e}")))
    }

    pub fn issue(&self, user: &User) -> Result<TokenPair, DomainError> {
        Ok(TokenPair {
            access: self.sign(user.id, &user.username, user.is_staff, TokenKind::Access)?,
            refresh: self.sign(user.id, &user.username, user.is_staff, TokenKind::Refresh)?,
            access_expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify signature, expiry and token kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, DomainError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => DomainError::Unauthorized("Token has expired".into()),
                _ => DomainError::Unauthorized("Invalid token".into()),
            }
        })?;

        if data.claims.kind != expected {
            return Err(DomainError::Unauthorized("Wrong token type".into()));
        }
        Ok(data.claims)
    }

    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ").map(str::trim)
    }
}
