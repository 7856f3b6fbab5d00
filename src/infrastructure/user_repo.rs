use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, ProfileChanges, StoredCredentials, User};
use crate::schema::{revoked_tokens, users};

use super::models::{NewRevokedTokenRow, NewUserRow, UserChangeset, UserRow};

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn lookup(conn: &mut PgConnection, login: &str) -> QueryResult<Option<(UserRow, String)>> {
    let by_username = users::table
        .filter(users::username.eq(login))
        .select((UserRow::as_select(), users::password_hash))
        .first(conn)
        .optional()?;
    if by_username.is_some() {
        return Ok(by_username);
    }
    users::table
        .filter(users::email.eq(login.to_lowercase()))
        .select((UserRow::as_select(), users::password_hash))
        .first(conn)
        .optional()
}

impl UserRepository for DieselUserRepository {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let username_taken: bool = diesel::select(diesel::dsl::exists(
                users::table.filter(users::username.eq(&user.username)),
            ))
            .get_result(conn)?;
            if username_taken {
                return Err(DomainError::Conflict("Username already exists".into()));
            }
            let email = user.email.to_lowercase();
            let email_taken: bool = diesel::select(diesel::dsl::exists(
                users::table.filter(users::email.eq(&email)),
            ))
            .get_result(conn)?;
            if email_taken {
                return Err(DomainError::Conflict("Email already exists".into()));
            }

            let row = diesel::insert_into(users::table)
                .values(&NewUserRow {
                    id: Uuid::new_v4(),
                    username: user.username,
                    email,
                    full_name: user.full_name,
                    phone: user.phone,
                    password_hash: user.password_hash,
                })
                .returning(UserRow::as_returning())
                .get_result(conn)?;
            Ok(row.into_user())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(UserRow::into_user))
    }

    fn find_credentials(&self, login: &str) -> Result<Option<StoredCredentials>, DomainError> {
        let mut conn = self.pool.get()?;
        let found = lookup(&mut conn, login)?;
        Ok(found.map(|(row, password_hash)| StoredCredentials {
            user: row.into_user(),
            password_hash,
        }))
    }

    fn username_taken(&self, username: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::select(diesel::dsl::exists(
            users::table.filter(users::username.eq(username)),
        ))
        .get_result(&mut conn)?)
    }

    fn email_taken(&self, email: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::select(diesel::dsl::exists(
            users::table.filter(users::email.eq(email.to_lowercase())),
        ))
        .get_result(&mut conn)?)
    }

    fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            if let Some(username) = &changes.username {
                let taken: bool = diesel::select(diesel::dsl::exists(
                    users::table
                        .filter(users::username.eq(username))
                        .filter(users::id.ne(id)),
                ))
                .get_result(conn)?;
                if taken {
                    return Err(DomainError::Conflict("Username already exists".into()));
                }
            }
            let email = changes.email.map(|e| e.to_lowercase());
            if let Some(email) = &email {
                let taken: bool = diesel::select(diesel::dsl::exists(
                    users::table
                        .filter(users::email.eq(email))
                        .filter(users::id.ne(id)),
                ))
                .get_result(conn)?;
                if taken {
                    return Err(DomainError::Conflict("Email already exists".into()));
                }
            }

            let row = diesel::update(users::table.find(id))
                .set(&UserChangeset {
                    username: changes.username,
                    full_name: changes.full_name,
                    email,
                    phone: changes.phone,
                    gender: changes.gender,
                    updated_at: Some(Utc::now()),
                })
                .returning(UserRow::as_returning())
                .get_result(conn)
                .optional()?;
            row.map(UserRow::into_user)
                .ok_or(DomainError::NotFound("User"))
        })
    }

    fn set_reset_token(&self, email: &str, token: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::update(users::table.filter(users::email.eq(email.to_lowercase())))
            .set((
                users::reset_token.eq(Some(token)),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(row.map(UserRow::into_user))
    }

    fn reset_password(&self, token: &str, password_hash: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(users::table.filter(users::reset_token.eq(token)))
            .set((
                users::password_hash.eq(password_hash),
                users::reset_token.eq(None::<String>),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn revoke_token(
        &self,
        jti: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(revoked_tokens::table)
            .values(&NewRevokedTokenRow {
                jti: jti.to_string(),
                user_id,
                expires_at,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)?;
        Ok(())
    }

    fn is_token_revoked(&self, jti: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(diesel::select(diesel::dsl::exists(
            revoked_tokens::table.filter(revoked_tokens::jti.eq(jti)),
        ))
        .get_result(&mut conn)?)
    }
}
