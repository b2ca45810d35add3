//! Identity/credential store.
//!
//! Accounts live in their own store; creating one also mirrors a profile row keyed by the
//! account id, and deleting one cascades to that profile and to the account's assignment.

use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{jwt::JwtService, password};
use crate::db::PgPool;
use crate::models::{Identity, NewIdentity, NewProfile, Role};
use crate::schema::{identities, profiles};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("an account with email {0} already exists")]
    DuplicateEmail(String),
    #[error("account not found")]
    NotFound,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("credential store failure: {0}")]
    Backend(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: Option<String>,
    /// Marks the email as confirmed at creation time.
    pub pre_verified: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub identity_id: Uuid,
    pub access_token: String,
    pub expires_in: i64,
}

#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    async fn create_account(&self, account: NewAccount) -> CredentialResult<Uuid>;

    async fn delete_account(&self, identity_id: Uuid) -> CredentialResult<()>;

    async fn account_by_token(&self, token: &str) -> CredentialResult<Uuid>;

    async fn sign_in(&self, email: &str, password: &str) -> CredentialResult<Session>;
}

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgCredentialStore {
    pool: PgPool,
    jwt: JwtService,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, jwt: JwtService) -> Self {
        Self { pool, jwt }
    }

    fn conn(&self) -> CredentialResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| CredentialError::Backend(format!("database pool error: {err}")))
    }
}

impl From<DieselError> for CredentialError {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::NotFound => CredentialError::NotFound,
            other => CredentialError::Backend(other.to_string()),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_account(&self, account: NewAccount) -> CredentialResult<Uuid> {
        let email = normalize_email(&account.email);
        let password_hash = password::hash_password(&account.password)
            .map_err(|err| CredentialError::Backend(err.to_string()))?;
        let id = Uuid::new_v4();
        let confirmed_at = account.pre_verified.then(|| Utc::now().naive_utc());

        let mut conn = self.conn()?;
        let result = conn.transaction(|conn| {
            diesel::insert_into(identities::table)
                .values(&NewIdentity {
                    id,
                    email: email.clone(),
                    password_hash,
                    role: account.role.as_str().to_string(),
                    email_confirmed_at: confirmed_at,
                })
                .execute(conn)?;

            diesel::insert_into(profiles::table)
                .values(&NewProfile {
                    identity_id: id,
                    email: email.clone(),
                    full_name: account.full_name.clone(),
                    role: account.role.as_str().to_string(),
                })
                .execute(conn)?;

            Ok::<_, DieselError>(())
        });

        match result {
            Ok(()) => Ok(id),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(CredentialError::DuplicateEmail(email))
            }
            Err(err) => Err(CredentialError::from(err)),
        }
    }

    async fn delete_account(&self, identity_id: Uuid) -> CredentialResult<()> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(identities::table.find(identity_id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(CredentialError::NotFound);
        }
        Ok(())
    }

    async fn account_by_token(&self, token: &str) -> CredentialResult<Uuid> {
        let claims = self
            .jwt
            .verify_token(token)
            .map_err(|_| CredentialError::InvalidToken)?;

        let mut conn = self.conn()?;
        let exists: bool = diesel::select(diesel::dsl::exists(
            identities::table.filter(identities::id.eq(claims.sub)),
        ))
        .get_result(&mut conn)?;

        if !exists {
            return Err(CredentialError::InvalidToken);
        }
        Ok(claims.sub)
    }

    async fn sign_in(&self, email: &str, password: &str) -> CredentialResult<Session> {
        let email = normalize_email(email);
        let mut conn = self.conn()?;
        let identity = identities::table
            .filter(identities::email.eq(&email))
            .first::<Identity>(&mut conn)
            .optional()?
            .ok_or(CredentialError::InvalidCredentials)?;

        let valid = password::verify_password(password, &identity.password_hash)
            .map_err(|_| CredentialError::InvalidCredentials)?;
        if !valid {
            return Err(CredentialError::InvalidCredentials);
        }

        let access_token = self
            .jwt
            .generate_token(identity.id, &identity.email, &identity.role)
            .map_err(|err| CredentialError::Backend(err.to_string()))?;

        Ok(Session {
            identity_id: identity.id,
            access_token,
            expires_in: self.jwt.expires_in_seconds(),
        })
    }
}
