use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use aware_core::model::{Profile, Role, User, UserId};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use storage::repository::{NewUserRecord, StorageError, UserRepository};
use tracing::{debug, info};

use crate::Clock;
use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Claims carried by an access token. `sub` is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl AuthClaims {
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if `sub` is not a user id.
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Input for creating an account.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile: Profile,
}

/// A freshly issued token together with the account it belongs to.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Account registration, password login and bearer-token verification.
#[derive(Clone)]
pub struct AuthService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        secret: &str,
        token_ttl: Duration,
    ) -> Self {
        Self {
            clock,
            users,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        }
    }

    /// Create a learner account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::User` for invalid input.
    /// Returns `AuthError::Storage` with `StorageError::Conflict` if the
    /// username or email is taken.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.register_with_role(registration, Role::User).await
    }

    /// Create an account with an explicit role (seeding, admin tooling).
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn register_with_role(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<User, AuthError> {
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        let probe = User::new(
            UserId::new(0),
            registration.username,
            registration.email,
            role,
            registration.profile,
            self.clock.now(),
        )?;
        let hash = hash_password(&registration.password)?;
        let user = self
            .users
            .insert_user(NewUserRecord::from_user(&probe, hash))
            .await?;
        info!(user_id = %user.id(), username = user.username(), role = role.as_str(), "registered account");
        Ok(user)
    }

    /// Check a username-or-email and password pair and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown login or a wrong
    /// password.
    pub async fn login(&self, login: &str, password: &str) -> Result<AuthSession, AuthError> {
        let Some(record) = self.users.find_credentials(login).await? else {
            debug!("login for unknown account");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &record.password_hash)? {
            debug!(user_id = %record.user.id(), "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        self.issue(&record.user)
    }

    /// Sign an HS256 token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if encoding fails and
    /// `AuthError::TokenLifetime` if the expiry cannot be represented.
    pub fn issue(&self, user: &User) -> Result<AuthSession, AuthError> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or(AuthError::TokenLifetime)?;
        let claims = AuthClaims {
            sub: user.id().to_string(),
            username: user.username().to_string(),
            role: user.role(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(AuthSession {
            token,
            expires_at,
            user: user.clone(),
        })
    }

    /// Verify signature and expiry against the service clock.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad signature, malformed token
    /// or an expired token.
    pub fn verify(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock.
        validation.validate_exp = false;
        let data = decode::<AuthClaims>(token, &self.decoding, &validation).map_err(|e| {
            debug!("rejected token: {e}");
            AuthError::InvalidToken
        })?;
        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }

    /// Whether a username or email already belongs to an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if repository access fails.
    pub async fn account_exists(&self, login: &str) -> Result<bool, AuthError> {
        Ok(self.users.find_credentials(login).await?.is_some())
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` with `StorageError::NotFound` for an
    /// unknown user.
    pub async fn current_user(&self, user_id: UserId) -> Result<User, AuthError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(user)
    }

    /// Replace the profile fields of an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the user is missing or persistence fails.
    pub async fn update_profile(&self, user_id: UserId, profile: Profile) -> Result<User, AuthError> {
        let mut user = self.current_user(user_id).await?;
        user.set_profile(profile);
        self.users.update_user(&user).await?;
        Ok(user)
    }
}

/// Argon2id hash in PHC string format.
///
/// # Errors
///
/// Returns `AuthError::Hashing` if the hasher rejects the input.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; 16];
    rand::rng().fill(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// # Errors
///
/// Returns `AuthError::Hashing` if the stored hash is not a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

/// Random signing secret for development runs without a configured one.
#[must_use]
pub fn generate_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
