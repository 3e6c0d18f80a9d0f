//! Identity provider: registration, password login and bearer tokens
//!
//! Passwords are hashed with Argon2id. Tokens are HS256 JWTs carrying the
//! user ID as `sub` and a `type` claim so a refresh token can never be used
//! as an access token (and vice versa).

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHasher};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::User;

/// Environment variable holding the token signing secret
pub const JWT_SECRET_ENV: &str = "TALLY_JWT_SECRET";

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

const ACCESS_TOKEN_MINUTES: i64 = 30;
const REFRESH_TOKEN_DAYS: i64 = 7;

/// Which of the two token flavours a JWT is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Tokens returned on login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Authentication seam used by the HTTP layer and CLI
pub trait IdentityProvider: Send + Sync {
    /// Create a user with a freshly hashed password
    fn register(&self, email: &str, password: &str) -> Result<User>;

    /// Check credentials and return the user ID
    fn authenticate(&self, email: &str, password: &str) -> Result<i64>;

    /// Issue an access/refresh token pair for a user
    fn issue_tokens(&self, user_id: i64) -> Result<TokenPair>;

    /// Verify a token of the expected kind and return its user ID
    fn validate(&self, token: &str, kind: TokenKind) -> Result<i64>;
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored PHC hash string
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::InvalidData(format!("invalid email: {}", email))),
    }
}

/// Identity backed by the local users table
#[derive(Clone)]
pub struct LocalIdentity {
    db: Database,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl LocalIdentity {
    /// Create with an explicit signing secret
    pub fn new(db: Database, secret: &[u8]) -> Self {
        Self {
            db,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Create with the secret from `TALLY_JWT_SECRET`
    pub fn from_env(db: Database) -> Result<Self> {
        let secret = std::env::var(JWT_SECRET_ENV).map_err(|_| {
            Error::Auth(format!(
                "Token signing requires {} to be set",
                JWT_SECRET_ENV
            ))
        })?;
        if secret.len() < 32 {
            return Err(Error::Auth(format!(
                "{} must be at least 32 bytes",
                JWT_SECRET_ENV
            )));
        }
        Ok(Self::new(db, secret.as_bytes()))
    }

    fn issue(&self, user_id: i64, kind: TokenKind, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Auth(format!("Failed to sign token: {}", e)))
    }
}

impl IdentityProvider for LocalIdentity {
    fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidData(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let hash = hash_password(password)?;
        self.db.create_user(email, &hash)
    }

    fn authenticate(&self, email: &str, password: &str) -> Result<i64> {
        match self.db.get_password_hash(email)? {
            Some((id, stored)) if verify_password(password, &stored) => Ok(id),
            _ => Err(Error::Auth("Invalid credentials".to_string())),
        }
    }

    fn issue_tokens(&self, user_id: i64) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(
                user_id,
                TokenKind::Access,
                Duration::minutes(ACCESS_TOKEN_MINUTES),
            )?,
            refresh_token: self.issue(
                user_id,
                TokenKind::Refresh,
                Duration::days(REFRESH_TOKEN_DAYS),
            )?,
            token_type: "bearer".to_string(),
        })
    }

    fn validate(&self, token: &str, kind: TokenKind) -> Result<i64> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| Error::Auth(format!("Invalid token: {}", e)))?;

        if data.claims.kind != kind {
            return Err(Error::Auth("Wrong token type".to_string()));
        }
        let user_id: i64 = data
            .claims
            .sub
            .parse()
            .map_err(|_| Error::Auth("Invalid token subject".to_string()))?;

        // Tokens outlive deleted users
        if self.db.get_user(user_id)?.is_none() {
            return Err(Error::Auth("Unknown user".to_string()));
        }
        Ok(user_id)
    }
}
