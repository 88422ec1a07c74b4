//! JWT issue / verify for admin and staff accounts

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::models::AdminRole;

/// JWT claims for admin/staff sessions
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin user ID
    pub sub: String,
    pub username: String,
    /// `ADMIN` or `STAFF`
    pub role: AdminRole,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated admin/staff identity extracted from JWT
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub user_id: i64,
    pub username: String,
    pub role: AdminRole,
}

impl AdminIdentity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl TryFrom<AdminClaims> for AdminIdentity {
    type Error = std::num::ParseIntError;

    fn try_from(claims: AdminClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.sub.parse()?,
            username: claims.username,
            role: claims.role,
        })
    }
}

/// One venue day plus setup
pub const JWT_EXPIRY_HOURS: i64 = 12;

pub fn create_token(
    user_id: i64,
    username: &str,
    role: AdminRole,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = AdminClaims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<AdminClaims, jsonwebtoken::errors::Error> {
    jsonwebtoken::decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
