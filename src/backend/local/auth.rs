/// Config-defined admin login with HS256 session tokens
use crate::{
    auth::Session,
    backend::AuthBackend,
    error::{GalleryError, GalleryResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
    jti: String,
}

pub struct LocalAuth {
    admin_email: String,
    /// Argon2 PHC string, e.g. `$argon2id$v=19$...`
    password_hash: String,
    jwt_secret: String,
    session_ttl: Duration,
    /// Signed-out tokens and their expiry, pruned on every sign-out
    revoked: RwLock<HashMap<String, i64>>,
}

impl LocalAuth {
    pub fn new(admin_email: &str, password_hash: &str, jwt_secret: &str, ttl_secs: i64) -> Self {
        Self {
            admin_email: admin_email.trim().to_lowercase(),
            password_hash: password_hash.to_string(),
            jwt_secret: jwt_secret.to_string(),
            session_ttl: Duration::seconds(ttl_secs),
            revoked: RwLock::new(HashMap::new()),
        }
    }

    fn issue_token(&self, email: &str) -> GalleryResult<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;
        let claims = Claims {
            sub: email.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| GalleryError::Jwt(e.to_string()))?;

        Ok((token, expires_at))
    }

    /// Verify signature and expiry
    fn verify_token(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| tracing::debug!("JWT verification failed: {}", e))
        .ok()
    }
}

#[async_trait]
impl AuthBackend for LocalAuth {
    async fn sign_in(&self, email: &str, password: &str) -> GalleryResult<Session> {
        let email = email.trim().to_lowercase();
        let password_ok = verify_password(password, &self.password_hash);
        if email != self.admin_email || !password_ok {
            tracing::warn!("Rejected admin login for {}", email);
            return Err(GalleryError::Authentication(
                "Invalid login credentials".to_string(),
            ));
        }

        let (access_token, expires_at) = self.issue_token(&email)?;
        Ok(Session {
            access_token,
            user_id: email.clone(),
            email: Some(email),
            expires_at: Some(expires_at),
        })
    }

    async fn sign_out(&self, session: &Session) -> GalleryResult<()> {
        let now = Utc::now().timestamp();
        let expiry = session
            .expires_at
            .map(|ts| ts.timestamp())
            .unwrap_or(now + self.session_ttl.num_seconds());

        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(session.access_token.clone(), expiry);
        Ok(())
    }

    async fn get_session(&self, access_token: &str) -> GalleryResult<Option<Session>> {
        if self.revoked.read().await.contains_key(access_token) {
            return Ok(None);
        }

        Ok(self.verify_token(access_token).map(|claims| Session {
            access_token: access_token.to_string(),
            user_id: claims.sub,
            email: Some(claims.email),
            expires_at: Utc.timestamp_opt(claims.exp, 0).single(),
        }))
    }
}

/// Hash a password into an Argon2id PHC string for `GALLERY_ADMIN_PASSWORD_HASH`
pub fn hash_password(password: &str) -> GalleryResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GalleryError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a PHC string without panicking on malformed input
pub fn is_password_hash(value: &str) -> bool {
    PasswordHash::new(value).is_ok()
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
