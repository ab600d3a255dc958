use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::error::ApiError;
use crate::database::schema::{Id, User};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes()).map_err(ApiError::internal)
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime_hours: i64,
) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.email.to_owned(), lifetime_hours);

    claims.sign_with_key(&key).map_err(ApiError::internal)
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token.verify_with_key(&key).map_err(|e| {
        log::debug!("Rejected session token: {e}");
        ApiError::Unauthorized
    })?;

    if session.is_expired() {
        log::debug!("Rejected expired session for user {}", session.user_id);
        return Err(ApiError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "user@example.com".into(),
            name: "User".into(),
            password: String::new(),
        }
    }

    #[test]
    fn token_round_trips_with_the_same_secret() {
        let token = generate_jwt_session(&user(), "secret", 1).unwrap();
        let session = verify_jwt_session(&token, "secret").unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.email, "user@example.com");
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = generate_jwt_session(&user(), "secret", 1).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, "other"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = generate_jwt_session(&user(), "secret", -1).unwrap();

        assert!(matches!(
            verify_jwt_session(&token, "secret"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(verify_jwt_session("not.a.token", "secret").is_err());
    }
}
