use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, JwtSessionData};
use crate::{config::Config, database::error::ApiError, database::store::Owner};

/// Extracts the credential from `Authorization: Bearer <token>` (or `Token <token>`).
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token") {
        Some(token)
    } else {
        None
    }
}

pub fn with_session(
    config: Arc<Config>,
) -> impl Filter<Extract = (JwtSessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let config = config.clone();
        async move {
            let token = header
                .as_deref()
                .and_then(bearer_token)
                .ok_or(ApiError::Unauthorized)?;

            verify_jwt_session(token, &config.jwt_secret).map_err(Rejection::from)
        }
    })
}

/// Resolves the requesting user; rejects with 401 when no valid session is presented.
pub fn with_owner(config: Arc<Config>) -> impl Filter<Extract = (Owner,), Error = Rejection> + Clone {
    with_session(config).map(|session: JwtSessionData| Owner::from_session(&session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bearer_and_token_schemes() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("token abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
