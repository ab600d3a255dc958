use crate::{
    authentication::{cryptography::verify_password, jwt::generate_jwt_session},
    config::Config,
    database::{
        error::{ApiError, FieldErrors, QueryError},
        schema::{normalize_email, NewUser, User},
        store::Store,
    },
};

/// Creates a user; the email must not already be registered.
pub async fn register_user(store: &dyn Store, user: NewUser) -> Result<User, ApiError> {
    if store.find_user_by_email(&user.email).await?.is_some() {
        return Err(FieldErrors::single("email", "user with this email already exists.").into());
    }

    match store.create_user(user).await {
        Ok(user) => {
            log::info!("Registered user {}", user.id);
            Ok(user)
        }
        Err(QueryError::Conflict(_)) => {
            Err(FieldErrors::single("email", "user with this email already exists.").into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Verifies the credentials and issues a session token.
pub async fn login_user(
    store: &dyn Store,
    config: &Config,
    email: &str,
    password: &str,
) -> Result<String, ApiError> {
    let invalid = || ApiError::BadRequest("Unable to authenticate with provided credentials.".into());

    let user = store
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;

    let authenticated = verify_password(password, &user.password).map_err(ApiError::internal)?;
    if !authenticated {
        return Err(invalid());
    }

    generate_jwt_session(&user, &config.jwt_secret, config.session_lifetime_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{authentication::jwt::verify_jwt_session, database::memory::MemoryStore};

    fn config() -> Config {
        Config::from_lookup(|key| (key == "JWT_SECRET").then(|| "secret".to_string())).unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let store = MemoryStore::default();
        let user = NewUser::new("user@example.com", "testpass123", "").unwrap();
        register_user(&store, user.clone()).await.unwrap();

        let err = register_user(&store, user).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(errors) if errors.get("email").is_some()));
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let store = MemoryStore::default();
        let user = register_user(
            &store,
            NewUser::new("user@EXAMPLE.com", "testpass123", "").unwrap(),
        )
        .await
        .unwrap();

        let token = login_user(&store, &config(), "user@example.COM", "testpass123")
            .await
            .unwrap();

        assert_eq!(verify_jwt_session(&token, "secret").unwrap().user_id, user.id);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_user() {
        let store = MemoryStore::default();
        register_user(&store, NewUser::new("user@example.com", "testpass123", "").unwrap())
            .await
            .unwrap();

        assert!(matches!(
            login_user(&store, &config(), "user@example.com", "wrong").await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            login_user(&store, &config(), "nobody@example.com", "testpass123").await,
            Err(ApiError::BadRequest(_))
        ));
    }
}
