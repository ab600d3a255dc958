use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    schema::{NewUser, User},
};

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, QueryError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates a user from an already normalized email and hashed password
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<User, QueryError> {
    let row: User = sqlx::query_as(
        "
        INSERT INTO users (email, name, password)
        VALUES ($1, $2, $3)
        RETURNING *;
    ",
    )
    .bind(user.email)
    .bind(user.name)
    .bind(user.password)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
