use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use warp::reject::Reject;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    /// A unique constraint rejected the write
    #[error("{0}")]
    Conflict(String),
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::Conflict(format!("{e}"))
            }
            e => Self::Database(e),
        }
    }
}

/// Field name to validation messages, rendered as `{"field": ["message"]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("Authentication credentials were not provided or are invalid.")]
    Unauthorized,
    #[error("Not found.")]
    NotFound,
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<FieldErrors> for ApiError {
    fn from(value: FieldErrors) -> Self {
        Self::Validation(value)
    }
}

impl Reject for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_group_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("title", "first");
        errors.add("title", "second");
        errors.add("price", "bad");

        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"price": ["bad"], "title": ["first", "second"]})
        );
        assert!(errors.into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
