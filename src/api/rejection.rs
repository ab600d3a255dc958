use std::convert::Infallible;

use serde::Serialize;
use warp::{
    filters::body::BodyDeserializeError,
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, MissingHeader,
        PayloadTooLarge, UnsupportedMediaType,
    },
    reply::{self, Reply, Response},
    Rejection,
};

use crate::database::error::{ApiError, QueryError};

#[derive(Serialize)]
struct Detail<'a> {
    detail: &'a str,
}

fn detail(message: &str, code: StatusCode) -> Response {
    reply::with_status(reply::json(&Detail { detail: message }), code).into_response()
}

fn api_error(err: &ApiError) -> Response {
    match err {
        ApiError::Validation(errors) => {
            reply::with_status(reply::json(errors), StatusCode::BAD_REQUEST).into_response()
        }
        ApiError::BadRequest(message) => detail(message, StatusCode::BAD_REQUEST),
        ApiError::Unauthorized => {
            let mut response = detail(&err.to_string(), StatusCode::UNAUTHORIZED);
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
        ApiError::NotFound => detail(&err.to_string(), StatusCode::NOT_FOUND),
        ApiError::Query(QueryError::Conflict(message)) => {
            log::debug!("Write rejected by a unique constraint: {message}");
            detail(message, StatusCode::BAD_REQUEST)
        }
        ApiError::Query(e) => {
            log::error!("Query failed: {e}");
            detail("A server error occurred.", StatusCode::INTERNAL_SERVER_ERROR)
        }
        ApiError::Internal(message) => {
            log::error!("Internal error: {message}");
            detail("A server error occurred.", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Turns every rejection into a JSON response. Errors raised by handlers take
/// precedence over routing misses from the other branches of the route tree.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<ApiError>() {
        return Ok(api_error(e));
    }

    let response = if err.is_not_found() {
        detail("Not found.", StatusCode::NOT_FOUND)
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        detail(&format!("JSON parse error - {e}"), StatusCode::BAD_REQUEST)
    } else if let Some(e) = err.find::<InvalidQuery>() {
        detail(&e.to_string(), StatusCode::BAD_REQUEST)
    } else if let Some(e) = err.find::<InvalidHeader>() {
        detail(&e.to_string(), StatusCode::BAD_REQUEST)
    } else if let Some(e) = err.find::<MissingHeader>() {
        detail(&e.to_string(), StatusCode::BAD_REQUEST)
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail("Method not allowed.", StatusCode::METHOD_NOT_ALLOWED)
    } else if err.find::<PayloadTooLarge>().is_some() {
        detail("Request body is too large.", StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<UnsupportedMediaType>().is_some() {
        detail("Unsupported media type.", StatusCode::UNSUPPORTED_MEDIA_TYPE)
    } else if err.find::<LengthRequired>().is_some() {
        detail("Content-Length header is required.", StatusCode::LENGTH_REQUIRED)
    } else {
        log::error!("Unhandled rejection: {err:?}");
        detail("A server error occurred.", StatusCode::INTERNAL_SERVER_ERROR)
    };

    Ok(response)
}
