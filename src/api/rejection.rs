use std::convert::Infallible;

use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection},
    reply::{self, Reply},
};

use crate::error::{Error, ErrorKind};

fn detail(message: &str, status: StatusCode) -> warp::reply::Response {
    reply::with_status(reply::json(&serde_json::json!({ "detail": message })), status)
        .into_response()
}

/// Turns every rejection into a JSON error body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(error) = err.find::<Error>() {
        if error.kind == ErrorKind::InternalServerError {
            log::error!("Request failed: {}", error.info);
        }
        return Ok(reply::with_status(reply::json(&error.body()), error.status()).into_response());
    }

    let response = if err.is_not_found() {
        detail(&ErrorKind::NotFound.default().info, StatusCode::NOT_FOUND)
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        detail(&format!("Invalid request body: {e}"), StatusCode::BAD_REQUEST)
    } else if let Some(e) = err.find::<InvalidQuery>() {
        detail(&format!("{e}"), StatusCode::BAD_REQUEST)
    } else if err.find::<PayloadTooLarge>().is_some() {
        detail("Request body is too large.", StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<LengthRequired>().is_some() {
        detail("Content-Length is required.", StatusCode::LENGTH_REQUIRED)
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail("Method not allowed.", StatusCode::METHOD_NOT_ALLOWED)
    } else {
        log::error!("Unhandled rejection: {err:?}");
        detail(
            &ErrorKind::InternalServerError.default().info,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    };

    Ok(response)
}
