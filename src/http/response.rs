//! Response finalization.
//!
//! # Responsibilities
//! - Normalize the backend status before it reaches the client
//! - Apply the response header policy (CORS, nosniff)
//! - Emit a body with a length matching what is actually sent
//!
//! # Design Decisions
//! - Bodies are fully buffered by this point, so content-length is exact
//! - `304` is only kept when there is genuinely nothing to send

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::rewrite::FinalResponse;
use crate::security::headers::{apply_response_policy, strip_response_headers};

/// `304` with a body becomes `200`; anything outside `200..=599` is `500`.
pub fn normalize_status(status: StatusCode, body_is_empty: bool) -> StatusCode {
    if status == StatusCode::NOT_MODIFIED {
        return if body_is_empty {
            StatusCode::NOT_MODIFIED
        } else {
            StatusCode::OK
        };
    }
    if (200..=599).contains(&status.as_u16()) {
        status
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Build the client response from a rewritten (or passed-through) backend answer.
pub fn finalize(response: FinalResponse) -> Response {
    let FinalResponse {
        status,
        mut headers,
        body,
        ..
    } = response;

    let status = normalize_status(status, body.is_empty());

    strip_response_headers(&mut headers);
    apply_response_policy(&mut headers);
    if status != StatusCode::NOT_MODIFIED {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}
