//! Request routing and the JSON envelope.
//!
//! Every JSON response has the shape `{success, message?, data?, result?, error?}`. Listing puts
//! the records in `data`; creating puts the stored record in `result`; failures carry a short
//! `message` and the full error chain in `error`.

use crate::error::{Error, ErrorType, IntoResult};
use crate::model::RecordId;
use crate::server::AppState;
use crate::store::{Collection, Expenses, MutableCollection, Savings};
use anyhow::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{Method, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::str::Utf8Error;
use tracing::{error, warn};

/// Routes are served under each of these prefixes.
const PREFIXES: [&str; 2] = ["/.netlify/functions/api", "/api"];

const RUNNING: &str = "Expense Tracker API is running";

/// A response before it is turned into a hyper `Response`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Reply {
    pub(crate) status: StatusCode,
    pub(crate) body: Body,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Body {
    Json(Vec<u8>),
    Text(&'static str),
    Empty,
}

impl Reply {
    fn json(status: StatusCode, value: &impl Serialize) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => Self {
                status,
                body: Body::Json(bytes),
            },
            Err(e) => {
                error!("Unable to serialize a response: {e}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: Body::Json(
                        br#"{"success":false,"message":"Failed to encode the response"}"#.to_vec(),
                    ),
                }
            }
        }
    }

    fn text(text: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            body: Body::Text(text),
        }
    }

    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: Body::Empty,
        }
    }

    pub(crate) fn message(status: StatusCode, success: bool, message: &str) -> Self {
        Self::json(
            status,
            &Envelope::<()> {
                success,
                message: Some(message.to_string()),
                ..Envelope::default()
            },
        )
    }

    /// Renders `err`. Not-found errors get a `<label> not found` message; everything else gets
    /// `message`, which names the operation that failed.
    fn failure<C: Collection>(err: &Error, message: &str) -> Self {
        let message = if err.is_not_found() {
            format!("{} not found", C::LABEL)
        } else {
            message.to_string()
        };
        Self::json(
            status_for(err.error_type()),
            &Envelope::<()> {
                success: false,
                message: Some(message),
                error: Some(err.to_string()),
                ..Envelope::default()
            },
        )
    }

    /// Converts to a hyper response with permissive CORS headers.
    pub(crate) fn into_response(self) -> Response<Full<Bytes>> {
        let (content_type, bytes) = match self.body {
            Body::Json(bytes) => (Some("application/json"), Bytes::from(bytes)),
            Body::Text(text) => (
                Some("text/plain; charset=utf-8"),
                Bytes::from_static(text.as_bytes()),
            ),
            Body::Empty => (None, Bytes::new()),
        };
        let mut response = Response::new(Full::new(bytes));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );
        response
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> Default for Envelope<T> {
    fn default() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
            result: None,
            error: None,
        }
    }
}

pub(crate) fn status_for(error_type: ErrorType) -> StatusCode {
    match error_type {
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::Request => StatusCode::BAD_REQUEST,
        ErrorType::Conflict => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Returns the part of `path` after one of the route prefixes.
fn strip_prefix(path: &str) -> Option<&str> {
    PREFIXES.iter().find_map(|prefix| {
        path.strip_prefix(prefix)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Splits `rest` into non-empty path segments and percent-decodes each one, so an id such as
/// `my goal` arrives as `my%20goal` and an encoded `/` stays inside its segment.
fn decode_segments(rest: &str) -> std::result::Result<Vec<Cow<'_, str>>, Utf8Error> {
    rest.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8())
        .collect()
}

/// Dispatches one request.
pub(crate) async fn route(state: &AppState, method: &Method, path: &str, body: &[u8]) -> Reply {
    let Some(rest) = strip_prefix(path) else {
        return Reply::message(StatusCode::NOT_FOUND, false, "Not found");
    };
    if method == Method::OPTIONS {
        return Reply::empty(StatusCode::NO_CONTENT);
    }
    let decoded = match decode_segments(rest) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Rejecting {path}: {e}");
            return Reply::message(StatusCode::BAD_REQUEST, false, "Invalid path");
        }
    };
    let segments: Vec<&str> = decoded.iter().map(|s| s.as_ref()).collect();
    match (method, segments.as_slice()) {
        (&Method::GET, []) => Reply::text(RUNNING),
        (&Method::GET, ["expenses"]) => list::<Expenses>(state, "Failed to fetch expenses").await,
        (&Method::POST, ["expenses"]) => {
            create::<Expenses>(
                state,
                body,
                "Expense added successfully",
                "Failed to add expense",
            )
            .await
        }
        (&Method::DELETE, ["expenses", id]) => {
            delete::<Expenses>(
                state,
                id,
                "Expense deleted successfully",
                "Failed to delete expense",
            )
            .await
        }
        (&Method::GET, ["savings"]) => list::<Savings>(state, "Failed to fetch savings").await,
        (&Method::POST, ["savings"]) => {
            create::<Savings>(
                state,
                body,
                "Saving goal added successfully",
                "Failed to add saving goal",
            )
            .await
        }
        (&Method::PUT, ["savings", id]) => {
            update::<Savings>(
                state,
                id,
                body,
                "Saving goal updated successfully",
                "Failed to update saving goal",
            )
            .await
        }
        (&Method::DELETE, ["savings", id]) => {
            delete::<Savings>(
                state,
                id,
                "Saving goal deleted successfully",
                "Failed to delete saving goal",
            )
            .await
        }
        (_, [] | ["expenses"] | ["expenses", _] | ["savings"] | ["savings", _]) => {
            Reply::message(StatusCode::METHOD_NOT_ALLOWED, false, "Method not allowed")
        }
        _ => Reply::message(StatusCode::NOT_FOUND, false, "Not found"),
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(body)
        .context("Unable to parse the request body")
        .pub_result(ErrorType::Request)
}

async fn list<C: Collection>(state: &AppState, failure: &str) -> Reply {
    match state.store().list::<C>().await {
        Ok(records) => Reply::json(
            StatusCode::OK,
            &Envelope {
                data: Some(records),
                ..Envelope::default()
            },
        ),
        Err(e) => Reply::failure::<C>(&e, failure),
    }
}

async fn create<C>(state: &AppState, body: &[u8], success: &str, failure: &str) -> Reply
where
    C: Collection,
    C::Draft: DeserializeOwned,
{
    let draft = match parse_body::<C::Draft>(body) {
        Ok(draft) => draft,
        Err(e) => return Reply::failure::<C>(&e, failure),
    };
    match state.store().create::<C>(draft).await {
        Ok(record) => Reply::json(
            StatusCode::OK,
            &Envelope {
                message: Some(success.to_string()),
                result: Some(record),
                ..Envelope::default()
            },
        ),
        Err(e) => Reply::failure::<C>(&e, failure),
    }
}

async fn update<C>(state: &AppState, id: &str, body: &[u8], success: &str, failure: &str) -> Reply
where
    C: MutableCollection,
    C::Patch: DeserializeOwned,
{
    let patch = match parse_body::<C::Patch>(body) {
        Ok(patch) => patch,
        Err(e) => return Reply::failure::<C>(&e, failure),
    };
    match state.store().update::<C>(&RecordId::new(id), patch).await {
        Ok(_) => Reply::message(StatusCode::OK, true, success),
        Err(e) => Reply::failure::<C>(&e, failure),
    }
}

async fn delete<C: Collection>(state: &AppState, id: &str, success: &str, failure: &str) -> Reply {
    match state.store().delete::<C>(&RecordId::new(id)).await {
        Ok(()) => Reply::message(StatusCode::OK, true, success),
        Err(e) => Reply::failure::<C>(&e, failure),
    }
}
