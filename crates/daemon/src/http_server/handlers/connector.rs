//! The `/connector` endpoint.
//!
//! Requests arrive as a query string, an url-encoded form or a multipart
//! form (uploads). Whatever the transport, the fields are flattened into
//! [`Params`] and handed to the connector on the blocking pool. Protocol
//! errors are regular 200 JSON bodies; only transport failures get a
//! non-2xx status.

use std::time::Duration;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::FormRejection;
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::{Form, Json};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::task::JoinError;
use tokio::time::timeout;

use common::prelude::{ErrorCode, FileResponse, Params, Response, UploadedFile};

use crate::ServiceState;

/// Multipart field carrying uploaded files
pub const UPLOAD_FIELD: &str = "upload[]";

pub async fn get_handler(
    State(state): State<ServiceState>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<ConnectorReply, ConnectorHandlerError> {
    dispatch(&state, query.into_iter().collect()).await
}

pub async fn post_handler(
    State(state): State<ServiceState>,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Result<ConnectorReply, ConnectorHandlerError> {
    let mut params: Params = query.into_iter().collect();
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state).await?;
        read_multipart(multipart, &mut params).await?;
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, &state).await?;
        for (key, value) in fields {
            params.insert(key, value);
        }
    }

    dispatch(&state, params).await
}

async fn read_multipart(
    mut multipart: Multipart,
    params: &mut Params,
) -> Result<(), ConnectorHandlerError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == UPLOAD_FIELD {
            let file_name = field
                .file_name()
                .map(base_name)
                .unwrap_or_default()
                .to_string();
            let content = field.bytes().await?;
            tracing::debug!(file = %file_name, size = content.len(), "received upload part");
            params.add_file(UploadedFile::new(file_name, content.to_vec()));
        } else {
            let value = field.text().await?;
            params.insert(name, value);
        }
    }

    Ok(())
}

/// Last path component of a client-supplied file name.
fn base_name(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
}

async fn dispatch(
    state: &ServiceState,
    params: Params,
) -> Result<ConnectorReply, ConnectorHandlerError> {
    let connector = state.connector().clone();
    let limit = state.request_timeout();

    // A timed out command keeps running on the blocking pool; only the
    // response is abandoned.
    let task = tokio::task::spawn_blocking(move || connector.dispatch(params));
    let response = timeout(limit, task)
        .await
        .map_err(|_| ConnectorHandlerError::Timeout(limit))??;

    Ok(ConnectorReply(response))
}

/// A connector response rendered for HTTP.
#[derive(Debug)]
pub struct ConnectorReply(pub Response);

impl IntoResponse for ConnectorReply {
    fn into_response(self) -> HttpResponse {
        match self.0 {
            Response::File(FileResponse::Download {
                name,
                mime,
                content,
            }) => {
                let content_type = HeaderValue::from_str(&mime)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, content_type),
                        (header::CONTENT_DISPOSITION, content_disposition(&name)),
                    ],
                    content,
                )
                    .into_response()
            }
            Response::File(FileResponse::Redirect { location }) => {
                match HeaderValue::from_str(&location) {
                    Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
                    Err(_) => {
                        tracing::error!(%location, "redirect target is not a valid header value");
                        Json(Response::error(vec![ErrorCode::Unknown])).into_response()
                    }
                }
            }
            Response::Ping => (
                StatusCode::OK,
                [(header::CONNECTION, HeaderValue::from_static("close"))],
            )
                .into_response(),
            response => Json(response).into_response(),
        }
    }
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// name in RFC 5987 form.
fn content_disposition(name: &str) -> HeaderValue {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        utf8_percent_encode(name, NON_ALPHANUMERIC)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorHandlerError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("multipart body rejected: {0}")]
    MultipartRejected(#[from] MultipartRejection),
    #[error("form body rejected: {0}")]
    Form(#[from] FormRejection),
    #[error("command did not finish within {0:?}")]
    Timeout(Duration),
    #[error("command task failed: {0}")]
    Join(#[from] JoinError),
}

impl IntoResponse for ConnectorHandlerError {
    fn into_response(self) -> HttpResponse {
        let (status, code) = match &self {
            ConnectorHandlerError::Multipart(e) => (e.status(), ErrorCode::ValidationFailed),
            ConnectorHandlerError::MultipartRejected(e) => {
                (e.status(), ErrorCode::ValidationFailed)
            }
            ConnectorHandlerError::Form(e) => (e.status(), ErrorCode::ValidationFailed),
            ConnectorHandlerError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, ErrorCode::Unknown),
            ConnectorHandlerError::Join(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Unknown)
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "connector request failed");
        } else {
            tracing::warn!(error = %self, "connector request rejected");
        }

        (status, Json(Response::error(vec![code]))).into_response()
    }
}
