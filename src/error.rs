use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::error_response;

/// Infrastructure faults. None of these are caused by the caller's input.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header: {name}={value}")]
    InvalidHeader { name: String, value: String },

    #[error("invalid registry file: {0}")]
    RegistryFile(#[from] serde_json::Error),

    #[error("secret prefix must not be empty")]
    EmptySecretPrefix,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "upstream token request failed");
        StatusCode::BAD_GATEWAY.into_response()
    }
}

/// A locally generated rejection. The `Display` text is sent as the response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("'{0}' not found")]
    MissingField(&'static str),

    #[error("'client_id' {0} token url not found")]
    UnknownTokenUrl(String),

    #[error("'client_id' {0} secret not found")]
    MissingSecret(String),

    #[error("'grant_type' {0} is invalid")]
    InvalidGrantType(String),

    #[error("request body could not be read")]
    UnreadableBody,

    #[error("")]
    UnsupportedMediaType,

    #[error("")]
    NotFound,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> Option<String> {
        match self {
            Self::UnsupportedMediaType | Self::NotFound => None,
            other => Some(other.to_string()),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        error_response(self.status(), self.message())
    }
}
