use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{HeaderMap, Method, Uri, header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::request::FORM_CONTENT_TYPE;
use crate::response::{preflight_response, usage_response};
use crate::{AuthMode, Grant, GrantRequest, Rejection, TokenForm, UpstreamRequest};

use super::{RouteMode, TOKEN_PATH, TokenProxy};

pub(super) async fn dispatch(State(proxy): State<Arc<TokenProxy>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();
    let is_token = path == TOKEN_PATH;

    match proxy.config.route_mode {
        RouteMode::Single => {
            if parts.method == Method::OPTIONS {
                preflight_response()
            } else if parts.method == Method::POST {
                if is_token {
                    token(&proxy, &parts, body).await
                } else {
                    Rejection::NotFound.into_response()
                }
            } else {
                usage(&proxy, &parts.uri, &parts.headers)
            }
        }
        RouteMode::Strict => {
            if is_token && parts.method == Method::OPTIONS {
                preflight_response()
            } else if is_token && parts.method == Method::POST {
                token(&proxy, &parts, body).await
            } else if path == "/" && parts.method == Method::GET {
                usage(&proxy, &parts.uri, &parts.headers)
            } else {
                Rejection::NotFound.into_response()
            }
        }
    }
}

fn usage(proxy: &TokenProxy, uri: &Uri, headers: &HeaderMap) -> Response {
    let origin = match &proxy.config.public_url {
        Some(public_url) => public_url.clone(),
        None => request_origin(uri, headers),
    };
    usage_response(&proxy.config.service_name, &origin)
}

fn request_origin(uri: &Uri, headers: &HeaderMap) -> String {
    if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
        return format!("{scheme}://{authority}");
    }
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

async fn token(proxy: &TokenProxy, parts: &Parts, body: Body) -> Response {
    match handle_token(proxy, parts, body).await {
        Ok(response) => response,
        Err(rejection) => {
            tracing::debug!(
                status = rejection.status().as_u16(),
                reason = %rejection,
                "rejected token request"
            );
            rejection.into_response()
        }
    }
}

/// Validates in a fixed order and stops at the first failure. Upstream errors are
/// turned into responses here so only local rejections reach the caller as `Err`.
async fn handle_token(
    proxy: &TokenProxy,
    parts: &Parts,
    body: Body,
) -> Result<Response, Rejection> {
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    if content_type != Some(FORM_CONTENT_TYPE) {
        return Err(Rejection::UnsupportedMediaType);
    }

    let bytes = body::to_bytes(body, proxy.config.max_body_bytes)
        .await
        .map_err(|_| Rejection::UnreadableBody)?;
    let form = TokenForm::parse(&bytes);

    let grant_type = form.require("grant_type")?;
    let client_id = form.require("client_id")?;

    let token_url = proxy
        .registry
        .resolve_token_url(client_id)
        .await
        .ok_or_else(|| Rejection::UnknownTokenUrl(client_id.to_string()))?;
    let client_secret = proxy
        .registry
        .resolve_secret(client_id)
        .ok_or_else(|| Rejection::MissingSecret(client_id.to_string()))?;

    let grant = Grant::from_form(grant_type, &form)?;
    let auth_mode = if proxy.config.allow_basic {
        AuthMode::from_query(parts.uri.query())
    } else {
        AuthMode::Body
    };

    let request = GrantRequest {
        client_id: client_id.to_string(),
        grant,
    };
    let upstream = match UpstreamRequest::build(
        &token_url,
        &client_secret,
        auth_mode,
        &request,
        &proxy.config.user_agent,
    ) {
        Ok(upstream) => upstream,
        Err(err) => return Ok(err.into_response()),
    };

    tracing::info!(
        client_id,
        grant_type = %request.grant.grant_type(),
        auth_mode = auth_mode.as_str(),
        "forwarding token request"
    );

    let response = match proxy.upstream.forward(upstream).await {
        Ok(response) => response,
        Err(err) => return Ok(err.into_response()),
    };

    tracing::info!(
        client_id,
        status = response.status().as_u16(),
        "relayed upstream token response"
    );
    Ok(response)
}
