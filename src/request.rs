use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use url::{Url, form_urlencoded};

use crate::{AuthMode, Grant, GrantRequest, ProxyError};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; CrOS x86_64 8172.45.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/51.0.2704.64 Safari/537.36";

/// A fully formed `POST` to an upstream token endpoint. Building one does no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
}

impl UpstreamRequest {
    pub fn build(
        token_url: &str,
        client_secret: &str,
        auth_mode: AuthMode,
        request: &GrantRequest,
        user_agent: &str,
    ) -> Result<Self, ProxyError> {
        let url = Url::parse(token_url)?;
        let client_id = request.client_id.as_str();

        let mut params = form_urlencoded::Serializer::new(String::new());
        params.append_pair("grant_type", request.grant.grant_type().as_str());
        match &request.grant {
            Grant::AuthorizationCode { code, redirect_uri } => {
                params.append_pair("code", code);
                params.append_pair("redirect_uri", redirect_uri);
            }
            Grant::RefreshToken { refresh_token } => {
                params.append_pair("refresh_token", refresh_token);
            }
            Grant::ClientCredentials => {}
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(USER_AGENT, header_value("User-Agent", user_agent)?);
        match auth_mode {
            AuthMode::Basic => {
                let authorization = basic_authorization(client_id, client_secret);
                headers.insert(AUTHORIZATION, header_value("Authorization", &authorization)?);
            }
            AuthMode::Body => {
                params.append_pair("client_id", client_id);
                params.append_pair("client_secret", client_secret);
            }
        }

        Ok(Self {
            url,
            headers,
            body: params.finish(),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ProxyError> {
    HeaderValue::from_str(value).map_err(|_| ProxyError::InvalidHeader {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn basic_authorization(client_id: &str, client_secret: &str) -> String {
    let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));
    format!("Basic {credentials}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant_request(grant: Grant) -> GrantRequest {
        GrantRequest {
            client_id: "my-app".to_string(),
            grant,
        }
    }

    #[test]
    fn body_mode_appends_credentials_after_grant_fields() {
        let request = grant_request(Grant::AuthorizationCode {
            code: "abc 123".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
        });
        let upstream = UpstreamRequest::build(
            "https://provider.example/oauth/token",
            "s3cret",
            AuthMode::Body,
            &request,
            DEFAULT_USER_AGENT,
        )
        .unwrap();

        assert_eq!(
            upstream.body,
            "grant_type=authorization_code&code=abc+123&redirect_uri=http%3A%2F%2Flocalhost%2Fcb&client_id=my-app&client_secret=s3cret"
        );
        assert_eq!(upstream.header("authorization"), None);
        assert_eq!(upstream.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(upstream.header("user-agent"), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn basic_mode_moves_credentials_to_header() {
        let request = grant_request(Grant::RefreshToken {
            refresh_token: "rt".to_string(),
        });
        let upstream = UpstreamRequest::build(
            "https://provider.example/oauth/token",
            "s3cret",
            AuthMode::Basic,
            &request,
            DEFAULT_USER_AGENT,
        )
        .unwrap();

        assert_eq!(upstream.body, "grant_type=refresh_token&refresh_token=rt");
        // base64("my-app:s3cret")
        assert_eq!(
            upstream.header("Authorization"),
            Some("Basic bXktYXBwOnMzY3JldA==")
        );
    }

    #[test]
    fn client_credentials_sends_only_grant_type() {
        let request = grant_request(Grant::ClientCredentials);
        let upstream = UpstreamRequest::build(
            "https://provider.example/oauth/token",
            "s3cret",
            AuthMode::Basic,
            &request,
            "custom-agent",
        )
        .unwrap();

        assert_eq!(upstream.body, "grant_type=client_credentials");
        assert_eq!(upstream.header("user-agent"), Some("custom-agent"));
    }

    #[test]
    fn rejects_user_agent_with_control_characters() {
        let request = grant_request(Grant::ClientCredentials);
        let result = UpstreamRequest::build(
            "https://provider.example/oauth/token",
            "s3cret",
            AuthMode::Body,
            &request,
            "bad\nagent",
        );
        assert!(matches!(result, Err(ProxyError::InvalidHeader { .. })));
    }

    #[test]
    fn rejects_relative_token_url() {
        let request = grant_request(Grant::ClientCredentials);
        let result = UpstreamRequest::build(
            "/oauth/token",
            "s3cret",
            AuthMode::Body,
            &request,
            DEFAULT_USER_AGENT,
        );
        assert!(matches!(result, Err(ProxyError::Url(_))));
    }
}
