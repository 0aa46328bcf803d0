//! OAuth 2.0 token endpoint proxy.
//!
//! Browser clients post token requests to one stable `/token` endpoint. The proxy
//! looks up the upstream token URL and client secret for the request's `client_id`,
//! rebuilds the grant exchange, and relays the upstream response with permissive
//! CORS headers. The secret never has to ship to the browser.

mod client;
mod error;
mod grant;
mod registry;
mod request;
mod response;
mod server;

pub use client::UpstreamClient;
pub use error::{ProxyError, Rejection};
pub use grant::{AuthMode, Grant, GrantRequest, GrantType, TokenForm};
pub use registry::{
    ClientRegistry, DEFAULT_SECRET_PREFIX, EnvSecretStore, HttpTokenUrls, MemorySecretStore,
    MemoryTokenUrls, SecretStore, TokenUrlRegistry,
};
pub use request::{DEFAULT_USER_AGENT, FORM_CONTENT_TYPE, UpstreamRequest};
pub use response::{error_response, preflight_response, usage_response};
pub use server::{ProxyConfig, RouteMode, TOKEN_PATH, TokenProxy};
