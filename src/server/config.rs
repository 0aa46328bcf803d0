use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::request::DEFAULT_USER_AGENT;

pub(crate) const DEFAULT_SERVICE_NAME: &str = "oauth-token-proxy";
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Which paths and methods the proxy answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteMode {
    /// Preflight on every path, `POST /token` handled, other `POST`s are 404 and
    /// every other method gets the usage text.
    #[default]
    Single,
    /// Only `OPTIONS /token`, `POST /token` and `GET /`. Everything else is 404.
    Strict,
}

impl FromStr for RouteMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "single" => Ok(Self::Single),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown route mode '{other}' (expected single or strict)")),
        }
    }
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub route_mode: RouteMode,
    /// Honour the `?basic` query flag. When off, credentials always go in the body.
    pub allow_basic: bool,
    pub user_agent: String,
    pub upstream_timeout: Option<Duration>,
    /// Origin shown in the usage text. Falls back to the request's host.
    pub public_url: Option<String>,
    pub max_body_bytes: usize,
    pub service_name: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            route_mode: RouteMode::default(),
            allow_basic: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            upstream_timeout: None,
            public_url: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route_mode(mut self, route_mode: RouteMode) -> Self {
        self.route_mode = route_mode;
        self
    }

    pub fn with_basic_auth(mut self, allow_basic: bool) -> Self {
        self.allow_basic = allow_basic;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = Some(timeout);
        self
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(normalize_origin(public_url.into()));
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}

fn normalize_origin(origin: String) -> String {
    match origin.strip_suffix('/') {
        Some(trimmed) => trimmed.to_string(),
        None => origin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_drops_trailing_slash() {
        let config = ProxyConfig::new().with_public_url("https://tokens.example.com/");
        assert_eq!(config.public_url.as_deref(), Some("https://tokens.example.com"));
    }

    #[test]
    fn route_mode_parses_names() {
        assert_eq!("strict".parse::<RouteMode>(), Ok(RouteMode::Strict));
        assert_eq!("single".parse::<RouteMode>(), Ok(RouteMode::Single));
        assert!("both".parse::<RouteMode>().is_err());
    }
}
