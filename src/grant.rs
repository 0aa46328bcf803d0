use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use crate::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = Rejection;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            "client_credentials" => Ok(Self::ClientCredentials),
            other => Err(Rejection::InvalidGrantType(other.to_string())),
        }
    }
}

/// How client credentials reach the upstream token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// `Authorization: Basic` header.
    Basic,
    /// `client_id` and `client_secret` form parameters.
    #[default]
    Body,
}

impl AuthMode {
    /// `Basic` when the query string carries a `basic` key, with or without a value.
    pub fn from_query(query: Option<&str>) -> Self {
        let basic = query
            .map(|query| form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == "basic"))
            .unwrap_or(false);
        if basic { Self::Basic } else { Self::Body }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Body => "body",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode { code: String, redirect_uri: String },
    RefreshToken { refresh_token: String },
    ClientCredentials,
}

impl Grant {
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Self::RefreshToken { .. } => GrantType::RefreshToken,
            Self::ClientCredentials => GrantType::ClientCredentials,
        }
    }

    /// Classifies `grant_type` and pulls its required fields out of the form.
    /// `redirect_uri` is checked before `code`.
    pub fn from_form(grant_type: &str, form: &TokenForm) -> Result<Self, Rejection> {
        match grant_type.parse::<GrantType>()? {
            GrantType::RefreshToken => Ok(Self::RefreshToken {
                refresh_token: form.require("refresh_token")?.to_string(),
            }),
            GrantType::AuthorizationCode => {
                let redirect_uri = form.require("redirect_uri")?.to_string();
                let code = form.require("code")?.to_string();
                Ok(Self::AuthorizationCode { code, redirect_uri })
            }
            GrantType::ClientCredentials => Ok(Self::ClientCredentials),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    pub client_id: String,
    pub grant: Grant,
}

/// Parsed `application/x-www-form-urlencoded` token request body.
#[derive(Debug, Clone, Default)]
pub struct TokenForm {
    fields: HashMap<String, String>,
}

impl TokenForm {
    /// Keeps the first occurrence of each key.
    pub fn parse(body: &[u8]) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in form_urlencoded::parse(body) {
            fields
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { fields }
    }

    /// Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn require(&self, key: &'static str) -> Result<&str, Rejection> {
        self.get(key).ok_or(Rejection::MissingField(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_keeps_first_value_and_ignores_empty() {
        let form = TokenForm::parse(b"client_id=one&client_id=two&code=&redirect_uri=http%3A%2F%2Flocalhost");
        assert_eq!(form.get("client_id"), Some("one"));
        assert_eq!(form.get("code"), None);
        assert_eq!(form.get("redirect_uri"), Some("http://localhost"));
    }

    #[test]
    fn auth_mode_reads_bare_basic_flag() {
        assert_eq!(AuthMode::from_query(Some("basic")), AuthMode::Basic);
        assert_eq!(AuthMode::from_query(Some("x=1&basic=0")), AuthMode::Basic);
        assert_eq!(AuthMode::from_query(Some("basics")), AuthMode::Body);
        assert_eq!(AuthMode::from_query(None), AuthMode::Body);
    }

    #[test]
    fn authorization_code_checks_redirect_uri_first() {
        let form = TokenForm::parse(b"grant_type=authorization_code");
        assert_eq!(
            Grant::from_form("authorization_code", &form),
            Err(Rejection::MissingField("redirect_uri"))
        );

        let form = TokenForm::parse(b"redirect_uri=http%3A%2F%2Flocalhost");
        assert_eq!(
            Grant::from_form("authorization_code", &form),
            Err(Rejection::MissingField("code"))
        );
    }

    #[test]
    fn unknown_grant_type_names_the_value() {
        let form = TokenForm::default();
        assert_eq!(
            Grant::from_form("foo", &form),
            Err(Rejection::InvalidGrantType("foo".to_string()))
        );
    }

    #[test]
    fn client_credentials_needs_no_fields() {
        let form = TokenForm::default();
        let grant = Grant::from_form("client_credentials", &form).unwrap();
        assert_eq!(grant, Grant::ClientCredentials);
        assert_eq!(grant.grant_type().as_str(), "client_credentials");
    }
}
