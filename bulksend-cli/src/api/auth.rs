//! Credentials for CMDB writes

use reqwest::RequestBuilder;

/// How bulk writes authenticate against the CMDB
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OpenID Connect access token sent as `Authorization: Bearer`
    Bearer { token: String },
    /// CouchDB user/password sent as HTTP basic auth
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Attach the credentials to a request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer { token } => request.bearer_auth(token),
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bearer { .. } => "bearer token",
            Self::Basic { .. } => "user/password",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}
