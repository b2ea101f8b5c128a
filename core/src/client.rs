//! Authenticated request builder and response interpreter for the show API.
//!
//! # Design
//! `RequestClient` keeps the build/execute/parse split: `build_request`
//! produces an `HttpRequest` with the current bearer token baked in, the
//! configured [`Transport`] performs the round-trip, and `check_status` plus
//! `parse_json` interpret the `HttpResponse`.
//!
//! The client is cheap to clone; clones share the transport and the
//! [`Session`], so a 401 seen through any clone logs every clone out.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{
    HttpMethod, HttpRequest, HttpResponse, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE,
};
use crate::session::{FileTokenStore, Session};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{AuthSession, Credentials, LoginEnvelope, Registration, User, UserEnvelope};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct RequestClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: Session,
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl RequestClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, session: Session) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            session,
        }
    }

    /// Client with the reqwest transport, restoring any token persisted at
    /// `config.token_file`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        let session = match config.token_file {
            Some(ref path) => Session::init(FileTokenStore::new(path)),
            None => Session::in_memory(),
        };
        Ok(Self::new(&config.base_url, Arc::new(transport), session))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request for `endpoint` (a path starting with `/`, optionally
    /// with a query string) carrying the token held right now.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        if let Some(token) = self.session.token() {
            headers.push((AUTHORIZATION.to_string(), format!("{BEARER_PREFIX}{token}")));
        }
        HttpRequest {
            method,
            url: format!("{}{endpoint}", self.base_url),
            headers,
            body,
        }
    }

    /// Send a prepared request and enforce the status contract.
    ///
    /// A 401 logs the session out before the error is returned.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let sent_token = request
            .header(AUTHORIZATION)
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .map(str::to_string);
        let method = request.method;
        let url = request.url.clone();

        debug!(%method, %url, authenticated = sent_token.is_some(), "sending request");
        let response = self.transport.send(request).await?;
        debug!(%method, %url, status = response.status, "received response");

        if response.status == 401 && self.session.invalidate(sent_token.as_deref()) {
            warn!(%url, "server rejected the session token, logged out");
        }
        check_status(response)
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<T, ApiError> {
        let response = self.execute(self.build_request(method, endpoint, body)).await?;
        parse_json(&response)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(HttpMethod::Get, endpoint, None).await
    }

    pub async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(method, endpoint, Some(encode(body)?)).await
    }

    /// Like [`request`](Self::request) for endpoints that answer with a file
    /// rather than JSON.
    pub async fn request_binary(&self, endpoint: &str) -> Result<Bytes, ApiError> {
        let response = self
            .execute(self.build_request(HttpMethod::Get, endpoint, None))
            .await?;
        Ok(response.body)
    }

    // -----------------------------------------------------------------------
    // Authentication
    // -----------------------------------------------------------------------

    /// Log in and install the returned token for every later request.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        if credentials.username.trim().is_empty() {
            return Err(ApiError::Validation("username is required".to_string()));
        }
        if credentials.password.is_empty() {
            return Err(ApiError::Validation("password is required".to_string()));
        }

        let envelope: LoginEnvelope = self
            .send_json(HttpMethod::Post, "/auth/login", credentials)
            .await?;
        let access_token = envelope
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Parse("login response carried no access_token".to_string()))?;

        self.session.establish(access_token.clone());
        debug!(epoch = self.session.epoch(), "logged in");
        Ok(AuthSession {
            access_token,
            user: envelope.user,
        })
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        for (field, value) in [
            ("username", &registration.username),
            ("email", &registration.email),
            ("password", &registration.password),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!("{field} is required")));
            }
        }
        let envelope: UserEnvelope = self
            .send_json(HttpMethod::Post, "/auth/register", registration)
            .await?;
        Ok(envelope.user)
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.get("/auth/me").await?;
        Ok(envelope.user)
    }

    /// Forget the token locally, then tell the server.
    ///
    /// The session is cleared before the notification is sent, so nothing
    /// issued meanwhile carries the old token and a login that completes
    /// during the call is left alone. A failed notification is returned
    /// after the fact.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let notification = self
            .session
            .is_authenticated()
            .then(|| self.build_request(HttpMethod::Post, "/auth/logout", None));

        self.session.teardown();

        let Some(request) = notification else {
            return Ok(());
        };
        if let Err(e) = self.execute(request).await {
            warn!(error = %e, "logout notification failed, session cleared locally");
            return Err(e);
        }
        Ok(())
    }
}

/// Serialize a request body.
pub fn encode<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Turn a non-2xx response into `ApiError::Http`, using the server's
/// `{"error": ...}` message when there is one.
pub fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    let message = serde_json::from_slice::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", response.status));
    Err(ApiError::Http {
        status: response.status,
        message,
    })
}

/// Decode a JSON body. An empty body reads as `null`.
pub fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::Parse(e.to_string()))
}
