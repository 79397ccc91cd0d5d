use std::{fmt, time::Duration};

use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, de::IgnoredAny, Serialize};
use shared::{
    domain::{Session, TransferRequest},
    error::ErrorBody,
    protocol::{
        BalanceResponse, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
        SendResponse,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ClientSettings, ConfigError};

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    Success(T),
    /// The server (or local coercion) rejected the input; the message is user facing.
    ClientError(String),
    /// No session, or the server refused the bearer token. Carries the
    /// server's message when the refusal had one.
    AuthError(Option<String>),
    NetworkError,
}

impl<T> RequestOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        match self {
            Self::Success(value) => RequestOutcome::Success(f(value)),
            Self::ClientError(message) => RequestOutcome::ClientError(message),
            Self::AuthError(message) => RequestOutcome::AuthError(message),
            Self::NetworkError => RequestOutcome::NetworkError,
        }
    }

    /// Banner text for the recoverable failures; `None` for success and auth errors.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::ClientError(message) => Some(message.as_str()),
            Self::NetworkError => Some(NETWORK_ERROR_MESSAGE),
            Self::Success(_) | Self::AuthError(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Balance,
    Send,
    Logout,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Balance => "/balance",
            Self::Send => "/send",
            Self::Logout => "/logout",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::Balance => Method::GET,
            Self::Login | Self::Register | Self::Send | Self::Logout => Method::POST,
        }
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Balance | Self::Send | Self::Logout)
    }

    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Login => "Login failed",
            Self::Register => "Registration failed",
            Self::Balance => "Failed to fetch balance",
            Self::Send => "Transfer failed",
            Self::Logout => "Logout failed",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

#[derive(Debug, Error)]
pub enum GatewayInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct ApiGateway {
    http: Client,
    base: String,
}

impl ApiGateway {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, GatewayInitError> {
        Ok(Self::new(settings.api_base()?, settings.request_timeout())?)
    }

    pub fn url_for(&self, route: Route) -> String {
        format!("{}{}", self.base, route.path())
    }

    /// Issues one request. The bearer token is attached only for routes that
    /// require auth; those short-circuit to `AuthError` without a session.
    pub async fn call<T: DeserializeOwned>(
        &self,
        route: Route,
        body: Option<serde_json::Value>,
        session: Option<&Session>,
    ) -> RequestOutcome<T> {
        let bearer = if route.requires_auth() {
            let Some(session) = session else {
                debug!("api: {route} skipped, no session");
                return RequestOutcome::AuthError(None);
            };
            Some(session.token.as_str())
        } else {
            None
        };

        let mut request = self
            .http
            .request(route.method(), self.url_for(route))
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("api: {route} transport failure: {err}");
                return RequestOutcome::NetworkError;
            }
        };
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("api: {route} body read failure status={status}: {err}");
                return RequestOutcome::NetworkError;
            }
        };
        debug!("api: {route} status={status} bytes={}", bytes.len());
        classify_response(route, status, &bytes)
    }

    pub async fn login(&self, email: &str, password: &str) -> RequestOutcome<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.call_with(Route::Login, &body, None).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> RequestOutcome<RegisterResponse> {
        let body = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.call_with(Route::Register, &body, None).await
    }

    pub async fn balance(&self, session: Option<&Session>) -> RequestOutcome<BalanceResponse> {
        self.call(Route::Balance, None, session).await
    }

    /// Coerces the raw transfer fields before anything touches the wire.
    pub async fn send_money(
        &self,
        raw_recipient: &str,
        raw_amount: &str,
        session: Option<&Session>,
    ) -> RequestOutcome<SendResponse> {
        if session.is_none() {
            return RequestOutcome::AuthError(None);
        }
        let transfer = match TransferRequest::parse(raw_recipient, raw_amount) {
            Ok(transfer) => transfer,
            Err(err) => {
                info!("api: transfer rejected locally: {err}");
                return RequestOutcome::ClientError(err.to_string());
            }
        };
        self.call_with(Route::Send, &transfer, session).await
    }

    pub async fn logout(&self, session: Option<&Session>) -> RequestOutcome<()> {
        self.call::<IgnoredAny>(Route::Logout, None, session)
            .await
            .map(|_| ())
    }

    async fn call_with<B: Serialize, T: DeserializeOwned>(
        &self,
        route: Route,
        body: &B,
        session: Option<&Session>,
    ) -> RequestOutcome<T> {
        match serde_json::to_value(body) {
            Ok(value) => self.call(route, Some(value), session).await,
            Err(err) => {
                warn!("api: {route} request body not serializable: {err}");
                RequestOutcome::ClientError(route.fallback_message().to_string())
            }
        }
    }
}

pub(crate) fn classify_response<T: DeserializeOwned>(
    route: Route,
    status: StatusCode,
    body: &[u8],
) -> RequestOutcome<T> {
    if status == StatusCode::UNAUTHORIZED && route.requires_auth() {
        info!("api: {route} unauthorized");
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|error_body| error_body.error)
            .filter(|message| !message.trim().is_empty());
        return RequestOutcome::AuthError(message);
    }

    if status.is_success() {
        // An empty success body carries no fields; let optional-only shapes accept it.
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            body
        };
        return match serde_json::from_slice::<T>(body) {
            Ok(parsed) => RequestOutcome::Success(parsed),
            Err(err) => {
                warn!("api: {route} malformed success body status={status}: {err}");
                RequestOutcome::NetworkError
            }
        };
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(error_body) => {
            let message = error_body
                .error
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| route.fallback_message().to_string());
            info!("api: {route} rejected status={status}");
            RequestOutcome::ClientError(message)
        }
        Err(err) => {
            warn!("api: {route} malformed error body status={status}: {err}");
            RequestOutcome::NetworkError
        }
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
