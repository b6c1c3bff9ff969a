use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use log::{debug, warn};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::MessageApi;
use crate::api::models::{LoginRequest, Message, RegisterRequest, SessionInfo, User};
use crate::error::ApiError;

type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Authenticated REST client for the CoBuild API.
///
/// Attaches the bearer token to every request. A 401 from any endpoint drops
/// the held token and fires the unauthorized hook, which the session uses to
/// log out and redirect to the login route; the caller still gets an error.
pub struct ApiClient {
    http: HttpClient,
    base: Url,
    token: RwLock<Option<String>>,
    on_unauthorized: Mutex<Option<UnauthorizedHook>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = HttpClient::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base: Self::base_api(base_url)?,
            token: RwLock::new(None),
            on_unauthorized: Mutex::new(None),
        })
    }

    fn base_api(base_url: &str) -> Result<Url, ApiError> {
        let normalized = crate::utils::normalize_url(base_url);
        let url = Url::parse(normalized.trim_end_matches('/'))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{base_url} cannot hold API paths")));
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `<base>/<segments...>`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn on_unauthorized(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_unauthorized.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(hook));
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token() {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    fn unauthorized(&self) {
        warn!("API rejected the session token, clearing it");
        self.set_token(None);
        let hook = self.on_unauthorized.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    async fn dispatch(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = self.with_auth(req).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        debug!("API answered HTTP {}", status.as_u16());
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.unauthorized();
        }
        Err(ApiError::from_status(status.as_u16()))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let resp = self.dispatch(req).await?;
        resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Exchanges credentials for a token and keeps it for later requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let body = LoginRequest { username: username.to_string(), password: password.to_string() };
        let resp = self.dispatch(self.http.post(self.endpoint(&["auth", "login"])).json(&body)).await?;
        let text = resp.text().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        let token = text.trim().trim_matches('"').to_string();
        if token.is_empty() {
            return Err(ApiError::Decode("empty token in login response".into()));
        }
        self.set_token(Some(token.clone()));
        Ok(token)
    }

    pub async fn register(&self, data: &RegisterRequest) -> Result<(), ApiError> {
        self.dispatch(self.http.post(self.endpoint(&["auth", "register"])).json(data)).await?;
        Ok(())
    }

    pub async fn validate_token(&self) -> Result<SessionInfo, ApiError> {
        self.fetch_json(self.http.get(self.endpoint(&["auth", "validate"]))).await
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.fetch_json(self.http.get(self.endpoint(&["user", "me"]))).await
    }

    pub async fn inbox(&self) -> Result<Vec<Message>, ApiError> {
        self.fetch_json(self.http.get(self.endpoint(&["messages", "inbox"]))).await
    }

    pub async fn conversation(&self, username: &str) -> Result<Vec<Message>, ApiError> {
        self.fetch_json(self.http.get(self.endpoint(&["messages", "conversation", username]))).await
    }

    pub async fn send_message(&self, to: &str, content: &str) -> Result<Message, ApiError> {
        let req = self
            .http
            .post(self.endpoint(&["messages", "send"]))
            .query(&[("to", to), ("content", content)]);
        self.fetch_json(req).await
    }
}

impl MessageApi for ApiClient {
    async fn inbox(&self) -> Result<Vec<Message>, ApiError> {
        ApiClient::inbox(self).await
    }

    async fn conversation(&self, counterpart: &str) -> Result<Vec<Message>, ApiError> {
        ApiClient::conversation(self, counterpart).await
    }

    async fn send_message(&self, to: &str, content: &str) -> Result<Message, ApiError> {
        ApiClient::send_message(self, to, content).await
    }
}
