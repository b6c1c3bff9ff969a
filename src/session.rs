//! Explicit authentication state container.
//!
//! Built once at startup, initialised with [`Session::init`] before any
//! protected view is shown, and handed to whatever needs identity or role
//! information. State changes are published on a `watch` channel.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::sync::watch;

use crate::api::client::ApiClient;
use crate::api::models::{RegisterRequest, User};
use crate::app::AppConfig;
use crate::error::ApiError;
use crate::routes::{Route, dashboard_route};

#[derive(Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Set when the session forces navigation, e.g. after a 401.
    pub redirect: Option<Route>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            token: None,
            is_authenticated: false,
            is_loading: true,
            error: None,
            redirect: None,
        }
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("is_authenticated", &self.is_authenticated)
            .field("is_loading", &self.is_loading)
            .field("error", &self.error)
            .field("redirect", &self.redirect)
            .finish()
    }
}

/// Where the session token is kept between runs.
#[derive(Clone)]
pub struct TokenStore {
    path: Option<PathBuf>,
    config: Arc<Mutex<AppConfig>>,
}

impl TokenStore {
    /// Nothing is written to disk.
    pub fn in_memory(token: Option<String>) -> Self {
        let config = AppConfig { token, ..AppConfig::default() };
        Self { path: None, config: Arc::new(Mutex::new(config)) }
    }

    /// Writes the config file at `path` (or the default location) on change.
    pub fn persistent(config: AppConfig, path: Option<PathBuf>) -> Self {
        Self { path: path.or_else(AppConfig::toml_path), config: Arc::new(Mutex::new(config)) }
    }

    pub fn token(&self) -> Option<String> {
        self.config.lock().unwrap_or_else(|e| e.into_inner()).token.clone()
    }

    pub fn store(&self, token: Option<&str>) {
        let snapshot = {
            let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
            config.token = token.map(str::to_string);
            config.clone()
        };
        if let Some(path) = &self.path {
            if let Err(e) = snapshot.save_to(path) {
                warn!("Could not persist session token: {}", e);
            }
        }
    }
}

pub struct Session {
    client: Arc<ApiClient>,
    store: TokenStore,
    state: Arc<watch::Sender<AuthState>>,
    initialised: AtomicBool,
}

impl Session {
    pub fn new(client: Arc<ApiClient>, store: TokenStore) -> Self {
        let token = store.token();
        client.set_token(token.clone());
        let (tx, _) = watch::channel(AuthState { token, ..AuthState::default() });
        let state = Arc::new(tx);

        {
            let state = state.clone();
            let store = store.clone();
            client.on_unauthorized(move || {
                store.store(None);
                state.send_modify(|s| {
                    if s.is_authenticated {
                        info!("Session invalidated by the server");
                    }
                    s.user = None;
                    s.token = None;
                    s.is_authenticated = false;
                    s.redirect = Some(Route::Login);
                });
            });
        }

        Self { client, store, state, initialised: AtomicBool::new(false) }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        let state = self.state.borrow();
        state.user.clone().filter(|_| state.is_authenticated)
    }

    /// Validates the stored token. Runs once; later calls return the
    /// current state untouched.
    pub async fn init(&self) -> AuthState {
        if self.initialised.swap(true, Ordering::SeqCst) {
            return self.snapshot();
        }

        if self.store.token().is_none() {
            self.state.send_modify(|s| {
                s.is_loading = false;
                s.is_authenticated = false;
            });
            return self.snapshot();
        }

        match self.client.validate_token().await {
            Ok(info) => {
                info!("Session restored for {}", info.user.username);
                self.state.send_modify(|s| {
                    s.user = Some(info.user);
                    s.is_authenticated = true;
                    s.error = None;
                    s.redirect = None;
                });
            }
            Err(e) => {
                warn!("Stored session is no longer valid: {}", e);
                self.client.set_token(None);
                self.store.store(None);
                self.state.send_modify(|s| {
                    s.user = None;
                    s.token = None;
                    s.is_authenticated = false;
                    s.error = Some("Session expired".to_string());
                });
            }
        }
        self.state.send_modify(|s| s.is_loading = false);
        self.snapshot()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let token = self.client.login(username, password).await?;
        match self.client.me().await {
            Ok(user) => {
                self.set_auth(token, user.clone());
                Ok(user)
            }
            Err(e) => {
                self.client.set_token(None);
                Err(e)
            }
        }
    }

    pub async fn register(&self, data: &RegisterRequest) -> Result<(), ApiError> {
        self.client.register(data).await
    }

    pub fn set_auth(&self, token: String, user: User) {
        info!("Signed in as {}", user.username);
        self.client.set_token(Some(token.clone()));
        self.store.store(Some(&token));
        let landing = dashboard_route(Some(&user));
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.token = Some(token);
            s.is_authenticated = true;
            s.is_loading = false;
            s.error = None;
            s.redirect = Some(landing);
        });
    }

    pub fn logout(&self) {
        info!("Signed out");
        self.client.set_token(None);
        self.store.store(None);
        self.state.send_modify(|s| {
            s.user = None;
            s.token = None;
            s.is_authenticated = false;
            s.redirect = Some(Route::Login);
        });
    }

    /// Hands a pending forced navigation to the host, once.
    pub fn take_redirect(&self) -> Option<Route> {
        let mut taken = None;
        self.state.send_if_modified(|s| {
            taken = s.redirect.take();
            taken.is_some()
        });
        taken
    }
}
