use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::MessageApi;
use crate::api::models::{Message, User};
use crate::chat::composer;
use crate::error::{FetchTarget, SendOrigin, ViewError};
use crate::routes::Route;

/// One row of the inbox: a counterpart and the latest message exchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxEntry {
    pub counterpart: User,
    pub last_message: Message,
    pub sent_by_me: bool,
}

impl InboxEntry {
    pub fn preview(&self) -> String {
        if self.sent_by_me {
            format!("You: {}", self.last_message.content)
        } else {
            self.last_message.content.clone()
        }
    }

    pub fn route(&self) -> Route {
        Route::Conversation(self.counterpart.username.clone())
    }
}

/// Collapses the inbox payload to one entry per counterpart, keeping the
/// newest message. Rows stay in the order counterparts first appear.
pub fn derive_entries(messages: &[Message], me: &str) -> Vec<InboxEntry> {
    let mut entries: Vec<InboxEntry> = Vec::new();
    for message in messages {
        let counterpart = message.counterpart(me);
        match entries.iter().position(|e| e.counterpart.id == counterpart.id) {
            Some(i) => {
                let entry = &mut entries[i];
                if message.timestamp > entry.last_message.timestamp {
                    entry.last_message = message.clone();
                    entry.sent_by_me = message.is_from(me);
                }
            }
            None => entries.push(InboxEntry {
                counterpart: counterpart.clone(),
                last_message: message.clone(),
                sent_by_me: message.is_from(me),
            }),
        }
    }
    entries
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxState {
    pub loading: bool,
    pub entries: Vec<InboxEntry>,
    pub error: Option<ViewError>,
    /// Transient notification, e.g. a failed "start conversation".
    pub notice: Option<ViewError>,
}

impl Default for InboxState {
    fn default() -> Self {
        Self { loading: true, entries: Vec::new(), error: None, notice: None }
    }
}

impl InboxState {
    pub fn is_empty(&self) -> bool {
        !self.loading && self.error.is_none() && self.entries.is_empty()
    }
}

/// Conversation list. Fetched once per mount; never polled.
pub struct InboxView<A: MessageApi> {
    api: Arc<A>,
    me: String,
    state: Arc<watch::Sender<InboxState>>,
}

impl<A: MessageApi> InboxView<A> {
    pub fn new(api: Arc<A>, me: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(InboxState::default());
        Self { api, me: me.into(), state: Arc::new(tx) }
    }

    /// Builds the view and starts its single fetch in the background.
    ///
    /// # Panics
    ///
    /// Spawns onto the current tokio runtime, so it panics when called
    /// outside one. Use [`InboxView::new`] and [`InboxView::load`] to drive
    /// the fetch from elsewhere.
    pub fn mount(api: Arc<A>, me: impl Into<String>) -> (Self, JoinHandle<()>) {
        let view = Self::new(api, me);
        let api = view.api.clone();
        let state = view.state.clone();
        let me = view.me.clone();
        let task = tokio::spawn(async move { load_into(api.as_ref(), &state, &me).await });
        (view, task)
    }

    pub async fn load(&self) {
        load_into(self.api.as_ref(), &self.state, &self.me).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<InboxState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> InboxState {
        self.state.borrow().clone()
    }

    pub fn dismiss_notice(&self) {
        self.state.send_if_modified(|s| s.notice.take().is_some());
    }

    /// Opens a conversation with `target` by sending it an empty message.
    /// Returns where to navigate, or `None` when the target is blank.
    pub async fn start_conversation(&self, target: &str) -> Result<Option<Route>, ViewError> {
        let target = target.trim();
        if target.is_empty() {
            return Ok(None);
        }
        match composer::send(self.api.as_ref(), target, "").await {
            Ok(_) => {
                info!("Started conversation with {}", target);
                Ok(Some(Route::Conversation(target.to_string())))
            }
            Err(e) => {
                warn!("Could not start conversation with {}: {}", target, e);
                let err = ViewError::send(SendOrigin::NewConversation, e);
                self.state.send_modify(|s| s.notice = Some(err.clone()));
                Err(err)
            }
        }
    }
}

async fn load_into<A: MessageApi>(api: &A, state: &watch::Sender<InboxState>, me: &str) {
    let result = api.inbox().await;
    state.send_modify(|s| {
        s.loading = false;
        match result {
            Ok(messages) => s.entries = derive_entries(&messages, me),
            Err(e) => {
                warn!("Fetching inbox failed: {}", e);
                s.error = Some(ViewError::fetch(FetchTarget::Inbox, e));
            }
        }
    });
}
