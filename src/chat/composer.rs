use std::sync::Arc;

use log::{debug, warn};

use crate::api::MessageApi;
use crate::api::models::Message;
use crate::chat::conversation::{SharedState, apply_fetch};
use crate::error::{ApiError, SendOrigin, ViewError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(Message),
    /// The server accepted the message but the refetch afterwards failed.
    /// The draft is kept and the view shows a send failure.
    Unconfirmed(Message),
    /// Blank draft, no counterpart, or a send already in progress.
    Blocked,
}

/// Posts `content` to `counterpart`. Empty content is passed through as is;
/// callers decide whether that is allowed.
pub async fn send<A: MessageApi>(api: &A, counterpart: &str, content: &str) -> Result<Message, ApiError> {
    debug!("Sending {} chars to {}", content.len(), counterpart);
    api.send_message(counterpart, content).await
}

/// Input side of a conversation view. Shares the view's state, so the draft,
/// the busy flag and the resynced list are all visible to subscribers.
pub struct Composer<A: MessageApi> {
    api: Arc<A>,
    state: SharedState,
}

impl<A: MessageApi> Composer<A> {
    pub(crate) fn new(api: Arc<A>, state: SharedState) -> Self {
        Self { api, state }
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_if_modified(|s| {
            if s.draft == text {
                return false;
            }
            s.draft = text;
            true
        });
    }

    pub fn draft(&self) -> String {
        self.state.borrow().draft.clone()
    }

    pub fn can_send(&self) -> bool {
        let s = self.state.borrow();
        s.counterpart.is_some() && !s.sending && !s.draft.trim().is_empty()
    }

    /// Sends the trimmed draft, then refetches the whole conversation so the
    /// list shows the server's id and timestamp. There is no local insert.
    ///
    /// The draft is cleared only once both steps succeed. Any failure keeps
    /// it for another try and shows "Failed to send message"; a failed
    /// refetch also leaves the list as it was.
    pub async fn submit(&self) -> Result<SendOutcome, ViewError> {
        let mut claimed = None;
        self.state.send_if_modified(|s| {
            let Some(counterpart) = s.counterpart.clone() else {
                return false;
            };
            if s.sending || s.draft.trim().is_empty() {
                return false;
            }
            s.sending = true;
            claimed = Some((s.generation, counterpart, s.draft.trim().to_string()));
            true
        });
        let Some((generation, counterpart, content)) = claimed else {
            return Ok(SendOutcome::Blocked);
        };

        let sent = match send(self.api.as_ref(), &counterpart, &content).await {
            Ok(message) => message,
            Err(e) => {
                warn!("Sending to {} failed: {}", counterpart, e);
                let err = ViewError::send(SendOrigin::Composer, e);
                self.fail(generation, err.clone());
                return Err(err);
            }
        };

        match self.api.conversation(&counterpart).await {
            Ok(messages) => {
                apply_fetch(&self.state, generation, &counterpart, Ok(messages));
                self.state.send_modify(|s| {
                    if s.generation == generation {
                        s.sending = false;
                        s.draft.clear();
                    }
                });
                Ok(SendOutcome::Sent(sent))
            }
            Err(e) => {
                warn!("Resync with {} after sending failed: {}", counterpart, e);
                self.fail(generation, ViewError::send(SendOrigin::Composer, e));
                Ok(SendOutcome::Unconfirmed(sent))
            }
        }
    }

    /// Ends a submit that did not go through, keeping the draft.
    fn fail(&self, generation: u64, error: ViewError) {
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            s.sending = false;
            s.error = Some(error);
            true
        });
    }
}
