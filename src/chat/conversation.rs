//! Conversation view: keeps one counterpart's message history roughly fresh
//! by refetching it on a fixed period.
//!
//! Every fetch replaces the displayed list wholesale. Fetches are not
//! serialized: a tick does not wait for the previous one, and whichever
//! response is applied last wins, regardless of issue order. Every switch
//! of counterpart starts a new generation, and responses requested under an
//! older generation are dropped, even when the view has come back to the
//! same counterpart since.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::api::MessageApi;
use crate::api::models::Message;
use crate::chat::composer::Composer;
use crate::error::{ApiError, FetchTarget, ViewError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub counterpart: Option<String>,
    pub messages: Vec<Message>,
    /// True until the first fetch for the current counterpart settles.
    pub loading: bool,
    /// True between a composer submit and the end of its resync.
    pub sending: bool,
    pub draft: String,
    pub error: Option<ViewError>,
    /// Bumped on every counterpart switch.
    pub generation: u64,
}

impl ConversationState {
    fn new(counterpart: Option<String>, generation: u64) -> Self {
        Self {
            counterpart,
            messages: Vec::new(),
            loading: true,
            sending: false,
            draft: String::new(),
            error: None,
            generation,
        }
    }

    pub fn is_for(&self, counterpart: &str) -> bool {
        self.counterpart.as_deref() == Some(counterpart)
    }
}

pub(crate) type SharedState = Arc<watch::Sender<ConversationState>>;

/// Writes a fetch result into the view, unless it was requested under an
/// older generation. Success replaces the list; failure keeps it.
pub(crate) fn apply_fetch(
    state: &SharedState,
    generation: u64,
    counterpart: &str,
    result: Result<Vec<Message>, ApiError>,
) {
    state.send_if_modified(|s| {
        if s.generation != generation {
            debug!("Dropping response for {} after switching conversations", counterpart);
            return false;
        }
        s.loading = false;
        match result {
            Ok(messages) => s.messages = messages,
            Err(e) => {
                warn!("Fetching conversation with {} failed: {}", counterpart, e);
                s.error = Some(ViewError::fetch(FetchTarget::Conversation, e));
            }
        }
        true
    });
}

pub(crate) fn spawn_fetch<A: MessageApi>(
    api: Arc<A>,
    state: SharedState,
    generation: u64,
    counterpart: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = api.conversation(&counterpart).await;
        apply_fetch(&state, generation, &counterpart, result);
    })
}

/// Owns the periodic poll task. Dropping it stops the schedule; fetches the
/// schedule already started keep running to completion.
pub struct PollGuard {
    task: JoinHandle<()>,
}

impl PollGuard {
    fn start<A: MessageApi>(
        api: Arc<A>,
        state: SharedState,
        generation: u64,
        counterpart: String,
        period: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                debug!("Poll tick for {}", counterpart);
                spawn_fetch(api.clone(), state.clone(), generation, counterpart.clone());
            }
        });
        Self { task }
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct ConversationView<A: MessageApi> {
    api: Arc<A>,
    state: SharedState,
    period: Duration,
    poll: Option<PollGuard>,
}

impl<A: MessageApi> ConversationView<A> {
    /// Fetches immediately, then every `period` until the view is dropped.
    /// Without a counterpart nothing is fetched and the view stays loading.
    ///
    /// # Panics
    ///
    /// Spawns onto the current tokio runtime, so it panics when called
    /// outside one.
    pub fn mount(api: Arc<A>, counterpart: Option<String>, period: Duration) -> Self {
        let period = if period.is_zero() { DEFAULT_POLL_INTERVAL } else { period };
        let counterpart = counterpart
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let (tx, _) = watch::channel(ConversationState::new(counterpart.clone(), 0));
        let mut view = Self { api, state: Arc::new(tx), period, poll: None };
        if let Some(c) = counterpart {
            view.start(0, c);
        }
        view
    }

    fn start(&mut self, generation: u64, counterpart: String) {
        info!("Opening conversation with {}", counterpart);
        spawn_fetch(self.api.clone(), self.state.clone(), generation, counterpart.clone());
        self.poll = Some(PollGuard::start(
            self.api.clone(),
            self.state.clone(),
            generation,
            counterpart,
            self.period,
        ));
    }

    /// Points the view at another counterpart. The old schedule stops; its
    /// in-flight responses are discarded when they arrive. Must run inside a
    /// tokio runtime, like [`ConversationView::mount`].
    pub fn switch_counterpart(&mut self, counterpart: String) {
        let next = counterpart.trim().to_string();
        if self.state.borrow().is_for(&next) {
            return;
        }
        self.poll = None;
        let target = Some(next).filter(|c| !c.is_empty());
        let mut generation = 0;
        self.state.send_modify(|s| {
            generation = s.generation + 1;
            *s = ConversationState::new(target.clone(), generation);
        });
        if let Some(c) = target {
            self.start(generation, c);
        }
    }

    /// Out-of-cycle fetch, not coordinated with the schedule.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        let (generation, counterpart) = {
            let s = self.state.borrow();
            (s.generation, s.counterpart.clone()?)
        };
        Some(spawn_fetch(self.api.clone(), self.state.clone(), generation, counterpart))
    }

    pub fn composer(&self) -> Composer<A> {
        Composer::new(self.api.clone(), self.state.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(PollGuard::is_active)
    }

    pub fn dismiss_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Stops the schedule. Requests already in flight still resolve and
    /// write into the (now unobserved) state.
    pub fn unmount(mut self) {
        if let Some(c) = self.state.borrow().counterpart.as_deref() {
            info!("Closing conversation with {}", c);
        }
        self.poll = None;
    }
}
