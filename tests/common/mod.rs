#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::time::{Instant, sleep};

use cobuild_client::api::MessageApi;
use cobuild_client::api::models::{Message, User};
use cobuild_client::error::ApiError;

pub const BASE_SECS: i64 = 1_700_000_000;

pub fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.org"),
        roles: Vec::new(),
        profile_picture_url: None,
        competences: None,
    }
}

pub fn message(id: &str, from: &User, to: &User, content: &str, secs: i64) -> Message {
    Message {
        id: id.to_string(),
        sender: from.clone(),
        receiver: to.clone(),
        content: content.to_string(),
        timestamp: Utc.timestamp_opt(BASE_SECS + secs, 0).unwrap(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Inbox,
    Conversation(String),
    Send { to: String, content: String },
}

/// One scripted answer for the next conversation fetch.
pub struct Reply {
    pub delay: Duration,
    pub result: Result<Vec<Message>, ApiError>,
}

struct Inner {
    conversations: HashMap<String, Vec<Message>>,
    users: HashMap<String, User>,
    inbox: Result<Vec<Message>, ApiError>,
    scripted: VecDeque<Reply>,
    fetch_delay: Duration,
    send_failure: Option<ApiError>,
    calls: Vec<(Instant, Call)>,
    next_id: u64,
}

/// In-memory stand-in for the messaging endpoints, with scripted latency
/// and failures. Times are tokio instants so paused-clock tests line up.
pub struct FakeApi {
    me: User,
    inner: Mutex<Inner>,
}

impl FakeApi {
    pub fn new(me: User) -> Self {
        Self {
            me,
            inner: Mutex::new(Inner {
                conversations: HashMap::new(),
                users: HashMap::new(),
                inbox: Ok(Vec::new()),
                scripted: VecDeque::new(),
                fetch_delay: Duration::ZERO,
                send_failure: None,
                calls: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub fn with_user(self, user: User) -> Self {
        self.inner.lock().unwrap().users.insert(user.username.clone(), user);
        self
    }

    pub fn seed(&self, counterpart: &str, messages: Vec<Message>) {
        self.inner.lock().unwrap().conversations.insert(counterpart.to_string(), messages);
    }

    pub fn set_inbox(&self, inbox: Result<Vec<Message>, ApiError>) {
        self.inner.lock().unwrap().inbox = inbox;
    }

    pub fn script(&self, delay: Duration, result: Result<Vec<Message>, ApiError>) {
        self.inner.lock().unwrap().scripted.push_back(Reply { delay, result });
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().fetch_delay = delay;
    }

    pub fn fail_sends(&self, error: Option<ApiError>) {
        self.inner.lock().unwrap().send_failure = error;
    }

    pub fn calls(&self) -> Vec<(Instant, Call)> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls().iter().filter(|(_, c)| matches!(c, Call::Conversation(_))).count()
    }

    pub fn fetches_for(&self, counterpart: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(_, c)| *c == Call::Conversation(counterpart.to_string()))
            .count()
    }

    pub fn last_call_at(&self) -> Option<Instant> {
        self.calls().last().map(|(at, _)| *at)
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push((Instant::now(), call));
    }
}

impl MessageApi for FakeApi {
    async fn inbox(&self) -> Result<Vec<Message>, ApiError> {
        self.record(Call::Inbox);
        self.inner.lock().unwrap().inbox.clone()
    }

    async fn conversation(&self, counterpart: &str) -> Result<Vec<Message>, ApiError> {
        self.record(Call::Conversation(counterpart.to_string()));
        let (delay, scripted) = {
            let mut inner = self.inner.lock().unwrap();
            match inner.scripted.pop_front() {
                Some(reply) => (reply.delay, Some(reply.result)),
                None => (inner.fetch_delay, None),
            }
        };
        if !delay.is_zero() {
            sleep(delay).await;
        }
        match scripted {
            Some(result) => result,
            None => Ok(self
                .inner
                .lock()
                .unwrap()
                .conversations
                .get(counterpart)
                .cloned()
                .unwrap_or_default()),
        }
    }

    async fn send_message(&self, to: &str, content: &str) -> Result<Message, ApiError> {
        self.record(Call::Send { to: to.to_string(), content: content.to_string() });
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.send_failure.clone() {
            return Err(err);
        }
        let receiver = inner.users.get(to).cloned().ok_or(ApiError::NotFound)?;
        let id = inner.next_id;
        inner.next_id += 1;
        let msg = message(&format!("srv-{id}"), &self.me, &receiver, content, 1_000 + id as i64);
        inner.conversations.entry(to.to_string()).or_default().push(msg.clone());
        Ok(msg)
    }
}
