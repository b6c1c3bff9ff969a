//! Client for the CoBuild collaboration platform's messaging API.
//!
//! The interesting part lives in [`chat`]: a conversation view that polls the
//! server on a fixed period and replaces its list wholesale, a composer that
//! resyncs after every send, and a one-shot inbox. [`session`] and [`routes`]
//! provide identity and role-based navigation for whatever host renders them.

pub mod api;
pub mod app;
pub mod chat;
pub mod error;
pub mod routes;
pub mod session;
pub mod utils;
