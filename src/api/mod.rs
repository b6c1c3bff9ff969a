pub mod client;
pub mod models;

use std::future::Future;

use crate::error::ApiError;
use models::Message;

/// The messaging endpoints the chat views consume.
///
/// `ApiClient` is the production implementation; anything else that can
/// answer these three calls (a stub server, an in-memory fake) can drive the
/// views as well.
pub trait MessageApi: Send + Sync + 'static {
    /// Most recent message per counterpart.
    fn inbox(&self) -> impl Future<Output = Result<Vec<Message>, ApiError>> + Send;

    /// Full ordered history with `counterpart`. Never a delta.
    fn conversation(&self, counterpart: &str) -> impl Future<Output = Result<Vec<Message>, ApiError>> + Send;

    /// `content` may be empty.
    fn send_message(&self, to: &str, content: &str) -> impl Future<Output = Result<Message, ApiError>> + Send;
}
