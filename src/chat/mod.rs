pub mod composer;
pub mod conversation;
pub mod display;
pub mod inbox;

pub use composer::{Composer, SendOutcome};
pub use conversation::{ConversationState, ConversationView, PollGuard};
pub use inbox::{InboxEntry, InboxState, InboxView};
