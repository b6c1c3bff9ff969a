mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use cobuild_client::chat::{ConversationView, SendOutcome};
use cobuild_client::error::{ApiError, SendOrigin, ViewError};

use common::{Call, FakeApi, message, user};

const PERIOD: Duration = Duration::from_secs(5);

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn api_with_ana() -> (Arc<FakeApi>, Vec<cobuild_client::api::models::Message>) {
    let me = user("1", "me");
    let ana = user("2", "ana");
    let history = vec![message("m1", &ana, &me, "hello", 0)];
    let api = FakeApi::new(me).with_user(ana);
    api.seed("ana", history.clone());
    (Arc::new(api), history)
}

#[tokio::test(start_paused = true)]
async fn send_then_resync_shows_server_assigned_message() {
    let (api, _) = api_with_ana();
    let view = ConversationView::mount(api.clone(), Some("ana".into()), PERIOD);
    settle().await;

    let composer = view.composer();
    composer.set_draft("  hello there ");
    assert!(composer.can_send());

    let outcome = composer.submit().await.unwrap();
    let SendOutcome::Sent(sent) = outcome else {
        panic!("expected the draft to be sent");
    };
    assert_eq!(sent.id, "srv-1");
    assert_eq!(sent.content, "hello there");

    let state = view.snapshot();
    let last = state.messages.last().unwrap();
    assert_eq!(last.id, "srv-1");
    assert_eq!(last.timestamp, sent.timestamp);
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.draft, "");
    assert!(!state.sending);
    assert_eq!(state.error, None);

    let calls: Vec<Call> = api.calls().into_iter().map(|(_, c)| c).collect();
    assert_eq!(
        &calls[1..],
        &[
            Call::Send { to: "ana".into(), content: "hello there".into() },
            Call::Conversation("ana".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_send_keeps_the_draft_and_the_list() {
    let (api, history) = api_with_ana();
    let view = ConversationView::mount(api.clone(), Some("ana".into()), PERIOD);
    settle().await;
    api.fail_sends(Some(ApiError::Forbidden));

    let composer = view.composer();
    composer.set_draft("are you free tomorrow?");
    let err = composer.submit().await.unwrap_err();

    assert_eq!(err, ViewError::send(SendOrigin::Composer, ApiError::Forbidden));
    let state = view.snapshot();
    assert_eq!(state.draft, "are you free tomorrow?");
    assert_eq!(state.messages, history);
    assert_eq!(state.error, Some(err));
    assert!(!state.sending);
    assert_eq!(api.fetch_count(), 1, "no resync after a failed send");

    // retry works once the server accepts again
    api.fail_sends(None);
    assert!(matches!(composer.submit().await, Ok(SendOutcome::Sent(_))));
    assert_eq!(composer.draft(), "");
}

#[tokio::test(start_paused = true)]
async fn blank_drafts_are_never_submitted() {
    let (api, _) = api_with_ana();
    let view = ConversationView::mount(api.clone(), Some("ana".into()), PERIOD);
    settle().await;

    let composer = view.composer();
    for draft in ["", "   ", "\n\t"] {
        composer.set_draft(draft);
        assert!(!composer.can_send());
        assert_eq!(composer.submit().await, Ok(SendOutcome::Blocked));
    }

    let detached = ConversationView::mount(api.clone(), None, PERIOD);
    let composer = detached.composer();
    composer.set_draft("hello?");
    assert!(!composer.can_send());
    assert_eq!(composer.submit().await, Ok(SendOutcome::Blocked));

    assert!(!api.calls().iter().any(|(_, c)| matches!(c, Call::Send { .. })));
}

#[tokio::test(start_paused = true)]
async fn view_is_busy_until_the_resync_completes() {
    let (api, _) = api_with_ana();
    let view = ConversationView::mount(api.clone(), Some("ana".into()), PERIOD);
    settle().await;

    api.set_fetch_delay(Duration::from_secs(2));
    let composer = view.composer();
    composer.set_draft("on my way");

    let (outcome, busy_midway) = tokio::join!(composer.submit(), async {
        sleep(Duration::from_secs(1)).await;
        let s = view.snapshot();
        (s.sending, s.draft.clone())
    });

    assert!(matches!(outcome, Ok(SendOutcome::Sent(_))));
    assert_eq!(busy_midway, (true, "on my way".to_string()));
    assert!(!view.snapshot().sending);
    assert!(!composer.can_send());
}

#[tokio::test(start_paused = true)]
async fn resync_failure_after_a_successful_send_keeps_the_draft() {
    let (api, history) = api_with_ana();
    let view = ConversationView::mount(api.clone(), Some("ana".into()), PERIOD);
    settle().await;

    api.script(Duration::ZERO, Err(ApiError::Status(503)));
    let composer = view.composer();
    composer.set_draft("ping");
    let outcome = composer.submit().await.unwrap();
    let SendOutcome::Unconfirmed(sent) = outcome else {
        panic!("expected the send to be reported as unconfirmed, got {outcome:?}");
    };
    assert_eq!(sent.content, "ping");

    let state = view.snapshot();
    assert_eq!(state.draft, "ping");
    assert!(!state.sending);
    assert_eq!(state.messages, history);
    let err = state.error.unwrap();
    assert_eq!(err, ViewError::send(SendOrigin::Composer, ApiError::Status(503)));
    assert_eq!(err.to_string(), "Failed to send message");
    assert!(composer.can_send());
}

#[tokio::test(start_paused = true)]
async fn concurrent_submits_send_the_draft_once() {
    let (api, _) = api_with_ana();
    let view = ConversationView::mount(api.clone(), Some("ana".into()), PERIOD);
    settle().await;

    api.set_fetch_delay(Duration::from_secs(1));
    let first = view.composer();
    let second = view.composer();
    first.set_draft("one delivery, please");

    let (a, b) = tokio::join!(first.submit(), second.submit());
    let outcomes = [a.unwrap(), b.unwrap()];
    assert_eq!(outcomes.iter().filter(|o| matches!(o, SendOutcome::Sent(_))).count(), 1);
    assert_eq!(outcomes.iter().filter(|o| **o == SendOutcome::Blocked).count(), 1);

    let sends = api.calls().iter().filter(|(_, c)| matches!(c, Call::Send { .. })).count();
    assert_eq!(sends, 1);
}
