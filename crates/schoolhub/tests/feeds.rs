//! Schedule, news, password reset and sign-out.

mod common;

use std::time::Duration;

use chrono::NaiveDate;
use schoolhub::{ErrorKind, NoticeKind, SessionEvent};
use schoolhub_protocol::{Endpoint, NewsFeed};
use schoolhub_transport::mock::{Scripted, ScriptedTransport};

use common::{anonymous, body_json, signed_in};

fn first_of_september() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
}

// =========================================================================
// Schedule
// =========================================================================

#[tokio::test]
async fn test_schedule_sends_date_query_and_decodes_lessons() {
    let transport = ScriptedTransport::new();
    transport.push(
        &Endpoint::schedule(first_of_september()),
        Scripted::json(
            200,
            r#"[{"title":"Algebra","start_time":"08:30","stop_time":"09:15","classrooms":["204"]},
                {"start_time":"09:25","stop_time":"10:10"}]"#,
        ),
    );
    let client = signed_in(&transport);

    let lessons = client.schedule(first_of_september()).await.unwrap();

    assert_eq!(lessons.len(), 2);
    assert_eq!(lessons[0].title.as_deref(), Some("Algebra"));
    assert_eq!(lessons[1].title, None);
    let request = transport.requests().pop().unwrap();
    assert_eq!(request.query, vec![("date", "2025-09-01".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_non_array_body_is_malformed_with_expiring_notice() {
    let transport = ScriptedTransport::new();
    transport.push(
        &Endpoint::schedule(first_of_september()),
        Scripted::json(200, r#"{"lessons":[]}"#),
    );
    let client = signed_in(&transport);

    let err = client.schedule(first_of_september()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    let notices = client.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
    assert!(notices[0].message.starts_with("Failed to load schedule"));

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(client.notices().len(), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.notices().is_empty());
}

#[tokio::test]
async fn test_dismiss_notice_removes_it() {
    let transport = ScriptedTransport::new();
    transport.push(&Endpoint::schedule(first_of_september()), Scripted::status(500));
    let client = signed_in(&transport);
    client.schedule(first_of_september()).await.unwrap_err();
    let id = client.notices()[0].id;

    assert!(client.dismiss_notice(id));
    assert!(!client.dismiss_notice(id));
    assert!(client.notices().is_empty());
}

// =========================================================================
// News
// =========================================================================

#[tokio::test]
async fn test_news_requests_feed_path() {
    let transport = ScriptedTransport::new();
    transport.push(
        &Endpoint::news(NewsFeed::Olympiads),
        Scripted::json(
            200,
            r#"[{"title":"Regional olympiad","description":"Results are in","date":"2025-03-01"}]"#,
        ),
    );
    let client = signed_in(&transport);

    let items = client.news(NewsFeed::Olympiads).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].published_on(), NaiveDate::from_ymd_opt(2025, 3, 1));
    assert_eq!(transport.requests()[0].path, "/news/olympiads");
}

#[tokio::test]
async fn test_news_without_session_is_not_authenticated() {
    let transport = ScriptedTransport::new();
    let client = anonymous(&transport);

    let err = client.news(NewsFeed::Events).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    assert!(transport.requests().is_empty());
}

// =========================================================================
// Password reset
// =========================================================================

#[tokio::test]
async fn test_reset_password_works_without_session() {
    let transport = ScriptedTransport::new();
    transport.push(&Endpoint::forgot_password(), Scripted::json(200, "{}"));
    let client = anonymous(&transport);

    client.reset_password(" anna ", "new-secret").await.unwrap();

    let request = transport.requests().pop().unwrap();
    assert!(request.bearer.is_none());
    assert_eq!(
        body_json(&request),
        serde_json::json!({ "identifier": "anna", "new_password": "new-secret" })
    );
    assert_eq!(client.notices()[0].kind, NoticeKind::Success);
}

#[tokio::test]
async fn test_reset_password_blank_fields_are_rejected() {
    let transport = ScriptedTransport::new();
    let client = anonymous(&transport);

    let err = client.reset_password("  ", "new-secret").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(transport.requests().is_empty());
}

// =========================================================================
// Sign-out
// =========================================================================

#[tokio::test]
async fn test_sign_out_emits_signed_out_and_blocks_calls() {
    let transport = ScriptedTransport::new();
    let client = signed_in(&transport);
    let mut events = client.session().subscribe();
    assert_eq!(*events.borrow_and_update(), SessionEvent::SignedIn);

    client.sign_out().unwrap();

    assert!(events.has_changed().unwrap());
    assert_eq!(*events.borrow_and_update(), SessionEvent::SignedOut);
    let err = client.schedule(first_of_september()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    assert!(transport.requests().is_empty());
}
