//! Full stack over real HTTP: reqwest transport, file-backed session.

use httpmock::prelude::*;
use schoolhub::{ErrorKind, FileTokenStorage, SchoolHubClientBuilder};
use schoolhub_protocol::{ClubId, Credentials, SessionToken};
use serde_json::json;
use url::Url;

fn club(id: u64, members: u32, joined: bool) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Robotics",
        "members_count": members,
        "joined": joined,
        "administration": 17
    })
}

#[tokio::test]
async fn test_login_then_join_carries_bearer_and_persists_token() {
    let server = MockServer::start_async().await;
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/auth")
            .json_body(json!({ "identifier": "anna", "password": "secret" }));
        then.status(200).json_body(json!({ "token": "tok-e2e" }));
    });
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/clubs/list")
            .header("authorization", "Bearer tok-e2e");
        then.status(200).json_body(json!([club(5, 2, false)]));
    });
    let join = server.mock(|when, then| {
        when.method(POST)
            .path("/clubs/join")
            .header("authorization", "Bearer tok-e2e")
            .json_body(json!({ "clubId": 5 }));
        then.status(200).json_body(json!({}));
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let client = SchoolHubClientBuilder::new()
        .base_url(Url::parse(&server.base_url()).unwrap())
        .build_with_storage(FileTokenStorage::new(&path))
        .unwrap();

    client
        .credential_login()
        .submit(Credentials::new("anna", "secret"))
        .await
        .unwrap();
    let clubs = client.clubs();
    clubs.refresh().await.unwrap();
    let joined = clubs.join(ClubId(5)).await.unwrap();

    login.assert();
    list.assert();
    join.assert();
    assert_eq!(joined.members_count, 3);

    // A second client over the same file picks the session up.
    let restarted = SchoolHubClientBuilder::new()
        .base_url(Url::parse(&server.base_url()).unwrap())
        .build_with_storage(FileTokenStorage::new(&path))
        .unwrap();
    assert_eq!(
        restarted.session().get().unwrap(),
        Some(SessionToken::new("tok-e2e"))
    );
}

#[tokio::test]
async fn test_unauthorized_over_http_surfaces_server_message() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/settings/info");
        then.status(401)
            .json_body(json!({ "message": "Session expired" }));
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, r#"{"token":"stale"}"#).unwrap();
    let client = SchoolHubClientBuilder::new()
        .base_url(Url::parse(&server.base_url()).unwrap())
        .build_with_storage(FileTokenStorage::new(&path))
        .unwrap();

    let err = client.profile().load().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(
        err.kind(),
        ErrorKind::ServerRejected {
            status: 401,
            message: Some("Session expired".into())
        }
    );
    assert!(client.session().is_signed_in().unwrap());
}
