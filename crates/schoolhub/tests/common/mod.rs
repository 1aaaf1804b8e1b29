//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use schoolhub::{MemoryTokenStorage, ProfileSettings, SchoolHubClient, SchoolHubClientBuilder};
use schoolhub_protocol::SessionToken;
use schoolhub_transport::ApiRequest;
use schoolhub_transport::mock::ScriptedTransport;

pub type TestClient = SchoolHubClient<ScriptedTransport, MemoryTokenStorage>;
pub type TestProfile = ProfileSettings<ScriptedTransport, MemoryTokenStorage>;

/// A client with no stored session.
pub fn anonymous(transport: &ScriptedTransport) -> TestClient {
    SchoolHubClientBuilder::new().build_with(transport.clone(), MemoryTokenStorage::new())
}

/// A client that is already signed in with `session-1`.
pub fn signed_in(transport: &ScriptedTransport) -> TestClient {
    SchoolHubClientBuilder::new().build_with(
        transport.clone(),
        MemoryTokenStorage::with_token(SessionToken::new("session-1")),
    )
}

pub fn body_json(request: &ApiRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or(b"null")).expect("request body is JSON")
}

pub fn club_json(id: u64, members: u32, joined: bool) -> String {
    serde_json::json!({
        "id": id,
        "title": format!("Club {id}"),
        "description": "After-school activity",
        "direction": "Science",
        "class_limit_min": 5,
        "class_limit_max": 11,
        "members_count": members,
        "joined": joined,
        "administration": "Ms. Petrova"
    })
    .to_string()
}

pub fn club_list_json(clubs: &[(u64, u32, bool)]) -> String {
    let items: Vec<String> = clubs
        .iter()
        .map(|(id, members, joined)| club_json(*id, *members, *joined))
        .collect();
    format!("[{}]", items.join(","))
}

pub const PROFILE_JSON: &str = r#"{
    "name": "Anna",
    "surname": "Ivanova",
    "login": "anna",
    "email": "",
    "telegram_name": "anna_tg",
    "class_number": 9,
    "class_letter": "B"
}"#;
