use super::*;
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&format!("{}/api", server.uri())).expect("client should build")
}

#[tokio::test]
async fn login_posts_form_encoded_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=s3cret%21"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let token = client.login("alice", "s3cret!").await.expect("login succeeds");
    assert_eq!(token.access_token, "tok-1");
    assert_eq!(token.token_type.as_deref(), Some("bearer"));
}

#[tokio::test]
async fn stored_token_is_sent_as_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .and(header("authorization", "Bearer tok-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "65f0c0ffee",
                "user_id": "u1",
                "title": "Trip planning",
                "memory_enabled": false,
                "created_at": "2024-03-12T09:15:00.123456",
                "updated_at": null
            },
            {"id": "65f0beef", "created_at": "2024-03-11T08:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await.with_token(Some("tok-42".to_string()));
    let sessions = client.list_sessions().await.expect("sessions load");

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "65f0c0ffee");
    assert_eq!(sessions[0].title, "Trip planning");
    assert!(!sessions[0].memory_enabled);
    assert_eq!(
        sessions[0].created_at.map(|ts| ts.to_rfc3339()),
        Some("2024-03-12T09:15:00.123456+00:00".to_string())
    );
    assert_eq!(sessions[1].title, DEFAULT_SESSION_TITLE);
    assert!(sessions[1].memory_enabled);
}

#[tokio::test]
async fn requests_without_token_carry_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await.with_token(Some("stale".to_string()));
    client.set_token(None);
    let err = client.list_sessions().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Not authenticated");
}

#[tokio::test]
async fn error_detail_from_server_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/register"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Username or email already registered"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .register(&RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "pw".into(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.to_string(), "Username or email already registered");
}

#[tokio::test]
async fn generic_fallback_is_used_without_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .send_chat(&ChatRequest::new("hello", None))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to send message");
}

#[tokio::test]
async fn chat_request_carries_session_memory_flag_and_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "message": "hi there",
            "session_id": "s-1",
            "memory_enabled": false,
            "metadata": {"model": "x-ai/grok-3-mini-beta"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hello!",
            "session_id": "s-1",
            "tokens_used": 17
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = ChatRequest::new("hi there", Some("s-1".into()))
        .with_memory(false)
        .with_model(Some("x-ai/grok-3-mini-beta"));
    let reply = client.send_chat(&request).await.expect("chat succeeds");

    assert_eq!(
        reply,
        ChatResponse {
            message: "Hello!".into(),
            session_id: "s-1".into(),
            tokens_used: 17,
        }
    );
}

#[tokio::test]
async fn session_routes_use_encoded_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/session/abc/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "m1", "session_id": "abc", "role": "user", "content": "hi", "tokens": 0, "metadata": {}, "created_at": "2024-01-01T00:00:00"},
            {"_id": "m2", "session_id": "abc", "role": "assistant", "content": "hello", "tokens": 12, "metadata": {"model": "m"}, "created_at": "2024-01-01T00:00:01"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/session/a%2Fb"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Session deleted successfully"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/session/abc/title"))
        .and(body_json(json!({"title": "Renamed"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Session title updated successfully"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let messages = client.session_messages("abc").await.expect("messages load");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, ROLE_ASSISTANT);
    assert_eq!(messages[1].tokens, 12);

    let ack = client.delete_session("a/b").await.expect("delete succeeds");
    assert_eq!(ack.message, "Session deleted successfully");

    client
        .rename_session("abc", "Renamed")
        .await
        .expect("rename succeeds");
}

#[tokio::test]
async fn preferences_are_normalized_to_string_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/memory/preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "preferences": {
                "likes": ["i love hiking", "i enjoy tea"],
                "topics": [],
                "level": 3,
                "mood": "curious",
                "nothing": null
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let prefs = client.preferences().await.expect("preferences load");

    assert_eq!(prefs["likes"], vec!["i love hiking", "i enjoy tea"]);
    assert!(prefs["topics"].is_empty());
    assert_eq!(prefs["level"], vec!["3"]);
    assert_eq!(prefs["mood"], vec!["curious"]);
    assert!(prefs["nothing"].is_empty());
}

#[tokio::test]
async fn memory_endpoints_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/memory/recent"))
        .and(query_param("limit", "5"))
        .and(query_param("memory_type", "preference"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "memories": [{"id": "e1", "content": "likes: tea", "type": "preference", "metadata": {}, "created_at": "2024-01-01T00:00:00"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/memory/search"))
        .and(body_json(json!({"query": "tea", "limit": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": "e1", "content": "likes: tea", "type": "preference", "metadata": {}, "similarity": 0.75, "distance": 0.5},
                {"id": "e2", "content": "hello", "type": "conversation", "metadata": {}, "recent": true}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/memory/store"))
        .and(body_json(json!({"content": "I prefer metric units", "type": "general", "metadata": {}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "e3", "message": "Memory stored successfully"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/memory/consolidate"))
        .and(body_json(json!({"days": 7})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Memories older than 7 days consolidated"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let recent = client
        .recent_memories(5, Some("preference"))
        .await
        .expect("recent loads");
    assert_eq!(recent[0].kind, "preference");

    let found = client
        .search_memories(&MemorySearchRequest {
            query: "tea".into(),
            limit: 3,
            memory_type: None,
        })
        .await
        .expect("search works");
    assert_eq!(found[0].similarity, Some(0.75));
    assert!(found[1].recent);

    let stored = client
        .store_memory(&StoreMemoryRequest {
            content: "I prefer metric units".into(),
            kind: "general".into(),
            metadata: Default::default(),
        })
        .await
        .expect("store works");
    assert_eq!(stored.id, "e3");

    let ack = client.consolidate_memories(7).await.expect("consolidate works");
    assert!(ack.message.contains("7 days"));
}

#[tokio::test]
async fn health_probe_targets_server_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert_eq!(client.health().await.expect("healthy").status, "healthy");
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ApiClient::new("not a url").err().expect("should fail");
    assert!(matches!(err, ApiError::InvalidUrl(_)));
}
