//! E2E tests for user profiles and the follow graph

mod common;

use common::{ALICE_KEY, BOB_KEY, TestServer, assert_error};
use serde_json::{Value, json};

async fn get_user(server: &TestServer, api_key: &str, path: &str) -> Value {
    let response = server
        .client
        .get(server.api(path))
        .header("api-key", api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"], true);
    body["user"].clone()
}

#[tokio::test]
async fn test_me_has_empty_edges() {
    let server = TestServer::new().await;

    let user = get_user(&server, ALICE_KEY, "/users/me").await;
    assert_eq!(
        user,
        json!({
            "id": server.alice.id,
            "name": "alice",
            "followers": [],
            "followings": [],
        })
    );
}

#[tokio::test]
async fn test_follow_updates_both_profiles() {
    let server = TestServer::new().await;
    let follow_url = server.api(&format!("/users/{}/follow", server.bob.id));

    let response = server
        .client
        .post(&follow_url)
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"result": true}));

    let alice = get_user(&server, ALICE_KEY, "/users/me").await;
    assert_eq!(
        alice["followings"],
        json!([{"id": server.bob.id, "name": "bob"}])
    );

    let bob = get_user(&server, ALICE_KEY, &format!("/users/{}", server.bob.id)).await;
    assert_eq!(
        bob["followers"],
        json!([{"id": server.alice.id, "name": "alice"}])
    );
    assert_eq!(bob["followings"], json!([]));

    // Second follow is rejected
    let response = server
        .client
        .post(&follow_url)
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_error(
        response,
        400,
        "Bad Request",
        Some("You already follow that user!"),
    )
    .await;
}

#[tokio::test]
async fn test_follow_self_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.api(&format!("/users/{}/follow", server.alice.id)))
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_error(response, 400, "Bad Request", Some("Unable to follow yourself")).await;
}

#[tokio::test]
async fn test_unfollow() {
    let server = TestServer::new().await;
    let follow_url = server.api(&format!("/users/{}/follow", server.bob.id));

    // Not following yet
    let response = server
        .client
        .delete(&follow_url)
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_error(
        response,
        400,
        "Bad Request",
        Some("You are not following this user."),
    )
    .await;

    let response = server
        .client
        .post(&follow_url)
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = server
        .client
        .delete(&follow_url)
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"result": true}));

    let bob = get_user(&server, BOB_KEY, "/users/me").await;
    assert_eq!(bob["followers"], json!([]));
}

#[tokio::test]
async fn test_unknown_user() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.api("/users/9999"))
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_error(response, 404, "Not Found", Some("User does not exist.")).await;

    for request in [
        server.client.post(server.api("/users/9999/follow")),
        server.client.delete(server.api("/users/9999/follow")),
    ] {
        let response = request.header("api-key", ALICE_KEY).send().await.unwrap();
        assert_error(response, 404, "Not Found", Some("User does not exist.")).await;
    }
}

#[tokio::test]
async fn test_non_integer_user_id_is_validation_error() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.api("/users/bob"))
        .header("api-key", ALICE_KEY)
        .send()
        .await
        .unwrap();
    assert_error(response, 422, "ValidationError", None).await;
}
