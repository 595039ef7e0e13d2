//! End-to-end scenarios against a live router on an ephemeral port.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use farmstead_server::config::ServerConfig;
use farmstead_server::{build_router, AppState};

async fn spawn_server() -> String {
    let config = ServerConfig::default();
    let state = AppState::new(&config).unwrap();
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn register_and_login(base: &str, client: &Client, name: &str) -> String {
    let resp = client
        .post(format!("{base}/api/user/register"))
        .json(&json!({
            "username": name,
            "email": format!("{name}@x.com"),
            "password": "Secr3t!",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/api/user/login"))
        .json(&json!({ "email": format!("{name}@x.com"), "password": "Secr3t!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_field(base: &str, client: &Client, token: &str, name: &str) -> Value {
    let resp = client
        .post(format!("{base}/api/field/create-field"))
        .bearer_auth(token)
        .json(&json!({ "name": name, "area": 10.0, "crop": "wheat" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    body["field"].clone()
}

async fn create_task(base: &str, client: &Client, token: &str, field_name: &str) -> Value {
    let resp = client
        .post(format!("{base}/api/task/create-task"))
        .bearer_auth(token)
        .json(&json!({
            "title": "Irrigate",
            "category": "watering",
            "fieldName": field_name,
            "startDate": "2024-05-20",
            "dueDate": "2024-05-21",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    body["task"].clone()
}

#[tokio::test]
async fn register_login_and_empty_field_list() {
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    let resp = client
        .get(format!("{base}/api/field/get-fields"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fields"], json!([]));
}

#[tokio::test]
async fn missing_token_is_403_and_garbage_token_is_401() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/api/field/get-fields"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .get(format!("{base}/api/field/get-fields"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_field_name_conflicts_only_within_one_account() {
    let base = spawn_server().await;
    let client = Client::new();
    let alice = register_and_login(&base, &client, "alice").await;
    let bob = register_and_login(&base, &client, "bob").await;

    let field = create_field(&base, &client, &alice, "North").await;
    assert_eq!(field["status"], "Planting");

    let resp = client
        .post(format!("{base}/api/field/create-field"))
        .bearer_auth(&alice)
        .json(&json!({ "name": "North", "area": 10.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Same name under another user is fine.
    create_field(&base, &client, &bob, "North").await;
}

#[tokio::test]
async fn field_delete_is_blocked_while_tasks_reference_it() {
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    let field = create_field(&base, &client, &token, "South").await;
    let task = create_task(&base, &client, &token, "South").await;
    assert_eq!(task["fieldId"], field["id"]);

    let resp = client
        .post(format!("{base}/api/field/delete-field"))
        .bearer_auth(&token)
        .json(&json!({ "fieldId": field["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    let blocking = body["tasks"].as_array().unwrap();
    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0]["title"], "Irrigate");

    // Field must still be there.
    let resp = client
        .get(format!("{base}/api/field/get-fields"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fields"].as_array().unwrap().len(), 1);

    // Deleting the task unblocks the field.
    let resp = client
        .post(format!("{base}/api/task/delete-task"))
        .bearer_auth(&token)
        .json(&json!({ "taskId": task["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base}/api/field/delete-field"))
        .bearer_auth(&token)
        .json(&json!({ "fieldId": field["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/field/get-fields"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fields"], json!([]));
}

#[tokio::test]
async fn delete_all_fields_skips_referenced_ones() {
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    create_field(&base, &client, &token, "Free").await;
    create_field(&base, &client, &token, "Busy").await;
    create_task(&base, &client, &token, "Busy").await;

    let resp = client
        .delete(format!("{base}/api/field/delete-all-fields"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"].as_array().unwrap().len(), 1);
    assert_eq!(body["deleted"][0]["name"], "Free");
    assert_eq!(body["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(body["skipped"][0]["field"]["name"], "Busy");
    assert_eq!(body["skipped"][0]["blockingTasks"], 1);
}

#[tokio::test]
async fn status_update_changes_only_the_status() {
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    create_field(&base, &client, &token, "South").await;
    let before = create_task(&base, &client, &token, "South").await;

    let resp = client
        .put(format!("{base}/api/task/status-update"))
        .bearer_auth(&token)
        .json(&json!({ "taskId": before["id"], "status": "In-Progress" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let after = &body["task"];

    let mut expected = before.clone();
    expected["status"] = json!("In-Progress");
    assert_eq!(after, &expected);
}

#[tokio::test]
async fn racing_status_updates_resolve_to_the_last_processed_write() {
    // No lost-update protection exists; both writes succeed and whichever
    // the server processed last is what sticks.
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    create_field(&base, &client, &token, "South").await;
    let task = create_task(&base, &client, &token, "South").await;

    let update = |status: &'static str| {
        let client = client.clone();
        let base = base.clone();
        let token = token.clone();
        let task_id = task["id"].clone();
        async move {
            client
                .put(format!("{base}/api/task/status-update"))
                .bearer_auth(&token)
                .json(&json!({ "taskId": task_id, "status": status }))
                .send()
                .await
                .unwrap()
                .status()
        }
    };

    let (a, b) = tokio::join!(update("Started"), update("Completed"));
    assert_eq!(a, StatusCode::OK);
    assert_eq!(b, StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/task/get-tasks"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let stored = body["tasks"][0]["status"].as_str().unwrap();
    assert!(stored == "Started" || stored == "Completed");
}

#[tokio::test]
async fn tasks_are_invisible_across_accounts() {
    let base = spawn_server().await;
    let client = Client::new();
    let alice = register_and_login(&base, &client, "alice").await;
    let bob = register_and_login(&base, &client, "bob").await;

    create_field(&base, &client, &alice, "South").await;
    let task = create_task(&base, &client, &alice, "South").await;

    let resp = client
        .get(format!("{base}/api/task/get-tasks"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tasks"], json!([]));

    // Touching someone else's task reads as plain not-found.
    let resp = client
        .put(format!("{base}/api/task/status-update"))
        .bearer_auth(&bob)
        .json(&json!({ "taskId": task["id"], "status": "Completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn created_task_round_trips_through_the_list() {
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    create_field(&base, &client, &token, "South").await;
    let created = create_task(&base, &client, &token, "South").await;

    let resp = client
        .get(format!("{base}/api/task/get-tasks"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(&body["tasks"][0], &created);
    assert_eq!(created["priority"], "low");
    assert_eq!(created["status"], "Planned");
    let starts_at =
        chrono::DateTime::parse_from_rfc3339(created["startsAt"].as_str().unwrap()).unwrap();
    assert_eq!(starts_at.to_rfc3339(), "2024-05-20T00:00:00+00:00");
}

#[tokio::test]
async fn malformed_json_bodies_still_get_the_message_envelope() {
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    let resp = client
        .post(format!("{base}/api/field/create-field"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{ this is not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn validation_errors_are_400_with_a_message() {
    let base = spawn_server().await;
    let client = Client::new();
    let token = register_and_login(&base, &client, "alice").await;

    let resp = client
        .post(format!("{base}/api/field/create-field"))
        .bearer_auth(&token)
        .json(&json!({ "area": 10.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("name"));
}
