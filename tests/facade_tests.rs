use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use farmstead::{Farmstead, TaskChangeBus};

fn user_json() -> serde_json::Value {
    json!({
        "id": "u1",
        "username": "ada",
        "email": "ada@example.com",
        "role": "user"
    })
}

#[tokio::test]
async fn login_signs_in_every_handle_from_the_same_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "token": "jwt-abc",
            "user": user_json(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/field/get-fields"))
        .and(header("authorization", "Bearer jwt-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Fields fetched successfully",
            "fields": [],
        })))
        .mount(&server)
        .await;

    let farm = Farmstead::new(&server.uri());
    assert!(!farm.session().is_signed_in());

    farm.auth().login("ada@example.com", "hunter2").await.unwrap();
    assert!(farm.session().is_signed_in());

    // A handle created after login carries the same session.
    let fields = farm.fields().list().await.unwrap();
    assert!(fields.is_empty());
}

#[tokio::test]
async fn boards_publish_on_the_injected_bus() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "token": "jwt-abc",
            "user": user_json(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/field/create-field"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Field created successfully",
            "field": {
                "id": "f1",
                "userId": "u1",
                "name": "North",
                "area": 12.5,
                "crop": "Wheat",
                "status": "Planting"
            },
        })))
        .mount(&server)
        .await;

    let bus = TaskChangeBus::new();
    let emits = Arc::new(AtomicUsize::new(0));
    let counter = emits.clone();
    let _sub = bus.subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let farm = Farmstead::new_with_bus(&server.uri(), bus);
    farm.auth().login("ada@example.com", "hunter2").await.unwrap();

    let board = farm.field_board();
    let outcome = board.create("North", 12.5, Some("Wheat")).await;
    assert!(outcome.is_confirmed());
    assert_eq!(emits.load(Ordering::SeqCst), 1);
}
