use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use noteit_core::db::open_db_in_memory;
use noteit_server::{build_app, AppState, HttpOptions};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

fn app_with(options: &HttpOptions) -> Router {
    let conn = open_db_in_memory().expect("in-memory db should open");
    build_app(AppState::new(conn), options).expect("app should build")
}

fn app() -> Router {
    app_with(&HttpOptions::default())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, json)
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, json) = send(app, Method::POST, "/notes/create/", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {json}");
    json
}

fn updated_at(note: &Value) -> DateTime<Utc> {
    note["updatedAt"]
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .expect("updatedAt should be an RFC 3339 timestamp")
}

#[tokio::test]
async fn create_returns_note_with_defaulted_todos() {
    let app = app();
    let created = create(
        &app,
        json!({
            "deviceId": "d1",
            "title": "T",
            "content": "C",
            "isFavorite": false,
            "todos": [{ "title": "A" }]
        }),
    )
    .await;

    assert_eq!(created["deviceId"], "d1");
    assert_eq!(created["title"], "T");
    assert_eq!(created["content"], "C");
    assert_eq!(created["isFavorite"], false);
    assert!(created["id"].is_i64());
    assert!(created["updatedAt"].is_string());
    assert_eq!(created["todos"].as_array().unwrap().len(), 1);
    assert_eq!(created["todos"][0]["title"], "A");
    assert_eq!(created["todos"][0]["completed"], false);
    assert_eq!(created["todos"][0]["noteId"], created["id"]);
}

#[tokio::test]
async fn create_preserves_todo_order() {
    let app = app();
    let titles = ["one", "two", "three", "four"];
    let todos: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(idx, title)| json!({ "title": title, "completed": idx % 2 == 0 }))
        .collect();
    let created = create(
        &app,
        json!({ "deviceId": "d1", "title": "T", "content": "C", "isFavorite": false, "todos": todos }),
    )
    .await;

    let returned: Vec<&str> = created["todos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|todo| todo["title"].as_str().unwrap())
        .collect();
    assert_eq!(returned, titles);
    assert_eq!(created["todos"][2]["completed"], true);
}

#[tokio::test]
async fn create_reports_field_errors() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/notes/create/",
        Some(json!({ "title": "", "content": "C", "isFavorite": "nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["deviceId"], json!(["This field is required."]));
    assert_eq!(body["title"], json!(["This field may not be blank."]));
    assert_eq!(body["isFavorite"], json!(["Must be a valid boolean."]));
    assert!(body.get("content").is_none());

    let (status, _) = send(&app, Method::GET, "/notes/?deviceId=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_requires_is_favorite() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/notes/create/",
        Some(json!({ "deviceId": "d1", "title": "T", "content": "C" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "isFavorite": ["This field is required."] }));

    let (_, listed) = send(&app, Method::GET, "/notes/?deviceId=d1", None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn create_coerces_loose_todo_values() {
    let app = app();
    let created = create(
        &app,
        json!({
            "deviceId": "d1",
            "title": "T",
            "content": "C",
            "isFavorite": "false",
            "todos": [
                { "title": "A", "completed": "true" },
                { "title": 7, "completed": 0 },
                { "title": null, "completed": null }
            ]
        }),
    )
    .await;

    assert_eq!(created["isFavorite"], false);
    let todos = created["todos"].as_array().unwrap();
    assert_eq!(todos[0]["completed"], true);
    assert_eq!(todos[1]["title"], "7");
    assert_eq!(todos[1]["completed"], false);
    assert_eq!(todos[2]["title"], "");
    assert_eq!(todos[2]["completed"], false);
}

#[tokio::test]
async fn create_rejects_unparseable_todo_values() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/notes/create/",
        Some(json!({
            "deviceId": "d1",
            "title": "T",
            "content": "C",
            "isFavorite": false,
            "todos": [{ "title": ["x"], "completed": "sometimes" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["todos"],
        json!([
            "Todo title must be a string.",
            "Todo completed must be a valid boolean."
        ])
    );
}

#[tokio::test]
async fn create_rejects_non_object_body() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/notes/create/", Some(json!("just text"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn view_missing_note_returns_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/notes/999/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Note not found" }));

    let (status, body) = send(&app, Method::GET, "/notes/abc/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Note not found" }));
}

#[tokio::test]
async fn view_returns_note_with_todos() {
    let app = app();
    let created = create(
        &app,
        json!({
            "deviceId": "d1",
            "title": "T",
            "content": "C",
            "isFavorite": true,
            "todos": [{ "title": "A" }, { "title": "B", "completed": true }]
        }),
    )
    .await;

    let uri = format!("/notes/{}/", created["id"]);
    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);
}

#[tokio::test]
async fn list_requires_device_id() {
    let app = app();
    for uri in ["/notes/", "/notes/?deviceId="] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "deviceId is required" }));
    }
}

#[tokio::test]
async fn list_returns_only_device_notes_without_todos() {
    let app = app();
    let first = create(
        &app,
        json!({ "deviceId": "d1", "title": "first", "content": "C", "isFavorite": false, "todos": [{ "title": "x" }] }),
    )
    .await;
    create(&app, json!({ "deviceId": "d2", "title": "other", "content": "C", "isFavorite": false })).await;
    let second = create(&app, json!({ "deviceId": "d1", "title": "second", "content": "C", "isFavorite": false })).await;

    let (status, body) = send(&app, Method::GET, "/notes/?deviceId=d1", None).await;
    assert_eq!(status, StatusCode::OK);
    let notes = body.as_array().unwrap();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|note| note["deviceId"] == "d1"));
    assert!(notes.iter().all(|note| note.get("todos").is_none()));

    let ids: Vec<&Value> = notes.iter().map(|note| &note["id"]).collect();
    assert!(ids.contains(&&first["id"]));
    assert!(ids.contains(&&second["id"]));
}

#[tokio::test]
async fn list_orders_by_most_recent_update() {
    let app = app();
    let first = create(&app, json!({ "deviceId": "d1", "title": "first", "content": "C", "isFavorite": false })).await;
    create(&app, json!({ "deviceId": "d1", "title": "second", "content": "C", "isFavorite": false })).await;

    let second = create(
        &app,
        json!({ "deviceId": "d1", "title": "second", "content": "C", "isFavorite": false }),
    )
    .await;

    // Timestamps have microsecond resolution; keep the favorite write strictly later.
    std::thread::sleep(Duration::from_millis(5));
    let uri = format!("/notes/{}/favorite/", first["id"]);
    let (status, favorited) =
        send(&app, Method::PATCH, &uri, Some(json!({ "isFavorite": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated_at(&favorited) > updated_at(&second));

    let (_, body) = send(&app, Method::GET, "/notes/?deviceId=d1", None).await;
    assert_eq!(body[0]["id"], first["id"]);
    assert_eq!(body[1]["id"], second["id"]);
}

#[tokio::test]
async fn update_without_todos_keeps_them_and_empty_list_clears_them() {
    let app = app();
    let created = create(
        &app,
        json!({ "deviceId": "d1", "title": "T", "content": "C", "isFavorite": false, "todos": [{ "title": "A" }] }),
    )
    .await;
    let uri = format!("/notes/{}/update/", created["id"]);

    let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({ "title": "T2" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "T2");
    assert_eq!(updated["content"], "C");
    assert_eq!(updated["todos"], created["todos"]);

    let (status, cleared) = send(&app, Method::PUT, &uri, Some(json!({ "todos": [] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["todos"], json!([]));
    assert_eq!(cleared["title"], "T2");
}

#[tokio::test]
async fn update_replaces_todos_and_fields() {
    let app = app();
    let created = create(
        &app,
        json!({ "deviceId": "d1", "title": "T", "content": "C", "isFavorite": false, "todos": [{ "title": "old" }] }),
    )
    .await;
    let uri = format!("/notes/{}/update/", created["id"]);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({
            "id": 12345,
            "content": "new body",
            "isFavorite": true,
            "todos": [{ "title": "n1", "completed": true }, { "title": "n2" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["content"], "new body");
    assert_eq!(updated["isFavorite"], true);
    let titles: Vec<&str> = updated["todos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|todo| todo["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["n1", "n2"]);
}

#[tokio::test]
async fn update_missing_note_returns_404_before_validation() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::PUT,
        "/notes/999/update/",
        Some(json!({ "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Note not found");
}

#[tokio::test]
async fn update_rejects_invalid_fields() {
    let app = app();
    let created = create(&app, json!({ "deviceId": "d1", "title": "T", "content": "C", "isFavorite": false })).await;
    let uri = format!("/notes/{}/update/", created["id"]);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "title": "x".repeat(256), "deviceId": null })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["title"],
        json!(["Ensure this field has no more than 255 characters."])
    );
    assert_eq!(body["deviceId"], json!(["This field may not be null."]));

    let (_, unchanged) = send(&app, Method::GET, &format!("/notes/{}/", created["id"]), None).await;
    assert_eq!(unchanged, created);
}

#[tokio::test]
async fn delete_removes_note_and_todos() {
    let app = app();
    let created = create(
        &app,
        json!({ "deviceId": "d1", "title": "T", "content": "C", "isFavorite": false, "todos": [{ "title": "A" }] }),
    )
    .await;
    let delete_uri = format!("/notes/{}/delete/", created["id"]);

    let (status, body) = send(&app, Method::DELETE, &delete_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, &format!("/notes/{}/", created["id"]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &delete_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favorite_changes_only_flag_and_timestamp() {
    let app = app();
    let created = create(
        &app,
        json!({ "deviceId": "d1", "title": "T", "content": "C", "isFavorite": false, "todos": [{ "title": "A" }] }),
    )
    .await;
    let uri = format!("/notes/{}/favorite/", created["id"]);

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({ "isFavorite": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFavorite"], true);
    assert!(body.get("todos").is_none());
    for key in ["id", "deviceId", "title", "content"] {
        assert_eq!(body[key], created[key], "field {key} changed");
    }

    let (_, detail) = send(&app, Method::GET, &format!("/notes/{}/", created["id"]), None).await;
    assert_eq!(detail["todos"], created["todos"]);
}

#[tokio::test]
async fn favorite_validates_input_after_existence() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::PATCH,
        "/notes/999/favorite/",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Note not found");

    let created = create(&app, json!({ "deviceId": "d1", "title": "T", "content": "C", "isFavorite": false })).await;
    let uri = format!("/notes/{}/favorite/", created["id"]);

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "isFavorite field is required" }));

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({ "isFavorite": {} }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isFavorite"], json!(["Must be a valid boolean."]));
}

#[tokio::test]
async fn api_prefix_nests_note_routes() {
    let app = app_with(&HttpOptions {
        api_prefix: "/api/".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
    });

    let (status, _) = send(&app, Method::GET, "/api/notes/?deviceId=d1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/notes/?deviceId=d1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn invalid_cors_origin_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let options = HttpOptions {
        api_prefix: String::new(),
        cors_origins: vec!["bad\norigin".to_string()],
    };
    assert!(build_app(AppState::new(conn), &options).is_err());
}
