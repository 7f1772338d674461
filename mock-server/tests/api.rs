use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_db, Db, Envelope, ErrorBody, Todo, TodoPage};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn error_message(response: axum::response::Response) -> String {
    body_json::<ErrorBody>(response).await.error
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

async fn seeded(items: &[(&str, bool)]) -> Db {
    let db = Db::default();
    {
        let mut table = db.write().await;
        for (title, completed) in items {
            table.insert(title.to_string(), None, *completed);
        }
    }
    db
}

// --- list ---

#[tokio::test]
async fn list_todos_empty() {
    let resp = app().oneshot(get("/api/todos")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: Envelope<TodoPage> = body_json(resp).await;
    assert!(page.data.items.is_empty());
    assert_eq!(page.data.meta.page, 1);
    assert_eq!(page.data.meta.page_size, 5);
    assert_eq!(page.data.meta.total, 0);
    assert_eq!(page.data.meta.total_pages, 0);
}

#[tokio::test]
async fn list_todos_paginates_newest_first() {
    let db = seeded(&[("a", false), ("b", false), ("c", false)]).await;
    let resp = app_with_db(db)
        .oneshot(get("/api/todos?page=1&page_size=2&sort=created_at%20desc"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: Envelope<TodoPage> = body_json(resp).await;
    let titles: Vec<_> = page.data.items.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["c", "b"]);
    assert_eq!(page.data.meta.total, 3);
    assert_eq!(page.data.meta.total_pages, 2);
}

#[tokio::test]
async fn list_todos_filters_on_completed() {
    let db = seeded(&[("a", true), ("b", false), ("c", true)]).await;
    let resp = app_with_db(db)
        .oneshot(get("/api/todos?completed=false"))
        .await
        .unwrap();

    let page: Envelope<TodoPage> = body_json(resp).await;
    assert_eq!(page.data.items.len(), 1);
    assert_eq!(page.data.items[0].title, "b");
    assert_eq!(page.data.meta.total, 1);
}

#[tokio::test]
async fn list_todos_rejects_bad_parameters() {
    let cases = [
        ("/api/todos?page=0", "invalid page parameter"),
        ("/api/todos?page=abc", "invalid page parameter"),
        ("/api/todos?page_size=101", "invalid page_size parameter (1-100)"),
        ("/api/todos?completed=yes", "invalid completed filter; must be true or false"),
        ("/api/todos?sort=password%20desc", "invalid sort parameter"),
    ];

    for (uri, expected) in cases {
        let resp = app().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(error_message(resp).await, expected, "{uri}");
    }
}

// --- create ---

#[tokio::test]
async fn create_todo_returns_201_with_location() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos", r#"{"title":"Buy milk"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()[http::header::LOCATION], "/todos/1");
    let todo: Envelope<Todo> = body_json(resp).await;
    assert_eq!(todo.data.id, 1);
    assert_eq!(todo.data.title, "Buy milk");
    assert!(!todo.data.completed);
    assert_eq!(todo.data.user_id, 1);
}

#[tokio::test]
async fn create_todo_with_description_and_completed() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/todos",
            r#"{"title":"Already done","description":"yesterday","completed":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let todo: Envelope<Todo> = body_json(resp).await;
    assert!(todo.data.completed);
    assert_eq!(todo.data.description.as_deref(), Some("yesterday"));
}

#[tokio::test]
async fn create_todo_missing_title_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos", r#"{"not_title":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!error_message(resp).await.is_empty());
}

#[tokio::test]
async fn create_todo_empty_title_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos", r#"{"title":""}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "title must be 1-255 characters");
}

// --- get ---

#[tokio::test]
async fn get_todo_not_found() {
    let resp = app().oneshot(get("/api/todos/1")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(resp).await, "todo not found or not authorized");
}

#[tokio::test]
async fn get_todo_bad_id_returns_400() {
    let resp = app().oneshot(get("/api/todos/not-a-number")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- update ---

#[tokio::test]
async fn update_todo_not_found() {
    let resp = app()
        .oneshot(json_request("PATCH", "/api/todos/1", r#"{"title":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_todo_without_fields_returns_400() {
    let db = seeded(&[("a", false)]).await;
    let resp = app_with_db(db)
        .oneshot(json_request("PATCH", "/api/todos/1", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "no fields to update");
}

// --- delete ---

#[tokio::test]
async fn delete_todo_not_found() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/todos/1")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/todos", r#"{"title":"Walk dog","description":"around the block"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Envelope<Todo> = body_json(resp).await;
    let id = created.data.id;

    // list: contains the one todo
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/api/todos"))
        .await
        .unwrap();
    let page: Envelope<TodoPage> = body_json(resp).await;
    assert_eq!(page.data.items.len(), 1);
    assert_eq!(page.data.items[0].id, id);

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/api/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Envelope<Todo> = body_json(resp).await;
    assert_eq!(fetched.data, created.data);

    // patch: only completed
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PATCH", &format!("/api/todos/{id}"), r#"{"completed":true}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Envelope<Todo> = body_json(resp).await;
    assert_eq!(updated.data.title, "Walk dog"); // unchanged
    assert!(updated.data.completed);
    assert!(updated.data.updated_at >= created.data.updated_at);

    // put behaves like patch; null clears the description
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/api/todos/{id}"),
            r#"{"title":"Walk cat","description":null}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Envelope<Todo> = body_json(resp).await;
    assert_eq!(updated.data.title, "Walk cat");
    assert_eq!(updated.data.description, None);
    assert!(updated.data.completed); // unchanged from previous update

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/todos/{id}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted: Envelope<serde_json::Value> = body_json(resp).await;
    assert_eq!(deleted.data["message"], "Todo successfully deleted");
    assert_eq!(deleted.data["id"], id.to_string());

    // get after delete: 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/api/todos/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete: empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/api/todos"))
        .await
        .unwrap();
    let body = body_bytes(resp).await;
    let page: Envelope<TodoPage> = serde_json::from_slice(&body).unwrap();
    assert!(page.data.items.is_empty());
}
