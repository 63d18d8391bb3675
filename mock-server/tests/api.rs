use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, AppState, Person, ACCESS_TOKEN_HEADER};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(ACCESS_TOKEN_HEADER, TOKEN)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(ACCESS_TOKEN_HEADER, TOKEN)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = app(AppState::shared());
    let resp = app
        .oneshot(Request::builder().uri("/v1/people").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- hit counting ---

#[tokio::test]
async fn every_request_is_counted() {
    use tower::Service;

    let state = AppState::shared();
    let mut app = app(std::sync::Arc::clone(&state)).into_service();

    for _ in 0..3 {
        ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get_request("/v1/people"))
            .await
            .unwrap();
    }

    assert_eq!(state.hits(), 3);
}

// --- list ---

#[tokio::test]
async fn list_people_empty() {
    let app = app(AppState::shared());
    let resp = app.oneshot(get_request("/v1/people")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let people: Vec<Person> = body_json(resp).await;
    assert!(people.is_empty());
}

// --- create ---

#[tokio::test]
async fn create_person_returns_201() {
    let app = app(AppState::shared());
    let resp = app
        .oneshot(json_request(
            "POST",
            "/v1/people",
            r#"{"name":"Jon Lee","emails":[{"email":"support@example.com","category":"work"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let person: Person = body_json(resp).await;
    assert_eq!(person.name, "Jon Lee");
    assert_eq!(person.emails.len(), 1);
}

#[tokio::test]
async fn create_person_malformed_json_returns_422() {
    let app = app(AppState::shared());
    let resp = app
        .oneshot(json_request("POST", "/v1/people", r#"{"not_name":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- get ---

#[tokio::test]
async fn get_person_not_found() {
    let app = app(AppState::shared());
    let resp = app.oneshot(get_request("/v1/people/999")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_person_bad_id_returns_400() {
    let app = app(AppState::shared());
    let resp = app.oneshot(get_request("/v1/people/not-a-number")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- update ---

#[tokio::test]
async fn update_person_not_found() {
    let app = app(AppState::shared());
    let resp = app
        .oneshot(json_request("PUT", "/v1/people/999", r#"{"name":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_person_not_found() {
    let app = app(AppState::shared());
    let resp = app
        .oneshot(json_request("DELETE", "/v1/people/999", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full lifecycle ---

#[tokio::test]
async fn person_lifecycle() {
    use tower::Service;

    let mut app = app(AppState::shared()).into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/v1/people", r#"{"name":"Jon Lee"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Person = body_json(resp).await;
    let id = created.id;

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/v1/people/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Person = body_json(resp).await;
    assert_eq!(fetched.name, "Jon Lee");

    // update — partial: only details
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/v1/people/{id}"),
            r#"{"details":"Founder"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Person = body_json(resp).await;
    assert_eq!(updated.name, "Jon Lee"); // unchanged
    assert_eq!(updated.details.as_deref(), Some("Founder"));

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("DELETE", &format!("/v1/people/{id}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let body = body_bytes(resp).await;
    assert!(body.is_empty());

    // get after delete — 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/v1/people/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
