use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// Header the developer API authenticates with.
pub const ACCESS_TOKEN_HEADER: &str = "X-PW-AccessToken";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Email {
    pub email: String,
    pub category: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub details: Option<String>,
    pub emails: Vec<Email>,
}

#[derive(Deserialize)]
pub struct CreatePerson {
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub emails: Vec<Email>,
}

#[derive(Deserialize)]
pub struct UpdatePerson {
    pub name: Option<String>,
    pub details: Option<String>,
    pub emails: Option<Vec<Email>>,
}

/// Shared server state. Tests keep a handle to assert on `hits`: the count
/// of requests that actually reached the server, i.e. escaped the client's
/// cache.
pub struct AppState {
    people: RwLock<HashMap<u64, Person>>,
    next_id: AtomicU64,
    hits: AtomicU64,
}

impl AppState {
    pub fn shared() -> Arc<AppState> {
        Arc::new(AppState {
            people: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            hits: AtomicU64::new(0),
        })
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/people", get(list_people).post(create_person))
        .route(
            "/v1/people/{id}",
            get(get_person).put(update_person).delete(delete_person),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            count_and_authenticate,
        ))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: Arc<AppState>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

/// Count every request, then reject the ones missing the access token.
async fn count_and_authenticate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if request.headers().get(ACCESS_TOKEN_HEADER).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn list_people(State(state): State<Arc<AppState>>) -> Json<Vec<Person>> {
    let people = state.people.read().await;
    Json(people.values().cloned().collect())
}

async fn create_person(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreatePerson>,
) -> (StatusCode, Json<Person>) {
    let person = Person {
        id: state.next_id.fetch_add(1, Ordering::SeqCst),
        name: input.name,
        details: input.details,
        emails: input.emails,
    };
    state.people.write().await.insert(person.id, person.clone());
    (StatusCode::CREATED, Json(person))
}

async fn get_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Person>, StatusCode> {
    let people = state.people.read().await;
    people.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(input): Json<UpdatePerson>,
) -> Result<Json<Person>, StatusCode> {
    let mut people = state.people.write().await;
    let person = people.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        person.name = name;
    }
    if let Some(details) = input.details {
        person.details = Some(details);
    }
    if let Some(emails) = input.emails {
        person.emails = emails;
    }
    Ok(Json(person.clone()))
}

async fn delete_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let mut people = state.people.write().await;
    people.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}
