//! Mock remote ends for the integration tests
//!
//! A small pet store API and a W3C WebDriver server, both served by axum on
//! an ephemeral port and inspected through their shared state.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4f735466cecf";
const SESSION_ID: &str = "mock-session";

/// Serve a router on 127.0.0.1 and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

// ---------------------------------------------------------------------------
// Pet store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct PetStore {
    pets: HashMap<i64, Value>,
    /// Hits on the slow endpoint
    pub slow_hits: u32,
}

pub type SharedStore = Arc<Mutex<PetStore>>;

/// Start the pet store; returns its base URL and state
pub async fn pet_store() -> (String, SharedStore) {
    let state = SharedStore::default();
    let router = Router::new()
        .route("/pet", post(add_pet).put(update_pet))
        .route("/pet/findByStatus", get(find_by_status))
        .route("/pet/:id", get(get_pet).delete(delete_pet))
        .route("/slow", get(slow))
        .with_state(state.clone());
    (serve(router).await, state)
}

fn not_found(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "code": 1, "type": "error", "message": message })),
    )
        .into_response()
}

async fn add_pet(State(state): State<SharedStore>, Json(pet): Json<Value>) -> Response {
    let Some(id) = pet["id"].as_i64() else {
        return (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "message": "Invalid input" })))
            .into_response();
    };
    state.lock().unwrap().pets.insert(id, pet.clone());
    Json(pet).into_response()
}

async fn update_pet(State(state): State<SharedStore>, Json(pet): Json<Value>) -> Response {
    let id = pet["id"].as_i64().unwrap_or_default();
    let mut store = state.lock().unwrap();
    if !store.pets.contains_key(&id) {
        return not_found("Pet not found");
    }
    store.pets.insert(id, pet.clone());
    Json(pet).into_response()
}

async fn find_by_status(
    State(state): State<SharedStore>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let status = params.get("status").cloned().unwrap_or_default();
    let store = state.lock().unwrap();
    let matching: Vec<Value> = store
        .pets
        .values()
        .filter(|pet| pet["status"].as_str() == Some(status.as_str()))
        .cloned()
        .collect();
    Json(Value::Array(matching))
}

async fn get_pet(State(state): State<SharedStore>, Path(id): Path<i64>) -> Response {
    match state.lock().unwrap().pets.get(&id) {
        Some(pet) => Json(pet.clone()).into_response(),
        None => not_found("Pet not found"),
    }
}

async fn delete_pet(State(state): State<SharedStore>, Path(id): Path<i64>) -> Response {
    match state.lock().unwrap().pets.remove(&id) {
        Some(_) => Json(json!({ "code": 200, "type": "unknown", "message": id.to_string() }))
            .into_response(),
        None => not_found("Pet not found"),
    }
}

async fn slow(State(state): State<SharedStore>) -> Json<Value> {
    state.lock().unwrap().slow_hits += 1;
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "late": true }))
}

// ---------------------------------------------------------------------------
// WebDriver
// ---------------------------------------------------------------------------

/// An element the mock driver knows, found by its locator value
#[derive(Clone)]
pub struct MockElement {
    /// Locator `value` the element answers to
    pub selector: String,
    /// Number of lookups that fail before the element shows up
    pub appears_after: u32,
    /// Checkbox state, `None` for other elements
    pub checked: Option<bool>,
    pub text: String,
}

impl MockElement {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            appears_after: 0,
            checked: None,
            text: String::new(),
        }
    }

    pub fn appears_after(mut self, lookups: u32) -> Self {
        self.appears_after = lookups;
        self
    }

    pub fn checkbox(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

#[derive(Default)]
pub struct Driver {
    elements: Vec<MockElement>,
    lookups: HashMap<String, u32>,
    pub sessions_created: u32,
    pub sessions_deleted: u32,
    /// Selectors of clicked elements, in order
    pub clicks: Vec<String>,
    /// (selector, text) pairs sent as keys
    pub keys: Vec<(String, String)>,
    /// Pages loaded through the session
    pub navigations: Vec<String>,
}

impl Driver {
    pub fn lookups(&self, selector: &str) -> u32 {
        self.lookups.get(selector).copied().unwrap_or(0)
    }

    fn element(&self, id: &str) -> Option<&MockElement> {
        let index: usize = id.strip_prefix("el-")?.parse().ok()?;
        self.elements.get(index)
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut MockElement> {
        let index: usize = id.strip_prefix("el-")?.parse().ok()?;
        self.elements.get_mut(index)
    }
}

pub type SharedDriver = Arc<Mutex<Driver>>;

/// Start a WebDriver server with the given elements
pub async fn webdriver(elements: Vec<MockElement>) -> (String, SharedDriver) {
    let state = SharedDriver::new(Mutex::new(Driver {
        elements,
        ..Driver::default()
    }));
    let router = Router::new()
        .route("/session", post(new_session))
        .route("/session/:sid", delete(delete_session))
        .route("/session/:sid/url", post(navigate))
        .route("/session/:sid/element", post(find_element))
        .route("/session/:sid/element/:eid/displayed", get(always_true))
        .route("/session/:sid/element/:eid/enabled", get(always_true))
        .route("/session/:sid/element/:eid/selected", get(is_selected))
        .route("/session/:sid/element/:eid/attribute/:name", get(attribute))
        .route("/session/:sid/element/:eid/text", get(text))
        .route("/session/:sid/element/:eid/click", post(click))
        .route("/session/:sid/element/:eid/clear", post(ok))
        .route("/session/:sid/element/:eid/value", post(send_keys))
        .with_state(state.clone());
    (serve(router).await, state)
}

fn value(value: Value) -> Response {
    Json(json!({ "value": value })).into_response()
}

fn wd_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "value": { "error": error, "message": message, "stacktrace": "" } })),
    )
        .into_response()
}

fn check_session(sid: &str) -> Result<(), Response> {
    if sid == SESSION_ID {
        Ok(())
    } else {
        Err(wd_error(StatusCode::NOT_FOUND, "invalid session id", "session not found"))
    }
}

async fn new_session(State(state): State<SharedDriver>) -> Response {
    state.lock().unwrap().sessions_created += 1;
    value(json!({ "sessionId": SESSION_ID, "capabilities": {} }))
}

async fn delete_session(State(state): State<SharedDriver>, Path(sid): Path<String>) -> Response {
    if let Err(e) = check_session(&sid) {
        return e;
    }
    state.lock().unwrap().sessions_deleted += 1;
    value(Value::Null)
}

async fn navigate(
    State(state): State<SharedDriver>,
    Path(sid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(e) = check_session(&sid) {
        return e;
    }
    let url = body["url"].as_str().unwrap_or_default().to_string();
    state.lock().unwrap().navigations.push(url);
    value(Value::Null)
}

async fn find_element(
    State(state): State<SharedDriver>,
    Path(sid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(e) = check_session(&sid) {
        return e;
    }
    let selector = body["value"].as_str().unwrap_or_default().to_string();
    let mut driver = state.lock().unwrap();
    let seen = {
        let count = driver.lookups.entry(selector.clone()).or_insert(0);
        *count += 1;
        *count
    };
    let found = driver
        .elements
        .iter()
        .position(|e| e.selector == selector && seen > e.appears_after);
    match found {
        Some(index) => {
            let mut reference = serde_json::Map::new();
            reference.insert(ELEMENT_KEY.to_string(), Value::String(format!("el-{}", index)));
            value(Value::Object(reference))
        }
        None => wd_error(
            StatusCode::NOT_FOUND,
            "no such element",
            &format!("An element could not be located using {}", selector),
        ),
    }
}

async fn always_true() -> Response {
    value(Value::Bool(true))
}

async fn ok() -> Response {
    value(Value::Null)
}

async fn is_selected(
    State(state): State<SharedDriver>,
    Path((_sid, eid)): Path<(String, String)>,
) -> Response {
    let driver = state.lock().unwrap();
    let checked = driver.element(&eid).and_then(|e| e.checked).unwrap_or(false);
    value(Value::Bool(checked))
}

async fn attribute(
    State(state): State<SharedDriver>,
    Path((_sid, eid, name)): Path<(String, String, String)>,
) -> Response {
    let driver = state.lock().unwrap();
    match driver.element(&eid) {
        Some(element) if name == "checked" => {
            value(element.checked.map(|c| Value::String(c.to_string())).unwrap_or(Value::Null))
        }
        Some(_) => value(Value::Null),
        None => wd_error(StatusCode::NOT_FOUND, "no such element", "unknown element"),
    }
}

async fn text(
    State(state): State<SharedDriver>,
    Path((_sid, eid)): Path<(String, String)>,
) -> Response {
    let driver = state.lock().unwrap();
    match driver.element(&eid) {
        Some(element) => value(Value::String(element.text.clone())),
        None => wd_error(StatusCode::NOT_FOUND, "no such element", "unknown element"),
    }
}

async fn click(
    State(state): State<SharedDriver>,
    Path((_sid, eid)): Path<(String, String)>,
) -> Response {
    let mut driver = state.lock().unwrap();
    let Some(element) = driver.element_mut(&eid) else {
        return wd_error(StatusCode::NOT_FOUND, "no such element", "unknown element");
    };
    if let Some(checked) = element.checked.as_mut() {
        *checked = !*checked;
    }
    let selector = element.selector.clone();
    driver.clicks.push(selector);
    value(Value::Null)
}

async fn send_keys(
    State(state): State<SharedDriver>,
    Path((_sid, eid)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut driver = state.lock().unwrap();
    let Some(selector) = driver.element(&eid).map(|e| e.selector.clone()) else {
        return wd_error(StatusCode::NOT_FOUND, "no such element", "unknown element");
    };
    let text = body["text"].as_str().unwrap_or_default().to_string();
    driver.keys.push((selector, text));
    value(Value::Null)
}
