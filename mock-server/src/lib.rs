//! In-memory imitation of the Drip v2 API routes the client catalog uses.
//!
//! One account with one workflow and one campaign is always present.
//! Subscribers, tags, enrolments and events live in a shared `MockState` that
//! tests can inspect through `app_with_state`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ACCOUNT_ID: &str = "9999999";
pub const WORKFLOW_ID: &str = "111";
pub const CAMPAIGN_ID: &str = "222";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub status: String,
    pub custom_fields: BTreeMap<String, Value>,
    pub tags: BTreeSet<String>,
    pub workflows: BTreeSet<String>,
    pub campaigns: BTreeSet<String>,
}

impl Subscriber {
    fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            status: "active".to_string(),
            custom_fields: BTreeMap::new(),
            tags: BTreeSet::new(),
            workflows: BTreeSet::new(),
            campaigns: BTreeSet::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub email: String,
    pub action: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub occurred_at: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub subscribers: HashMap<String, Subscriber>,
    pub events: Vec<Event>,
}

pub type Db = Arc<RwLock<MockState>>;

#[derive(Deserialize)]
pub struct SubscriberInput {
    pub email: String,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct SubscribersPayload {
    pub subscribers: Vec<SubscriberInput>,
}

#[derive(Deserialize)]
pub struct TagInput {
    pub email: String,
    pub tag: String,
}

#[derive(Deserialize)]
pub struct TagsPayload {
    pub tags: Vec<TagInput>,
}

#[derive(Deserialize)]
pub struct EventsPayload {
    pub events: Vec<Event>,
}

#[derive(Deserialize)]
pub struct UnsubscribeQuery {
    pub campaign_id: Option<String>,
}

type ApiResult = Result<Response, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    app_with_state(Db::default())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/{account_id}/workflows", get(list_workflows))
        .route("/{account_id}/campaigns", get(list_campaigns))
        .route("/{account_id}/subscribers", post(create_subscribers))
        .route("/{account_id}/subscribers/{email}", delete(delete_subscriber))
        .route("/{account_id}/subscribers/{email}/tags/{tag}", delete(remove_tag))
        .route("/{account_id}/subscribers/{email}/unsubscribe", post(unsubscribe))
        .route("/{account_id}/tags", post(apply_tags))
        .route(
            "/{account_id}/workflows/{workflow_id}/subscribers",
            post(start_workflow),
        )
        .route(
            "/{account_id}/workflows/{workflow_id}/subscribers/{email}",
            delete(stop_workflow),
        )
        .route(
            "/{account_id}/campaigns/{campaign_id}/subscribers",
            post(subscribe_to_campaign),
        )
        .route("/{account_id}/events", post(record_events))
        .layer(middleware::from_fn(require_basic_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Db::default()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

async fn require_basic_auth(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.strip_prefix("Basic ").is_some_and(|token| !token.is_empty()));

    if !authorized {
        return error(StatusCode::UNAUTHORIZED, "authentication_error", "missing credentials")
            .into_response();
    }
    next.run(request).await
}

fn error(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "errors": [{ "code": code, "message": message }] })),
    )
}

fn check_account(account_id: &str) -> Result<(), (StatusCode, Json<Value>)> {
    if account_id == ACCOUNT_ID {
        Ok(())
    } else {
        Err(error(StatusCode::NOT_FOUND, "not_found_error", "account not found"))
    }
}

fn subscribers_body(subscribers: Vec<Subscriber>) -> Value {
    json!({
        "links": { "subscribers.account": format!("https://api.getdrip.com/v2/accounts/{ACCOUNT_ID}") },
        "subscribers": subscribers,
    })
}

async fn list_accounts() -> Json<Value> {
    Json(json!({ "accounts": [{ "id": ACCOUNT_ID, "name": "Acme Webinars" }] }))
}

async fn list_workflows(Path(account_id): Path<String>) -> ApiResult {
    check_account(&account_id)?;
    Ok(Json(json!({ "workflows": [{ "id": WORKFLOW_ID, "name": "Onboarding", "status": "active" }] }))
        .into_response())
}

async fn list_campaigns(Path(account_id): Path<String>) -> ApiResult {
    check_account(&account_id)?;
    Ok(Json(json!({ "campaigns": [{ "id": CAMPAIGN_ID, "name": "Webinar follow-up", "status": "active" }] }))
        .into_response())
}

async fn create_subscribers(
    State(db): State<Db>,
    Path(account_id): Path<String>,
    Json(input): Json<SubscribersPayload>,
) -> ApiResult {
    check_account(&account_id)?;
    let mut state = db.write().await;
    let mut out = Vec::new();
    for sub in input.subscribers {
        let entry = state
            .subscribers
            .entry(sub.email.clone())
            .or_insert_with(|| Subscriber::new(&sub.email));
        entry.custom_fields.extend(sub.custom_fields);
        entry.tags.extend(sub.tags);
        out.push(entry.clone());
    }
    Ok(Json(subscribers_body(out)).into_response())
}

async fn delete_subscriber(
    State(db): State<Db>,
    Path((account_id, email)): Path<(String, String)>,
) -> ApiResult {
    check_account(&account_id)?;
    let mut state = db.write().await;
    state
        .subscribers
        .remove(&email)
        .map(|_| StatusCode::NO_CONTENT.into_response())
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not_found_error", "subscriber not found"))
}

async fn apply_tags(
    State(db): State<Db>,
    Path(account_id): Path<String>,
    Json(input): Json<TagsPayload>,
) -> ApiResult {
    check_account(&account_id)?;
    let mut state = db.write().await;
    for t in input.tags {
        state
            .subscribers
            .entry(t.email.clone())
            .or_insert_with(|| Subscriber::new(&t.email))
            .tags
            .insert(t.tag);
    }
    Ok(StatusCode::CREATED.into_response())
}

async fn remove_tag(
    State(db): State<Db>,
    Path((account_id, email, tag)): Path<(String, String, String)>,
) -> ApiResult {
    check_account(&account_id)?;
    let mut state = db.write().await;
    let subscriber = state
        .subscribers
        .get_mut(&email)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not_found_error", "subscriber not found"))?;
    subscriber.tags.remove(&tag);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn start_workflow(
    State(db): State<Db>,
    Path((account_id, workflow_id)): Path<(String, String)>,
    Json(input): Json<SubscribersPayload>,
) -> ApiResult {
    check_account(&account_id)?;
    if workflow_id != WORKFLOW_ID {
        return Err(error(StatusCode::NOT_FOUND, "not_found_error", "workflow not found"));
    }
    let mut state = db.write().await;
    let mut out = Vec::new();
    for sub in input.subscribers {
        let entry = state
            .subscribers
            .entry(sub.email.clone())
            .or_insert_with(|| Subscriber::new(&sub.email));
        entry.custom_fields.extend(sub.custom_fields);
        entry.workflows.insert(workflow_id.clone());
        out.push(entry.clone());
    }
    Ok((StatusCode::CREATED, Json(subscribers_body(out))).into_response())
}

async fn stop_workflow(
    State(db): State<Db>,
    Path((account_id, workflow_id, email)): Path<(String, String, String)>,
) -> ApiResult {
    check_account(&account_id)?;
    let mut state = db.write().await;
    let subscriber = state
        .subscribers
        .get_mut(&email)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not_found_error", "subscriber not found"))?;
    subscriber.workflows.remove(&workflow_id);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn subscribe_to_campaign(
    State(db): State<Db>,
    Path((account_id, campaign_id)): Path<(String, String)>,
    Json(input): Json<SubscribersPayload>,
) -> ApiResult {
    check_account(&account_id)?;
    if campaign_id != CAMPAIGN_ID {
        return Err(error(StatusCode::NOT_FOUND, "not_found_error", "campaign not found"));
    }
    let mut state = db.write().await;
    let mut out = Vec::new();
    for sub in input.subscribers {
        let entry = state
            .subscribers
            .entry(sub.email.clone())
            .or_insert_with(|| Subscriber::new(&sub.email));
        entry.custom_fields.extend(sub.custom_fields);
        entry.campaigns.insert(campaign_id.clone());
        out.push(entry.clone());
    }
    Ok((StatusCode::CREATED, Json(subscribers_body(out))).into_response())
}

async fn unsubscribe(
    State(db): State<Db>,
    Path((account_id, email)): Path<(String, String)>,
    Query(query): Query<UnsubscribeQuery>,
) -> ApiResult {
    check_account(&account_id)?;
    let mut state = db.write().await;
    let subscriber = state
        .subscribers
        .get_mut(&email)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not_found_error", "subscriber not found"))?;
    match query.campaign_id {
        Some(id) => {
            subscriber.campaigns.remove(&id);
        }
        None => subscriber.campaigns.clear(),
    }
    let out = vec![subscriber.clone()];
    Ok(Json(subscribers_body(out)).into_response())
}

async fn record_events(
    State(db): State<Db>,
    Path(account_id): Path<String>,
    Json(input): Json<EventsPayload>,
) -> ApiResult {
    check_account(&account_id)?;
    db.write().await.events.extend(input.events);
    Ok(StatusCode::NO_CONTENT.into_response())
}
