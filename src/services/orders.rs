//! Orders service.
//!
//! # Responsibilities
//! - CRUD over an in-memory order store
//! - Enrich orders with the owning user's name and email
//! - Report the users service as a dependency in its health body
//!
//! # Design Decisions
//! - A user lookup that fails never fails a read; the order is returned
//!   without enrichment
//! - Creating an order requires the user to exist: 404 when the users service
//!   says it does not, 503 when the users service cannot answer sensibly
//! - The dependency check reuses the gateway's health aggregator

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use crate::config::{BackendConfig, ServiceConfig};
use crate::config::schema::TimeoutConfig;
use crate::health::aggregate_health;
use crate::http::response::timestamp;
use crate::services::{
    json_object, method_not_allowed, parse_id, today, with_service_layers, ApiError, ServiceError,
    ServiceName,
};
use crate::upstream::{Backend, BackendClient, BackendError};

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub items: Vec<Value>,
    pub total: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An order with the owner's details attached when they could be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedOrder {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl EnrichedOrder {
    fn new(order: Order, user: Option<&UserSummary>) -> Self {
        Self {
            order,
            user_name: user.map(|u| u.name.clone()),
            user_email: user.map(|u| u.email.clone()),
        }
    }
}

/// Fields accepted when creating an order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: u64,
    pub items: Vec<Value>,
    pub total: f64,
}

/// Fields accepted when updating an order; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderUpdate {
    pub items: Option<Vec<Value>>,
    pub total: Option<f64>,
    pub status: Option<String>,
}

impl NewOrder {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ServiceError> {
        let required = || ServiceError::BadRequest("user_id, items and total are required".to_string());
        let user_id = body.get("user_id").ok_or_else(required)?;
        let items = body.get("items").ok_or_else(required)?;
        let total = body.get("total").ok_or_else(required)?;

        Ok(Self {
            user_id: user_id
                .as_u64()
                .ok_or_else(|| ServiceError::BadRequest("user_id must be a positive integer".to_string()))?,
            items: items_value(items)?,
            total: total_value(total)?,
        })
    }
}

impl OrderUpdate {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ServiceError> {
        let status = match body.get("status") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ServiceError::BadRequest("status must be a string".to_string())),
        };
        Ok(Self {
            items: body.get("items").map(items_value).transpose()?,
            total: body.get("total").map(total_value).transpose()?,
            status,
        })
    }
}

fn items_value(value: &Value) -> Result<Vec<Value>, ServiceError> {
    value
        .as_array()
        .cloned()
        .ok_or_else(|| ServiceError::BadRequest("items must be a list".to_string()))
}

fn total_value(value: &Value) -> Result<f64, ServiceError> {
    value
        .as_f64()
        .ok_or_else(|| ServiceError::BadRequest("total must be a number".to_string()))
}

/// In-memory order store.
#[derive(Debug)]
pub struct OrderStore {
    orders: BTreeMap<u64, Order>,
    next_id: u64,
}

impl Default for OrderStore {
    fn default() -> Self {
        Self {
            orders: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl OrderStore {
    /// Store pre-filled with sample orders.
    pub fn seeded() -> Self {
        let mut store = Self::default();
        let samples = [
            (2, json!(["Dell Notebook", "Logitech Mouse"]), 3949.80, "delivered", "2023-10-15", "2023-10-20"),
            (3, json!(["LG 24\" Monitor", "Mechanical Keyboard"]), 1499.80, "shipped", "2023-11-20", "2023-11-22"),
            (2, json!(["HD Webcam"]), 299.90, "processing", "2023-11-28", "2023-11-28"),
        ];
        for (user_id, items, total, status, created_at, updated_at) in samples {
            let id = store.next_id;
            store.orders.insert(
                id,
                Order {
                    id,
                    user_id,
                    items: items.as_array().cloned().unwrap_or_default(),
                    total,
                    status: status.to_string(),
                    created_at: created_at.to_string(),
                    updated_at: updated_at.to_string(),
                },
            );
            store.next_id += 1;
        }
        store
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn list(&self) -> Vec<Order> {
        self.orders.values().cloned().collect()
    }

    pub fn get(&self, id: u64) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// New orders always start `pending`.
    pub fn create(&mut self, new: NewOrder) -> Order {
        let now = today();
        let order = Order {
            id: self.next_id,
            user_id: new.user_id,
            items: new.items,
            total: new.total,
            status: "pending".to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.orders.insert(order.id, order.clone());
        self.next_id += 1;
        order
    }

    pub fn update(&mut self, id: u64, update: OrderUpdate) -> Result<Order, ServiceError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(ServiceError::NotFound { what: "Order", id })?;
        if let Some(items) = update.items {
            order.items = items;
        }
        if let Some(total) = update.total {
            order.total = total;
        }
        if let Some(status) = update.status {
            order.status = status;
        }
        order.updated_at = today();
        Ok(order.clone())
    }

    pub fn delete(&mut self, id: u64) -> Option<Order> {
        self.orders.remove(&id)
    }

    pub fn by_user(&self, user_id: u64) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn by_status(&self, status: &str) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect()
    }
}

/// The user fields orders are enriched with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: UserSummary,
}

/// Outcome of asking the users service about one user.
#[derive(Debug, Clone, PartialEq)]
pub enum UserLookup {
    Found(UserSummary),
    /// The users service answered 404.
    Missing,
    /// No usable answer: transport failure, unexpected status, or a body
    /// without the expected fields.
    Unavailable(String),
}

impl UserLookup {
    pub fn user(&self) -> Option<&UserSummary> {
        match self {
            UserLookup::Found(user) => Some(user),
            _ => None,
        }
    }
}

/// Client for the users service's `GET /users/{id}`.
#[derive(Clone)]
pub struct UsersClient {
    http: reqwest::Client,
    base_url: String,
}

impl UsersClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Service-to-service traffic stays on the internal network.
        let http = reqwest::Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn lookup(&self, user_id: u64) -> UserLookup {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Users service lookup failed");
                return UserLookup::Unavailable(e.to_string());
            }
        };

        match response.status() {
            reqwest::StatusCode::OK => match response.json::<UserEnvelope>().await {
                Ok(envelope) => UserLookup::Found(envelope.user),
                Err(e) => {
                    tracing::warn!(user_id, error = %e, "Users service returned an unusable body");
                    UserLookup::Unavailable(e.to_string())
                }
            },
            reqwest::StatusCode::NOT_FOUND => UserLookup::Missing,
            status => {
                tracing::warn!(user_id, status = %status, "Users service returned an unexpected status");
                UserLookup::Unavailable(format!("users service answered {}", status))
            }
        }
    }

    /// Look up several users concurrently; each id is asked once.
    async fn lookup_many(&self, user_ids: impl IntoIterator<Item = u64>) -> BTreeMap<u64, UserLookup> {
        let mut ids: Vec<u64> = user_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let lookups = join_all(ids.iter().map(|id| self.lookup(*id))).await;
        ids.into_iter().zip(lookups).collect()
    }
}

/// Errors building the orders service state.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("users service backend: {0}")]
    Backend(#[from] BackendError),

    #[error("users service client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Handler state for the orders service.
#[derive(Clone)]
pub struct OrdersState {
    pub service: ServiceName,
    pub store: Arc<RwLock<OrderStore>>,
    pub users: UsersClient,
    probe: BackendClient,
    users_backend: Arc<Backend>,
}

impl OrdersState {
    pub fn new(config: &ServiceConfig, store: OrderStore) -> Result<Self, SetupError> {
        let mut backend = BackendConfig::new("users_service", config.users_service_url.clone());
        backend.health_timeout_ms = Some(config.health_timeout_ms);
        backend.data_timeout_ms = Some(config.dependency_timeout_ms);
        let users_backend = Backend::from_config(&backend, &TimeoutConfig::default())?;

        Ok(Self {
            service: ServiceName::new(&config.service_name),
            store: Arc::new(RwLock::new(store)),
            users: UsersClient::new(
                &config.users_service_url,
                Duration::from_millis(config.dependency_timeout_ms),
            )?,
            probe: BackendClient::new(64 * 1024),
            users_backend: Arc::new(users_backend),
        })
    }
}

impl FromRef<OrdersState> for ServiceName {
    fn from_ref(state: &OrdersState) -> Self {
        state.service.clone()
    }
}

/// Build the orders service router.
pub fn router(state: OrdersState) -> Router {
    let routes = Router::new()
        .route("/", get(home).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route(
            "/orders",
            get(list_orders).post(create_order).fallback(method_not_allowed),
        )
        .route(
            "/orders/user/{user_id}",
            get(orders_by_user).fallback(method_not_allowed),
        )
        .route(
            "/orders/status/{status}",
            get(orders_by_status).fallback(method_not_allowed),
        )
        .route(
            "/orders/{id}",
            get(get_order)
                .put(update_order)
                .delete(delete_order)
                .fallback(method_not_allowed),
        );

    with_service_layers(routes, &state.service).with_state(state)
}

async fn home(State(state): State<OrdersState>) -> Json<Value> {
    let total = state.store.read().await.len();
    Json(json!({
        "service": state.service.as_str(),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Order management microservice",
        "total_orders": total,
        "depends_on": state.users_backend.base_url.as_str(),
        "endpoints": {
            "/": "Service information",
            "/health": "Health check",
            "/orders": "GET: list orders | POST: create order",
            "/orders/{id}": "GET: read | PUT: update | DELETE: remove",
            "/orders/user/{user_id}": "Orders of one user",
            "/orders/status/{status}": "Orders filtered by status",
        },
        "timestamp": timestamp(),
    }))
}

/// Always 200: a dependency outage degrades features, not this service.
async fn health(State(state): State<OrdersState>) -> Json<Value> {
    let report = aggregate_health(&state.probe, std::slice::from_ref(&state.users_backend)).await;
    let dependencies: Map<String, Value> = report
        .services
        .iter()
        .map(|(name, health)| (name.clone(), json!(health.status)))
        .collect();
    let count = state.store.read().await.len();

    Json(json!({
        "status": "healthy",
        "service": state.service.as_str(),
        "orders_count": count,
        "dependencies": dependencies,
        "timestamp": timestamp(),
    }))
}

async fn enrich_all(state: &OrdersState, orders: Vec<Order>) -> Vec<EnrichedOrder> {
    let users = state.users.lookup_many(orders.iter().map(|o| o.user_id)).await;
    orders
        .into_iter()
        .map(|order| {
            let user = users.get(&order.user_id).and_then(UserLookup::user);
            EnrichedOrder::new(order, user)
        })
        .collect()
}

async fn list_orders(State(state): State<OrdersState>) -> Json<Value> {
    let orders = state.store.read().await.list();
    let orders = enrich_all(&state, orders).await;
    Json(json!({
        "service": state.service.as_str(),
        "total_orders": orders.len(),
        "orders": orders,
        "timestamp": timestamp(),
    }))
}

async fn create_order(State(state): State<OrdersState>, body: Bytes) -> Result<Response, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let fields = json_object(&body, "user_id, items and total are required").map_err(fail)?;
    let new = NewOrder::from_json(&fields).map_err(fail)?;

    let user = match state.users.lookup(new.user_id).await {
        UserLookup::Found(user) => user,
        UserLookup::Missing => {
            return Err(fail(ServiceError::NotFound { what: "User", id: new.user_id }));
        }
        UserLookup::Unavailable(_) => {
            return Err(fail(ServiceError::DependencyUnavailable(
                "Users service unavailable".to_string(),
            )));
        }
    };

    let order = state.store.write().await.create(new);
    tracing::info!(order_id = order.id, user_id = order.user_id, "Order created");

    let body = json!({
        "service": state.service.as_str(),
        "message": "Order created successfully",
        "order": EnrichedOrder::new(order, Some(&user)),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn get_order(State(state): State<OrdersState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let id = parse_id(&id).map_err(fail)?;
    let order = state
        .store
        .read()
        .await
        .get(id)
        .cloned()
        .ok_or(ServiceError::NotFound { what: "Order", id })
        .map_err(fail)?;

    let lookup = state.users.lookup(order.user_id).await;
    Ok(Json(json!({
        "service": state.service.as_str(),
        "order": EnrichedOrder::new(order, lookup.user()),
        "timestamp": timestamp(),
    })))
}

async fn update_order(
    State(state): State<OrdersState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let id = parse_id(&id).map_err(fail)?;
    let mut store = state.store.write().await;
    if store.get(id).is_none() {
        return Err(fail(ServiceError::NotFound { what: "Order", id }));
    }
    let fields = json_object(&body, "Invalid data").map_err(fail)?;
    let update = OrderUpdate::from_json(&fields).map_err(fail)?;
    let order = store.update(id, update).map_err(fail)?;

    Ok(Json(json!({
        "service": state.service.as_str(),
        "message": "Order updated successfully",
        "order": order,
    })))
}

async fn delete_order(State(state): State<OrdersState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let id = parse_id(&id).map_err(fail)?;
    state
        .store
        .write()
        .await
        .delete(id)
        .ok_or(ServiceError::NotFound { what: "Order", id })
        .map_err(fail)?;

    tracing::info!(order_id = id, "Order deleted");
    Ok(Json(json!({
        "service": state.service.as_str(),
        "message": "Order removed successfully",
        "order_id": id,
    })))
}

async fn orders_by_user(
    State(state): State<OrdersState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let user_id = parse_id(&user_id).map_err(fail)?;
    let user = match state.users.lookup(user_id).await {
        UserLookup::Found(user) => user,
        UserLookup::Missing => return Err(fail(ServiceError::NotFound { what: "User", id: user_id })),
        UserLookup::Unavailable(_) => {
            return Err(fail(ServiceError::DependencyUnavailable(
                "Users service unavailable".to_string(),
            )));
        }
    };

    let orders: Vec<EnrichedOrder> = state
        .store
        .read()
        .await
        .by_user(user_id)
        .into_iter()
        .map(|order| EnrichedOrder::new(order, Some(&user)))
        .collect();
    let total_value: f64 = orders.iter().map(|o| o.order.total).sum();

    Ok(Json(json!({
        "service": state.service.as_str(),
        "user_id": user_id,
        "user_name": user.name,
        "total_orders": orders.len(),
        "total_value": total_value,
        "orders": orders,
        "timestamp": timestamp(),
    })))
}

async fn orders_by_status(State(state): State<OrdersState>, Path(status): Path<String>) -> Json<Value> {
    let orders = state.store.read().await.by_status(&status);
    let orders = enrich_all(&state, orders).await;
    Json(json!({
        "service": state.service.as_str(),
        "status_filter": status,
        "total_orders": orders.len(),
        "orders": orders,
        "timestamp": timestamp(),
    }))
}
