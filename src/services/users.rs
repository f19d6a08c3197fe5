//! Users service.
//!
//! # Responsibilities
//! - CRUD over an in-memory user store
//! - Case-insensitive search on name or email
//! - Health endpoint reporting the user count
//!
//! # Design Decisions
//! - Email addresses are unique across users
//! - New users default to the `customer` role

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use crate::http::response::timestamp;
use crate::services::{
    json_object, method_not_allowed, parse_id, today, with_service_layers, ApiError, ServiceError,
    ServiceName,
};

/// A stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

/// Fields accepted when creating a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Option<String>,
}

/// Fields accepted when updating a user; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl NewUser {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ServiceError> {
        let required = || ServiceError::BadRequest("Name and email are required".to_string());
        Ok(Self {
            name: string_field(body, "name")?.ok_or_else(required)?,
            email: string_field(body, "email")?.ok_or_else(required)?,
            role: string_field(body, "role")?,
        })
    }
}

impl UserUpdate {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ServiceError> {
        Ok(Self {
            name: string_field(body, "name")?,
            email: string_field(body, "email")?,
            role: string_field(body, "role")?,
        })
    }
}

fn string_field(body: &Map<String, Value>, key: &str) -> Result<Option<String>, ServiceError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ServiceError::BadRequest(format!("Field '{}' must be a string", key))),
    }
}

/// In-memory user store.
#[derive(Debug)]
pub struct UserStore {
    users: BTreeMap<u64, User>,
    next_id: u64,
}

impl Default for UserStore {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl UserStore {
    /// Store pre-filled with sample users.
    pub fn seeded() -> Self {
        let mut store = Self::default();
        for (name, email, role, created_at) in [
            ("Ana Silva", "ana.silva@example.com", "admin", "2023-01-10"),
            ("Bruno Costa", "bruno.costa@example.com", "customer", "2023-02-15"),
            ("Carla Mendes", "carla.mendes@example.com", "customer", "2023-03-20"),
        ] {
            let id = store.next_id;
            store.users.insert(
                id,
                User {
                    id,
                    name: name.to_string(),
                    email: email.to_string(),
                    role: role.to_string(),
                    created_at: created_at.to_string(),
                },
            );
            store.next_id += 1;
        }
        store
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn list(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }

    pub fn get(&self, id: u64) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn create(&mut self, new: NewUser) -> Result<User, ServiceError> {
        if self.email_taken(&new.email, None) {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let user = User {
            id: self.next_id,
            name: new.name,
            email: new.email,
            role: new.role.unwrap_or_else(|| "customer".to_string()),
            created_at: today(),
        };
        self.users.insert(user.id, user.clone());
        self.next_id += 1;
        Ok(user)
    }

    pub fn update(&mut self, id: u64, update: UserUpdate) -> Result<User, ServiceError> {
        if !self.users.contains_key(&id) {
            return Err(ServiceError::NotFound { what: "User", id });
        }
        if let Some(email) = &update.email {
            if self.email_taken(email, Some(id)) {
                return Err(ServiceError::Conflict("Email already registered".to_string()));
            }
        }

        let user = self
            .users
            .get_mut(&id)
            .ok_or(ServiceError::NotFound { what: "User", id })?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        Ok(user.clone())
    }

    pub fn delete(&mut self, id: u64) -> Option<User> {
        self.users.remove(&id)
    }

    /// Users whose name or email contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<User> {
        let needle = query.to_lowercase();
        self.users
            .values()
            .filter(|u| u.name.to_lowercase().contains(&needle) || u.email.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Handler state for the users service.
#[derive(Clone)]
pub struct UsersState {
    pub service: ServiceName,
    pub store: Arc<RwLock<UserStore>>,
}

impl UsersState {
    pub fn new(service_name: &str, store: UserStore) -> Self {
        Self {
            service: ServiceName::new(service_name),
            store: Arc::new(RwLock::new(store)),
        }
    }
}

impl FromRef<UsersState> for ServiceName {
    fn from_ref(state: &UsersState) -> Self {
        state.service.clone()
    }
}

/// Build the users service router.
pub fn router(state: UsersState) -> Router {
    let routes = Router::new()
        .route("/", get(home).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route(
            "/users",
            get(list_users).post(create_user).fallback(method_not_allowed),
        )
        .route(
            "/users/search/{query}",
            get(search_users).fallback(method_not_allowed),
        )
        .route(
            "/users/{id}",
            get(get_user)
                .put(update_user)
                .delete(delete_user)
                .fallback(method_not_allowed),
        );

    with_service_layers(routes, &state.service).with_state(state)
}

async fn home(State(state): State<UsersState>) -> Json<Value> {
    let total = state.store.read().await.len();
    Json(json!({
        "service": state.service.as_str(),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "User management microservice",
        "total_users": total,
        "endpoints": {
            "/": "Service information",
            "/health": "Health check",
            "/users": "GET: list users | POST: create user",
            "/users/{id}": "GET: read | PUT: update | DELETE: remove",
            "/users/search/{query}": "Search users by name or email",
        },
        "timestamp": timestamp(),
    }))
}

async fn health(State(state): State<UsersState>) -> Json<Value> {
    let count = state.store.read().await.len();
    Json(json!({
        "status": "healthy",
        "service": state.service.as_str(),
        "users_count": count,
        "timestamp": timestamp(),
    }))
}

async fn list_users(State(state): State<UsersState>) -> Json<Value> {
    let users = state.store.read().await.list();
    Json(json!({
        "service": state.service.as_str(),
        "total_users": users.len(),
        "users": users,
        "timestamp": timestamp(),
    }))
}

async fn create_user(State(state): State<UsersState>, body: Bytes) -> Result<Response, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let fields = json_object(&body, "Name and email are required").map_err(fail)?;
    let new = NewUser::from_json(&fields).map_err(fail)?;
    let user = state.store.write().await.create(new).map_err(fail)?;

    tracing::info!(user_id = user.id, "User created");
    let body = json!({
        "service": state.service.as_str(),
        "message": "User created successfully",
        "user": user,
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn get_user(State(state): State<UsersState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let id = parse_id(&id).map_err(fail)?;
    let store = state.store.read().await;
    let user = store
        .get(id)
        .ok_or(ServiceError::NotFound { what: "User", id })
        .map_err(fail)?;

    Ok(Json(json!({
        "service": state.service.as_str(),
        "user": user,
        "timestamp": timestamp(),
    })))
}

async fn update_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let id = parse_id(&id).map_err(fail)?;
    let mut store = state.store.write().await;
    if store.get(id).is_none() {
        return Err(fail(ServiceError::NotFound { what: "User", id }));
    }
    let fields = json_object(&body, "Invalid data").map_err(fail)?;
    let update = UserUpdate::from_json(&fields).map_err(fail)?;
    let user = store.update(id, update).map_err(fail)?;

    Ok(Json(json!({
        "service": state.service.as_str(),
        "message": "User updated successfully",
        "user": user,
    })))
}

async fn delete_user(State(state): State<UsersState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let fail = |e: ServiceError| e.by(&state.service);

    let id = parse_id(&id).map_err(fail)?;
    state
        .store
        .write()
        .await
        .delete(id)
        .ok_or(ServiceError::NotFound { what: "User", id })
        .map_err(fail)?;

    tracing::info!(user_id = id, "User deleted");
    Ok(Json(json!({
        "service": state.service.as_str(),
        "message": "User removed successfully",
        "user_id": id,
    })))
}

async fn search_users(State(state): State<UsersState>, Path(query): Path<String>) -> Json<Value> {
    let results = state.store.read().await.search(&query);
    Json(json!({
        "service": state.service.as_str(),
        "query": query,
        "total_results": results.len(),
        "users": results,
        "timestamp": timestamp(),
    }))
}
