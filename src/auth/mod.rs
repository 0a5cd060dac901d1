// src/auth/mod.rs - Session state derived from the bearer token

//! The API issues a JWT on login. Only its payload is read here, for display
//! fields and expiry; the signature is never checked because every request is
//! authorised again by the server.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::api::{ApiClient, AuthResponse};
use crate::define_event;
use crate::error::Result;
use crate::event::{EventBus, Subject};
use crate::manager::{ManagedState, Manager, ManagerState, ManagerStatus};
use crate::platform::StorageArc;
use crate::types::UserId;
use crate::utils::Time;

pub mod guards;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub token: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Builds the session user from a stored token, `None` when the token is
    /// unreadable or its `exp` is not in the future
    pub fn from_token(token: &str, now_secs: i64) -> Option<Self> {
        let claims = decode_token(token)?;
        if claims.is_expired(now_secs) {
            return None;
        }
        Some(claims.into_user(token))
    }
}

impl From<AuthResponse> for User {
    fn from(response: AuthResponse) -> Self {
        Self {
            id: response.id,
            name: response.name,
            email: response.email,
            role: response.role,
            token: response.token,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub exp: Option<f64>,
}

impl TokenClaims {
    pub fn is_expired(&self, now_secs: i64) -> bool {
        matches!(self.exp, Some(exp) if (now_secs as f64) >= exp)
    }

    fn user_id(&self) -> UserId {
        match &self.sub {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        }
    }

    fn into_user(self, token: &str) -> User {
        let role = match self.role.as_deref() {
            Some("admin") => UserRole::Admin,
            _ => UserRole::User,
        };
        User {
            id: self.user_id(),
            name: self
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "you".to_string()),
            email: self
                .email
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "you@example.com".to_string()),
            role,
            token: token.to_string(),
        }
    }
}

/// Reads the payload segment of a JWT without verifying it
pub fn decode_token(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

define_event!(SessionChanged, "auth.session_changed", user_id: Option<UserId>, is_admin: bool);

/// Owns the logged-in user and the persisted token
pub struct SessionManager {
    state: ManagedState,
    api: ApiClient,
    storage: StorageArc,
    token_key: String,
    user: Subject<Option<User>>,
    event_bus: Option<Arc<EventBus>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("token_key", &self.token_key)
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

impl SessionManager {
    pub fn new(api: ApiClient, storage: StorageArc, token_key: impl Into<String>) -> Self {
        Self {
            state: ManagedState::new(Uuid::new_v4(), "session_manager"),
            api,
            storage,
            token_key: token_key.into(),
            user: Subject::new(None),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Loads the stored token; an expired or unreadable one is deleted
    pub async fn restore(&self) -> Result<Option<User>> {
        let Some(token) = self.storage.get(&self.token_key).await? else {
            return Ok(None);
        };

        match User::from_token(&token, Time::now().timestamp()) {
            Some(user) => {
                tracing::info!(user_id = user.id, role = ?user.role, "Session restored");
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            None => {
                tracing::info!("Discarding expired session token");
                self.storage.delete(&self.token_key).await?;
                self.set_user(None);
                Ok(None)
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let response = self.api.login(email, password).await?;
        self.persist(response).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let response = self.api.register(name, email, password).await?;
        self.persist(response).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.storage.delete(&self.token_key).await?;
        self.set_user(None);
        tracing::info!("Logged out");
        Ok(())
    }

    async fn persist(&self, response: AuthResponse) -> Result<User> {
        self.storage.set(&self.token_key, &response.token).await?;
        let user = User::from(response);
        tracing::info!(user_id = user.id, role = ?user.role, "Logged in");
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    fn set_user(&self, user: Option<User>) {
        self.api.set_token(user.as_ref().map(|u| u.token.clone()));
        let (user_id, is_admin) = match &user {
            Some(u) => (Some(u.id), u.is_admin()),
            None => (None, false),
        };
        self.user.set(user);

        if let Some(bus) = &self.event_bus {
            bus.publish(SessionChanged::new("session_manager", user_id, is_admin));
        }
    }

    pub fn user(&self) -> Option<User> {
        self.user.get()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.with(Option::is_some)
    }

    pub fn role(&self) -> Option<UserRole> {
        self.user.with(|u| u.as_ref().map(|u| u.role))
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Option<User>> {
        self.user.subscribe()
    }
}

#[async_trait]
impl Manager for SessionManager {
    fn name(&self) -> &str {
        self.state.name()
    }

    fn id(&self) -> Uuid {
        self.state.id()
    }

    async fn initialize(&self) -> Result<()> {
        self.state.set_state(ManagerState::Initializing).await;
        let result = self.restore().await.map(|_| ());
        self.state.finish_initialize(result).await
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.set_state(ManagerState::Shutdown).await;
        Ok(())
    }

    async fn status(&self) -> ManagerStatus {
        let mut status = self.state.status().await;
        let current_user = self
            .user()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| "none".to_string());
        status.add_metadata("current_user", Value::String(current_user));
        status.add_metadata("is_admin", Value::Bool(self.is_admin()));
        status
    }
}

#[cfg(test)]
pub(crate) fn make_token(claims: Value) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.signature",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::event::EventFilter;
    use crate::platform::{HttpMethod, MemoryNetwork, MemoryStorage, StorageProvider};
    use futures::StreamExt;
    use serde_json::json;

    const BASE: &str = "http://localhost:5000/api";

    fn session(network: Arc<MemoryNetwork>, storage: Arc<MemoryStorage>) -> SessionManager {
        let api = ApiClient::new(network, &ApiConfig::default());
        SessionManager::new(api, storage, "token")
    }

    #[test]
    fn test_decode_defaults() {
        let token = make_token(json!({}));
        let user = User::from_token(&token, 0).unwrap();
        assert_eq!(user.id, 0);
        assert_eq!(user.name, "you");
        assert_eq!(user.email, "you@example.com");
        assert_eq!(user.role, UserRole::User);
    }

    #[test]
    fn test_decode_claims_and_expiry() {
        let token = make_token(json!({
            "sub": 7, "name": "Meera", "email": "m@example.com", "role": "admin", "exp": 2000
        }));
        let user = User::from_token(&token, 1999).unwrap();
        assert_eq!(user.id, 7);
        assert!(user.is_admin());

        assert!(User::from_token(&token, 2000).is_none());
        assert!(User::from_token("not-a-jwt", 0).is_none());
        assert!(User::from_token("a.%%%.c", 0).is_none());
    }

    #[tokio::test]
    async fn test_restore_discards_expired_token() {
        let expired = make_token(json!({"sub": 1, "exp": 1}));
        let storage = Arc::new(MemoryStorage::with_entry("token", &expired));
        let manager = session(Arc::new(MemoryNetwork::new(BASE)), storage.clone());

        assert!(manager.restore().await.unwrap().is_none());
        assert!(!storage.contains("token"));
        assert!(!manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_restore_valid_token() {
        let token = make_token(json!({"sub": "12", "role": "admin"}));
        let storage = Arc::new(MemoryStorage::with_entry("token", &token));
        let manager = session(Arc::new(MemoryNetwork::new(BASE)), storage);

        manager.initialize().await.unwrap();
        assert_eq!(manager.user().unwrap().id, 12);
        assert!(manager.is_admin());
        assert_eq!(manager.health_check().await, crate::manager::HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_login_persists_and_logout_clears() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(
            HttpMethod::Post,
            "/auth/login",
            200,
            json!({"id": 5, "name": "Kiran", "email": "k@example.com", "role": "user", "token": "t.e.k"}),
        );
        network.respond_json(HttpMethod::Get, "/orders", 200, json!([]));
        let storage = Arc::new(MemoryStorage::new());
        let bus = Arc::new(EventBus::new());
        let (_, mut events) = bus.subscribe(EventFilter::new().with_event_type("auth.session_changed"));

        let api = ApiClient::new(network.clone(), &ApiConfig::default());
        let manager = SessionManager::new(api.clone(), storage.clone(), "token")
            .with_event_bus(bus.clone());

        let user = manager.login("k@example.com", "pw").await.unwrap();
        assert_eq!(user.name, "Kiran");
        assert!(!manager.is_admin());
        assert_eq!(storage.get("token").await.unwrap().as_deref(), Some("t.e.k"));

        api.my_orders().await.unwrap();
        let last = network.requests().pop().unwrap();
        assert_eq!(last.headers["Authorization"], "Bearer t.e.k");

        manager.logout().await.unwrap();
        assert!(manager.user().is_none());
        assert!(api.token().is_none());
        assert!(!storage.contains("token"));

        let first = events.next().await.unwrap();
        let changed = first.as_any().downcast_ref::<SessionChanged>().unwrap();
        assert_eq!(changed.user_id, Some(5));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_state() {
        let network = Arc::new(MemoryNetwork::new(BASE));
        network.respond_json(HttpMethod::Post, "/auth/login", 401, json!({"message": "bad"}));
        let manager = session(network, Arc::new(MemoryStorage::new()));

        assert!(manager.login("x@y.z", "no").await.is_err());
        assert!(!manager.is_logged_in());
    }
}
