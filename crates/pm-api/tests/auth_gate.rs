//! End-to-end HTTP behaviour of the auth endpoints and both gates, driven
//! through the router with in-memory stores.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use pm_api::{router, AppState, AuthGate};
use pm_core::error::DomainError;
use pm_core::repositories::{SessionRepository, UserRepository};
use pm_core::{AuthService, NewUser, Session, SessionAuthority, StoreError, User, VolatileSessionStore};
use pm_security::{IdentityClaims, TokenCodec};
use pm_shared::config::AppConfig;
use pm_shared::constants::ERROR_CODE_HEADER;
use pm_shared::Role;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const PASSWORD: &str = "Plum-Orchard-Tenancy-77";

// ----------------------------------------------------------------------------
// In-memory stores
// ----------------------------------------------------------------------------

#[derive(Default)]
struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        Ok(self.rows.lock().iter().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: &NewUser) -> Result<User, DomainError> {
        let mut rows = self.rows.lock();
        let created = User {
            id: rows.len() as i64 + 1,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            hashed_password: user.hashed_password.clone(),
            is_active: true,
            created_at: Utc::now(),
        };
        rows.push(created.clone());
        Ok(created)
    }
}

struct InMemorySessions {
    rows: Mutex<HashMap<String, Session>>,
    reachable: AtomicBool,
    explode: AtomicBool,
}

impl InMemorySessions {
    fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            explode: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.explode.load(Ordering::SeqCst) {
            panic!("session store driver bug");
        }
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessions {
    async fn create(&self, session_id: &str, user_id: i64) -> Result<(), StoreError> {
        self.check()?;
        self.rows.lock().insert(
            session_id.to_string(),
            Session::new(session_id.to_string(), user_id, Utc::now(), Duration::minutes(30)),
        );
        Ok(())
    }

    async fn is_active(&self, session_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        let now = Utc::now();
        Ok(self
            .rows
            .lock()
            .get(session_id)
            .map(|s| s.is_active_at(now))
            .unwrap_or(false))
    }

    async fn touch(&self, session_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        let now = Utc::now();
        Ok(self
            .rows
            .lock()
            .get_mut(session_id)
            .map(|s| s.touch(now, Duration::minutes(30)))
            .unwrap_or(false))
    }

    async fn revoke(&self, session_id: &str) -> Result<(), StoreError> {
        self.check()?;
        if let Some(s) = self.rows.lock().get_mut(session_id) {
            s.revoke(Utc::now());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------------

struct TestApp {
    router: Router,
    sessions: Arc<InMemorySessions>,
    tokens: Arc<TokenCodec>,
}

fn app(bypass: bool) -> TestApp {
    let config: AppConfig = AppConfig::defaults()
        .unwrap()
        .set_override("jwt.secret", SECRET)
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    let sessions = Arc::new(InMemorySessions::new());
    let authority = Arc::new(SessionAuthority::new(
        sessions.clone(),
        Arc::new(VolatileSessionStore::new()),
        bypass,
    ));
    let tokens = Arc::new(TokenCodec::from_settings(&config.jwt).unwrap());
    let auth = Arc::new(AuthService::new(
        Arc::new(InMemoryUsers::default()),
        authority.clone(),
        tokens.clone(),
        config.jwt.access_token_ttl(),
    ));

    let state = AppState {
        config: Arc::new(config),
        auth,
        gate: AuthGate::new(tokens.clone(), authority),
    };
    TestApp {
        router: router(state),
        sessions,
        tokens,
    }
}

impl TestApp {
    async fn call(&self, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let code = response
            .headers()
            .get(ERROR_CODE_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, code, body)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Option<String>, Value) {
        self.call(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn get_with(&self, uri: &str, authorization: Option<&str>) -> (StatusCode, Option<String>, Value) {
        let mut request = Request::get(uri);
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        self.call(request.body(Body::empty()).unwrap()).await
    }

    async fn me(&self, token: &str) -> (StatusCode, Option<String>, Value) {
        self.get_with("/api/v1/auth/me", Some(&format!("Bearer {}", token))).await
    }

    async fn register(&self, email: &str, username: &str, role: &str) -> (StatusCode, Option<String>, Value) {
        self.post(
            "/api/v1/auth/register",
            json!({
                "email": email,
                "username": username,
                "full_name": "Test Person",
                "password": PASSWORD,
                "role": role,
            }),
        )
        .await
    }

    /// Registers and logs in; returns (token, session id, user id).
    async fn signed_in(&self, email: &str, role: &str) -> (String, String, i64) {
        let username = email.split('@').next().unwrap();
        let (status, _, _) = self.register(email, username, role).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _, body) = self
            .post("/api/v1/auth/login", json!({"email": email, "password": PASSWORD}))
            .await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        (
            data["access_token"].as_str().unwrap().to_string(),
            data["session_id"].as_str().unwrap().to_string(),
            data["user"]["id"].as_i64().unwrap(),
        )
    }

    fn mint(&self, session_id: &str, ttl: Duration) -> String {
        self.tokens
            .mint(
                &IdentityClaims {
                    subject: "ghost@example.com".into(),
                    user_id: 404,
                    role: Role::Owner,
                    session_id: session_id.into(),
                },
                Some(ttl),
            )
            .unwrap()
    }
}

// ----------------------------------------------------------------------------
// Login / me / logout
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_login_then_me_resolves_issued_identity() {
    let app = app(false);
    let (token, sid, user_id) = app.signed_in("olive@example.com", "owner").await;

    let (status, _, body) = app.me(&token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"], user_id);
    assert_eq!(body["data"]["role"], "owner");
    assert_eq!(body["data"]["session_id"], sid.as_str());
    assert_eq!(body["data"]["email"], "olive@example.com");
}

#[tokio::test]
async fn test_login_response_shape() {
    let app = app(false);
    app.register("rita@example.com", "rita", "renter").await;

    let (_, _, body) = app
        .post("/api/v1/auth/login", json!({"email": "RITA@example.com", "password": PASSWORD}))
        .await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["session_id"].as_str().unwrap().len(), 64);
    assert!(body["data"]["user"].get("hashed_password").is_none());
}

#[tokio::test]
async fn test_logout_then_token_is_session_expired() {
    let app = app(false);
    let (token, sid, _) = app.signed_in("olive@example.com", "owner").await;

    let (status, _, body) = app
        .call(
            Request::post("/api/v1/auth/logout")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Logged out");
    assert_eq!(body["data"]["session_id"], sid.as_str());

    // Token is still signed and unexpired; only the session is gone.
    assert!(app.tokens.decode(&token).is_ok());
    let (status, code, body) = app.me(&token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code.as_deref(), Some("SESSION_EXPIRED"));
    assert_eq!(body["error"]["code"], "SESSION_EXPIRED");
}

#[tokio::test]
async fn test_login_unknown_email() {
    let app = app(false);
    let (status, code, _) = app
        .post("/api/v1/auth/login", json!({"email": "nobody@example.com", "password": "x"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(code.as_deref(), Some("EMAIL_NOT_FOUND"));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = app(false);
    app.register("olive@example.com", "olive", "owner").await;

    let (status, code, _) = app
        .post("/api/v1/auth/login", json!({"email": "olive@example.com", "password": "nope"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code.as_deref(), Some("INVALID_PASSWORD"));
}

// ----------------------------------------------------------------------------
// Registration
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_register_rejections() {
    let app = app(false);
    let (status, _, body) = app.register("olive@example.com", "olive", "owner").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "owner");

    let (status, code, _) = app.register("OLIVE@example.com", "olive2", "owner").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code.as_deref(), Some("EMAIL_EXISTS"));

    let (status, code, _) = app.register("other@example.com", "olive", "owner").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code.as_deref(), Some("USERNAME_EXISTS"));

    let (status, code, _) = app.register("x@example.com", "xavier", "landlord").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(code.as_deref(), Some("VALIDATION_ERROR"));

    let (status, code, _) = app
        .post(
            "/api/v1/auth/register",
            json!({"email": "w@example.com", "username": "weak", "full_name": "W", "password": "password", "role": "renter"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(code.as_deref(), Some("WEAK_PASSWORD"));
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let app = app(false);
    let (status, code, _) = app
        .call(
            Request::post("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(code.as_deref(), Some("VALIDATION_ERROR"));
}

// ----------------------------------------------------------------------------
// Authentication Gate
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_header_envelope_errors() {
    let app = app(false);
    let cases = [
        (None, "NOT_AUTHENTICATED"),
        (Some("Basic b2xpdmU6cHc="), "INVALID_AUTH_SCHEME"),
        (Some("Bearer"), "INVALID_AUTH_FORMAT"),
        (Some("Bearer not-a-jwt"), "INVALID_TOKEN"),
    ];
    for (authorization, expected) in cases {
        let (status, code, body) = app.get_with("/api/v1/auth/me", authorization).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", expected);
        assert_eq!(code.as_deref(), Some(expected));
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_expired_token_is_distinct_from_invalid() {
    let app = app(false);
    let (_, sid, _) = app.signed_in("olive@example.com", "owner").await;

    let expired = app.mint(&sid, Duration::minutes(-1));
    let (_, code, _) = app.me(&expired).await;
    assert_eq!(code.as_deref(), Some("TOKEN_EXPIRED"));

    let forged = TokenCodec::new("ffffffffffffffffffffffffffffffff", "HS256")
        .unwrap()
        .mint(
            &IdentityClaims {
                subject: "olive@example.com".into(),
                user_id: 1,
                role: Role::Owner,
                session_id: sid,
            },
            None,
        )
        .unwrap();
    let (_, code, _) = app.me(&forged).await;
    assert_eq!(code.as_deref(), Some("INVALID_TOKEN"));
}

#[tokio::test]
async fn test_durable_outage_uses_fallback() {
    let app = app(false);
    let (token, _, _) = app.signed_in("olive@example.com", "owner").await;

    app.sessions.reachable.store(false, Ordering::SeqCst);

    let (status, _, _) = app.me(&token).await;
    assert_eq!(status, StatusCode::OK);

    let stranger = app.mint("started-in-another-process", Duration::minutes(5));
    let (status, code, _) = app.me(&stranger).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code.as_deref(), Some("SESSION_EXPIRED"));
}

#[tokio::test]
async fn test_bypass_accepts_session_that_never_existed() {
    let app = app(true);
    let token = app.mint("never-created", Duration::minutes(5));

    let (status, _, body) = app.me(&token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["session_id"], "never-created");
}

#[tokio::test]
async fn test_bypass_still_checks_token_expiry() {
    let app = app(true);
    let token = app.mint("never-created", Duration::minutes(-1));
    let (_, code, _) = app.me(&token).await;
    assert_eq!(code.as_deref(), Some("TOKEN_EXPIRED"));
}

#[tokio::test]
async fn test_internal_panic_is_auth_failed() {
    let app = app(false);
    let (token, _, _) = app.signed_in("olive@example.com", "owner").await;

    app.sessions.explode.store(true, Ordering::SeqCst);

    let (status, code, body) = app.me(&token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code.as_deref(), Some("AUTH_FAILED"));
    assert!(!body["error"]["message"].as_str().unwrap().contains("driver"));
}

// ----------------------------------------------------------------------------
// Authorization Gate
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_role_gates() {
    let app = app(false);
    let (owner, _, _) = app.signed_in("olive@example.com", "owner").await;
    let (renter, _, _) = app.signed_in("rita@example.com", "renter").await;
    let bearer = |t: &str| format!("Bearer {}", t);

    let (status, _, body) = app.get_with("/api/v1/owner/ping", Some(&bearer(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "owner");

    let (status, code, _) = app.get_with("/api/v1/owner/ping", Some(&bearer(&renter))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code.as_deref(), Some("INSUFFICIENT_PERMISSIONS"));

    let (status, _, _) = app.get_with("/api/v1/renter/ping", Some(&bearer(&renter))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, code, _) = app.get_with("/api/v1/renter/ping", Some(&bearer(&owner))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code.as_deref(), Some("INSUFFICIENT_PERMISSIONS"));
}

#[tokio::test]
async fn test_role_gate_authenticates_first() {
    let app = app(false);
    let (status, code, _) = app.get_with("/api/v1/owner/ping", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code.as_deref(), Some("NOT_AUTHENTICATED"));
}

#[tokio::test]
async fn test_health() {
    let app = app(false);
    let (status, _, body) = app.get_with("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "pm-server");
}
