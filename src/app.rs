// src/app.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::jwt::JwtManager;
use crate::auth::lockout::LockoutPolicy;
use crate::auth::password::PasswordManager;
use crate::auth::rate_limit::{RateLimiter, limit_by_ip};
use crate::auth::services::AuthService;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::Store;
use crate::error::AppError;
use crate::handlers::{approvals, auth, health, notifications, timesheets, users};
use crate::timesheets::notifications::Notifier;
use crate::timesheets::services::TimesheetService;

/// Services partagés par tous les handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub timesheets: Arc<TimesheetService>,
    pub notifier: Arc<Notifier>,
    pub rate_limiter: Arc<RateLimiter>,
    pub trusted_proxies: usize,
}

impl AppState {
    pub fn new(config: &Config, store: Store, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let jwt_manager = JwtManager::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            config.jwt_expiration_minutes,
        );
        let lockout = LockoutPolicy::new(
            config.lockout_max_attempts,
            chrono::Duration::minutes(config.lockout_duration_minutes),
        );
        let auth = AuthService::new(
            store.clone(),
            jwt_manager,
            PasswordManager::new(config.bcrypt_cost),
            lockout,
            clock.clone(),
            chrono::Duration::minutes(config.password_reset_ttl_minutes),
        )?;

        let notifier = Arc::new(Notifier::new(store.clone()));
        let timesheets = TimesheetService::new(store, notifier.clone(), clock);

        Ok(Self {
            auth: Arc::new(auth),
            timesheets: Arc::new(timesheets),
            notifier,
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_limit_max_requests,
                config.rate_limit_window_seconds,
            )),
            trusted_proxies: config.trusted_proxies,
        })
    }
}

/// Routes publiques d'authentification; login et réinitialisation passent par le rate limiter.
fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route(
            "/auth/login",
            post(auth::login).layer(middleware::from_fn_with_state(state.clone(), limit_by_ip)),
        )
        .route(
            "/auth/password-reset/request",
            post(auth::request_password_reset)
                .layer(middleware::from_fn_with_state(state.clone(), limit_by_ip)),
        )
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset)
                .layer(middleware::from_fn_with_state(state.clone(), limit_by_ip)),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(users::me))
        .route("/users/me/change-password", post(users::change_password))
        .route("/users/me/login-history", get(users::login_history))
}

fn timesheet_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/timesheets",
            get(timesheets::for_week).post(timesheets::save_draft),
        )
        .route("/timesheets/history", get(timesheets::history))
        .route(
            "/timesheets/{id}",
            get(timesheets::get).delete(timesheets::delete_draft),
        )
        .route("/timesheets/{id}/audit", get(timesheets::audit_trail))
        .route("/timesheets/{id}/submit", post(timesheets::submit))
        .route("/timesheets/{id}/approve", post(timesheets::approve))
        .route("/timesheets/{id}/reject", post(timesheets::reject))
        .route("/approvals/pending", get(approvals::pending))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(%frontend_url, "FRONTEND_URL is not a valid origin, CORS disabled");
            cors
        }
    }
}

/// Construit l'application complète
pub fn build_router(state: AppState, frontend_url: &str) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .merge(auth_routes(&state))
        .merge(user_routes())
        .merge(timesheet_routes())
        .with_state(state)
        .layer(cors_layer(frontend_url))
        // Middleware global de tracing
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, Response, StatusCode};
    use std::net::SocketAddr;
    use lambda_http::tower::ServiceExt; // for oneshot
    use serde_json::{Value, json};

    fn app_with(config: &Config) -> Router {
        let state = AppState::new(config, Store::in_memory(), Arc::new(SystemClock)).unwrap();
        build_router(state, &config.frontend_url)
    }

    fn app() -> Router {
        app_with(&Config::for_tests())
    }

    fn peer(ip: [u8; 4]) -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from((ip, 50_000)))
    }

    fn login_request(from: [u8; 4], forwarded_for: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .extension(peer(from))
            .header("Content-Type", "application/json");
        if let Some(hops) = forwarded_for {
            builder = builder.header("x-forwarded-for", hops);
        }
        builder
            .body(Body::from(
                json!({ "identifier": "ghost", "password": "Password123" }).to_string(),
            ))
            .unwrap()
    }

    async fn call(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .extension(peer([203, 0, 113, 9]));
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = call(app, request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(app: &Router, name: &str, manager_id: Option<&str>) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": format!("{name}@example.com"),
                "username": name,
                "password": "Password123",
                "manager_id": manager_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn login(app: &Router, identifier: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "identifier": identifier, "password": password })),
        )
        .await
    }

    async fn token(app: &Router, identifier: &str) -> String {
        let (status, body) = login(app, identifier, "Password123").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    fn week(sheet_hours: f64) -> Value {
        json!({
            "week_start": "2025-01-06",
            "entries": [
                { "project": "Portal", "task": "API", "date": "2025-01-06", "hours": sheet_hours },
                { "project": "Portal", "task": "Review", "date": "2025-01-07", "hours": 8 }
            ]
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = send(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn login_returns_bearer_token() {
        let app = app();
        register(&app, "alice", None).await;

        let (status, body) = login(&app, "ALICE@example.com", "Password123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 3600);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn wrong_password_is_401() {
        let app = app();
        register(&app, "alice", None).await;

        let (status, body) = login(&app, "alice", "Password124").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "INVALID_CREDENTIALS");

        let (status, _) = login(&app, "nobody", "Password123").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn repeated_failures_lock_the_account() {
        let app = app();
        register(&app, "alice", None).await;

        for _ in 0..5 {
            let (status, _) = login(&app, "alice", "wrong-password").await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("Content-Type", "application/json")
            .body(Body::from(
                json!({ "identifier": "alice", "password": "Password123" }).to_string(),
            ))
            .unwrap();
        let response = call(&app, request).await;
        assert_eq!(response.status(), StatusCode::LOCKED);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn login_is_rate_limited_per_ip() {
        let config = Config {
            rate_limit_max_requests: 2,
            ..Config::for_tests()
        };
        let app = app_with(&config);

        for _ in 0..2 {
            let (status, _) = login(&app, "ghost", "Password123").await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let response = call(&app, login_request([203, 0, 113, 9], None)).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        // another client is not affected
        let response = call(&app, login_request([198, 51, 100, 4], None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rotating_forwarded_for_does_not_escape_the_limit() {
        let config = Config {
            rate_limit_max_requests: 3,
            ..Config::for_tests()
        };
        let app = app_with(&config);

        let mut throttled = 0;
        for n in 0..10 {
            let hops = format!("198.51.100.{n}");
            let response = call(&app, login_request([203, 0, 113, 9], Some(&hops))).await;
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                throttled += 1;
            }
        }
        assert_eq!(throttled, 7);
    }

    #[tokio::test]
    async fn trusted_proxy_hop_identifies_the_client() {
        let config = Config {
            rate_limit_max_requests: 1,
            trusted_proxies: 1,
            ..Config::for_tests()
        };
        let app = app_with(&config);
        let proxy = [10, 0, 0, 1];

        // a spoofed left-hand entry does not change the key
        let first = call(&app, login_request(proxy, Some("1.1.1.1, 203.0.113.9"))).await;
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
        let spoofed = call(&app, login_request(proxy, Some("2.2.2.2, 203.0.113.9"))).await;
        assert_eq!(spoofed.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = call(&app, login_request(proxy, Some("198.51.100.4"))).await;
        assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn password_reset_request_does_not_reveal_accounts() {
        let app = app();
        register(&app, "alice", None).await;

        let (known_status, known_body) = send(
            &app,
            "POST",
            "/auth/password-reset/request",
            None,
            Some(json!({ "email": "alice@example.com" })),
        )
        .await;
        let (unknown_status, unknown_body) = send(
            &app,
            "POST",
            "/auth/password-reset/request",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;

        assert_eq!(known_status, StatusCode::ACCEPTED);
        assert_eq!(unknown_status, StatusCode::ACCEPTED);
        assert_eq!(known_body, unknown_body);
    }

    #[tokio::test]
    async fn password_reset_confirm_rejects_bad_tokens() {
        let app = app();
        let forged = format!("{}.secret", uuid::Uuid::new_v4().simple());

        let (status, body) = send(
            &app,
            "POST",
            "/auth/password-reset/confirm",
            None,
            Some(json!({ "token": forged, "new_password": "Recovered123" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field_errors"][0]["field"], "token");
    }

    #[tokio::test]
    async fn overlong_registration_fields_are_400() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": format!("{}@example.com", "a".repeat(300)),
                "username": "alice",
                "password": "Password123"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field_errors"][0]["field"], "email");
    }

    #[tokio::test]
    async fn malformed_login_body_is_400() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(call(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_registration_is_409() {
        let app = app();
        register(&app, "alice", None).await;

        let (status, _) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": "alice@example.com",
                "username": "alice2",
                "password": "Password123"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = app();

        let (status, _) = send(&app, "GET", "/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/timesheets/history", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_and_login_history() {
        let app = app();
        let id = register(&app, "alice", None).await;
        login(&app, "alice", "bad-password").await;
        let token = token(&app, "alice").await;

        let (status, body) = send(&app, "GET", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());
        assert!(body.get("password_hash").is_none());

        let (status, body) =
            send(&app, "GET", "/users/me/login-history", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let outcomes: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["success"].as_bool().unwrap())
            .collect();
        assert_eq!(outcomes, [true, false]);
        assert_eq!(body[0]["source_ip"], "203.0.113.9");
    }

    #[tokio::test]
    async fn submit_approve_flow() {
        let app = app();
        let manager_id = register(&app, "manager", None).await;
        register(&app, "employee", Some(&manager_id)).await;
        let employee = token(&app, "employee").await;
        let manager = token(&app, "manager").await;

        let (status, sheet) =
            send(&app, "POST", "/timesheets", Some(&employee), Some(week(8.0))).await;
        assert_eq!(status, StatusCode::OK, "{sheet}");
        assert_eq!(sheet["status"], "draft");
        assert_eq!(sheet["total_hours"], 16.0);
        let id = sheet["id"].as_str().unwrap().to_string();

        let (status, found) = send(
            &app,
            "GET",
            "/timesheets?week_start=2025-01-06",
            Some(&employee),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["id"], id.as_str());

        let (status, sheet) = send(
            &app,
            "POST",
            &format!("/timesheets/{id}/submit"),
            Some(&employee),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sheet["status"], "submitted");
        assert_eq!(sheet["approver_id"], manager_id.as_str());

        let (_, pending) = send(&app, "GET", "/approvals/pending", Some(&manager), None).await;
        assert_eq!(pending[0]["id"], id.as_str());

        // the owner cannot approve their own timesheet
        let (status, _) = send(
            &app,
            "POST",
            &format!("/timesheets/{id}/approve"),
            Some(&employee),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, sheet) = send(
            &app,
            "POST",
            &format!("/timesheets/{id}/approve"),
            Some(&manager),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sheet["status"], "approved");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/timesheets/{id}/approve"),
            Some(&manager),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, trail) = send(
            &app,
            "GET",
            &format!("/timesheets/{id}/audit"),
            Some(&employee),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trail.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rejection_notifies_owner() {
        let app = app();
        let manager_id = register(&app, "manager", None).await;
        register(&app, "employee", Some(&manager_id)).await;
        let employee = token(&app, "employee").await;
        let manager = token(&app, "manager").await;

        let (_, sheet) = send(&app, "POST", "/timesheets", Some(&employee), Some(week(8.0))).await;
        let id = sheet["id"].as_str().unwrap().to_string();
        send(
            &app,
            "POST",
            &format!("/timesheets/{id}/submit"),
            Some(&employee),
            None,
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/timesheets/{id}/reject"),
            Some(&manager),
            Some(json!({ "reason": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field_errors"][0]["field"], "reason");

        let (status, sheet) = send(
            &app,
            "POST",
            &format!("/timesheets/{id}/reject"),
            Some(&manager),
            Some(json!({ "reason": "Missing Friday" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sheet["status"], "rejected");

        let (_, inbox) = send(&app, "GET", "/notifications", Some(&employee), None).await;
        assert_eq!(
            inbox[0]["message"],
            "Your timesheet for week 2025-01-06 to 2025-01-12 has been rejected. Reason: Missing Friday"
        );
        let notification_id = inbox[0]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/notifications/{notification_id}/read"),
            Some(&manager),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/notifications/{notification_id}/read"),
            Some(&employee),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn invalid_entries_come_back_as_field_errors() {
        let app = app();
        register(&app, "alice", None).await;
        let token = token(&app, "alice").await;

        let (status, body) =
            send(&app, "POST", "/timesheets", Some(&token), Some(week(24.5))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field_errors"][0]["field"], "entries[0].hours");
    }

    #[tokio::test]
    async fn draft_delete_and_bad_path() {
        let app = app();
        register(&app, "alice", None).await;
        let token = token(&app, "alice").await;

        let (_, sheet) = send(&app, "POST", "/timesheets", Some(&token), Some(week(8.0))).await;
        let id = sheet["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "DELETE", &format!("/timesheets/{id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/timesheets/{id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/timesheets/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
