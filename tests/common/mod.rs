// In-process mock of the EduPulse REST API used by the integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use edupulse_guard::{ApiClient, ClientConfig, SessionManager};

#[derive(Debug, Clone)]
pub enum RefreshMode {
    Issue(Value),
    Reject,
}

pub struct MockApi {
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub authorized_hits: AtomicUsize,
    pub refresh_mode: Mutex<RefreshMode>,
    /// Token accepted by the protected endpoints
    pub valid_token: Mutex<String>,
    /// Holds rejected requests until this many have arrived
    pub unauthorized_barrier: Option<Barrier>,
    /// Delay before a rejected request is answered
    pub unauthorized_delay: Duration,
    pub refresh_delay: Duration,
    /// Refresh only succeeds when the login cookie comes back
    pub require_refresh_cookie: bool,
}

impl MockApi {
    pub fn new(valid_token: &str, refresh_mode: RefreshMode) -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            authorized_hits: AtomicUsize::new(0),
            refresh_mode: Mutex::new(refresh_mode),
            valid_token: Mutex::new(valid_token.to_string()),
            unauthorized_barrier: None,
            unauthorized_delay: Duration::ZERO,
            refresh_delay: Duration::from_millis(100),
            require_refresh_cookie: false,
        }
    }

    pub fn requiring_refresh_cookie(mut self) -> Self {
        self.require_refresh_cookie = true;
        self
    }

    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.unauthorized_barrier = Some(Barrier::new(parties));
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

/// Cookie the mock sets on login and expects back on refresh
pub const REFRESH_COOKIE: &str = "refreshToken=r1";

fn reply(status: StatusCode, body: Value) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&body), status)
}

/// Start the mock on an ephemeral port and return its API base URL
pub async fn start(api: Arc<MockApi>) -> String {
    let with_api = {
        let api = api.clone();
        warp::any().map(move || api.clone())
    };
    let base = warp::path("api").and(warp::path("v1"));

    let login = base
        .clone()
        .and(warp::path!("users" / "login"))
        .and(warp::post())
        .and(warp::body::json())
        .map(|body: Value| {
            if body["email"] == "a@x.com" && body["password"] == "secret1" {
                let ok = reply(
                    StatusCode::OK,
                    json!({"user": {"role": "STUDENT"}, "accessToken": "tok1"}),
                );
                warp::reply::with_header(ok, "set-cookie", format!("{}; Path=/; HttpOnly", REFRESH_COOKIE))
                    .into_response()
            } else {
                reply(
                    StatusCode::UNAUTHORIZED,
                    json!({"success": false, "message": "Invalid email or password"}),
                )
                .into_response()
            }
        });

    let register = base
        .clone()
        .and(warp::path!("users" / "register"))
        .and(warp::post())
        .and(warp::body::json())
        .map(|body: Value| {
            if body["email"] == "taken@x.com" {
                return reply(
                    StatusCode::CONFLICT,
                    json!({"success": false, "message": "Email already registered"}),
                );
            }
            reply(
                StatusCode::CREATED,
                json!({
                    "success": true,
                    "message": "Registered",
                    "data": {
                        "id": "new-1",
                        "name": body["name"],
                        "email": body["email"],
                        "role": "STUDENT",
                        "status": "ACTIVE"
                    }
                }),
            )
        });

    let refresh = base
        .clone()
        .and(warp::path!("users" / "refresh-token"))
        .and(warp::post())
        .and(with_api.clone())
        .and(warp::header::optional::<String>("cookie"))
        .and_then(|api: Arc<MockApi>, cookie: Option<String>| async move {
            api.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(api.refresh_delay).await;
            let has_cookie = cookie.map_or(false, |c| c.split("; ").any(|pair| pair == REFRESH_COOKIE));
            if api.require_refresh_cookie && !has_cookie {
                return Ok::<_, warp::Rejection>(reply(
                    StatusCode::UNAUTHORIZED,
                    json!({"success": false, "message": "Refresh token missing"}),
                ));
            }
            let mode = api.refresh_mode.lock().unwrap().clone();
            let response = match mode {
                RefreshMode::Issue(body) => reply(StatusCode::OK, body),
                RefreshMode::Reject => reply(
                    StatusCode::UNAUTHORIZED,
                    json!({"success": false, "message": "Refresh token expired"}),
                ),
            };
            Ok::<_, warp::Rejection>(response)
        });

    let logout = base
        .clone()
        .and(warp::path!("users" / "logout"))
        .and(warp::post())
        .and(with_api.clone())
        .map(|api: Arc<MockApi>| {
            api.logout_calls.fetch_add(1, Ordering::SeqCst);
            warp::reply::with_header(
                reply(StatusCode::OK, json!({"success": true})),
                "set-cookie",
                "refreshToken=; Path=/; Max-Age=0",
            )
        });

    let courses = base
        .clone()
        .and(warp::path("courses"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_api.clone())
        .and_then(|auth: Option<String>, api: Arc<MockApi>| async move {
            let expected = format!("Bearer {}", api.valid_token.lock().unwrap());
            if auth.as_deref() == Some(expected.as_str()) {
                api.authorized_hits.fetch_add(1, Ordering::SeqCst);
                return Ok::<_, warp::Rejection>(reply(StatusCode::OK, json!({"data": ["rust-101"]})));
            }
            tokio::time::sleep(api.unauthorized_delay).await;
            if let Some(barrier) = &api.unauthorized_barrier {
                barrier.wait().await;
            }
            Ok(reply(StatusCode::UNAUTHORIZED, json!({"message": "jwt expired"})))
        });

    let always_unauthorized = base
        .clone()
        .and(warp::path("locked"))
        .and(warp::path::end())
        .map(|| reply(StatusCode::UNAUTHORIZED, json!({"message": "nope"})));

    let bad_request = base
        .clone()
        .and(warp::path("invalid"))
        .and(warp::path::end())
        .map(|| reply(StatusCode::UNPROCESSABLE_ENTITY, json!({"message": "title is required"})));

    let slow = base
        .clone()
        .and(warp::path("slow"))
        .and(warp::path::end())
        .and_then(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, warp::Rejection>(reply(StatusCode::OK, json!({})))
        });

    let routes = login
        .or(register)
        .or(refresh)
        .or(logout)
        .or(courses)
        .or(always_unauthorized)
        .or(bad_request)
        .or(slow);

    let (addr, server): (SocketAddr, _) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}/api/v1", addr)
}

/// Client wired to the mock with the given session manager
pub fn client(base_url: &str, sessions: Arc<SessionManager>) -> Arc<ApiClient> {
    let config = ClientConfig::new(base_url)
        .unwrap()
        .with_timeout(Duration::from_secs(2));
    Arc::new(ApiClient::new(config, sessions).unwrap())
}

pub fn jar_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("edupulse-it-{}", uuid::Uuid::new_v4()))
        .join("cookies.json")
}
