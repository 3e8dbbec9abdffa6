use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tweetsense::sentiment::PolarityScores;
use tweetsense::{build_router, AppState, Config, SentimentAnalyzer, Storage};

struct Response {
    status: u16,
    head: String,
    body: String,
}

impl Response {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }
}

async fn spawn_app(state: Arc<AppState>) -> SocketAddr {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn spawn_default() -> SocketAddr {
    spawn_with_config(Config::default()).await
}

async fn spawn_with_config(config: Config) -> SocketAddr {
    let storage = Storage::open_in_memory().expect("open storage");
    spawn_app(AppState::new(config, storage).expect("state")).await
}

async fn send_raw(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> Response {
    send_with_headers(addr, method, path, &[], body).await
}

async fn send_with_headers(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> Response {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let body = body.unwrap_or("");
    let extra: String = headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}\r\n"))
        .collect();
    let req = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\n{extra}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    Response {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

async fn get(addr: SocketAddr, path: &str) -> Response {
    send_raw(addr, "GET", path, None).await
}

async fn post(addr: SocketAddr, path: &str, body: &Value) -> Response {
    send_raw(addr, "POST", path, Some(&body.to_string())).await
}

async fn register(addr: SocketAddr, username: &str, password: &str) -> i64 {
    let resp = post(
        addr,
        "/register",
        &json!({ "username": username, "password": password }),
    )
    .await;
    assert_eq!(resp.status, 200, "register failed: {}", resp.body);
    resp.json()["account_id"].as_i64().expect("account id")
}

#[tokio::test]
async fn root_reports_running() {
    let addr = spawn_default().await;

    let resp = get(addr, "/").await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["message"], "Backend is running!");
}

#[tokio::test]
async fn app_page_is_html() {
    let addr = spawn_default().await;

    let resp = get(addr, "/app").await;
    assert_eq!(resp.status, 200);
    assert!(resp.head.to_ascii_lowercase().contains("content-type: text/html"));
    assert!(resp.body.contains("Tweet Sentiment Analyzer"));
}

#[tokio::test]
async fn register_then_login() {
    let addr = spawn_default().await;

    let resp = post(
        addr,
        "/register",
        &json!({ "username": "alice", "password": "secret" }),
    )
    .await;
    assert_eq!(resp.status, 200);
    let body = resp.json();
    assert_eq!(body["message"], "Registration successful");
    let id = body["account_id"].as_i64().unwrap();

    let resp = post(
        addr,
        "/login",
        &json!({ "username": "alice", "password": "secret" }),
    )
    .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["account_id"].as_i64(), Some(id));
    assert_eq!(resp.json()["message"], "Login successful");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let addr = spawn_default().await;
    register(addr, "alice", "secret").await;

    let resp = post(
        addr,
        "/register",
        &json!({ "username": "alice", "password": "other" }),
    )
    .await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["detail"], "Username already exists");
}

#[tokio::test]
async fn invalid_username_and_empty_password_are_rejected() {
    let addr = spawn_default().await;

    let resp = post(
        addr,
        "/register",
        &json!({ "username": "has space", "password": "pw" }),
    )
    .await;
    assert_eq!(resp.status, 400);
    assert!(resp.json()["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid username"));

    let resp = post(
        addr,
        "/register",
        &json!({ "username": "alice", "password": "" }),
    )
    .await;
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.json()["detail"],
        "Password must be at least 1 characters"
    );
}

#[tokio::test]
async fn login_with_bad_credentials_is_unauthorized() {
    let addr = spawn_default().await;
    register(addr, "alice", "secret").await;

    let resp = post(
        addr,
        "/login",
        &json!({ "username": "alice", "password": "wrong" }),
    )
    .await;
    assert_eq!(resp.status, 401);
    assert_eq!(resp.json()["detail"], "Invalid credentials");

    let resp = post(
        addr,
        "/login",
        &json!({ "username": "nobody", "password": "secret" }),
    )
    .await;
    assert_eq!(resp.status, 401);
}

#[tokio::test]
async fn analyze_without_account_is_not_saved() {
    let addr = spawn_default().await;

    let resp = post(addr, "/analyze", &json!({ "text": "I love this so much!" })).await;
    assert_eq!(resp.status, 200);
    let body = resp.json();
    assert_eq!(body["sentiment"], "positive");
    assert_eq!(body["text"], "I love this so much!");
    assert!(body.get("account_id").is_none());
    assert!(body["scores"]["compound"].as_f64().unwrap() > 0.05);
}

#[tokio::test]
async fn analyze_labels_negative_and_neutral_text() {
    let addr = spawn_default().await;

    let resp = post(addr, "/analyze", &json!({ "text": "I hate this, it is terrible" })).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["sentiment"], "negative");

    let resp = post(addr, "/analyze", &json!({ "text": "The meeting is on Tuesday" })).await;
    assert_eq!(resp.status, 200);
    let body = resp.json();
    assert_eq!(body["sentiment"], "neutral");
    assert_eq!(body["scores"]["compound"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn analyze_with_account_records_history() {
    let addr = spawn_default().await;
    let id = register(addr, "alice", "secret").await;

    for text in ["Great day!", "Awful traffic", "Just a normal day"] {
        let resp = post(addr, "/analyze", &json!({ "text": text, "account_id": id })).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.json()["account_id"].as_i64(), Some(id));
    }

    let resp = get(addr, &format!("/history/{id}")).await;
    assert_eq!(resp.status, 200);
    let body = resp.json();
    assert_eq!(body["account_id"].as_i64(), Some(id));
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["text"], "Great day!");
    assert_eq!(history[0]["sentiment"], "positive");
    assert_eq!(history[1]["sentiment"], "negative");
    assert_eq!(history[2]["text"], "Just a normal day");

    let resp = get(addr, &format!("/history/{id}?limit=2")).await;
    assert_eq!(resp.status, 200);
    let history = resp.json()["history"].as_array().unwrap().clone();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["text"], "Awful traffic");
    assert_eq!(history[1]["text"], "Just a normal day");
}

#[tokio::test]
async fn history_is_per_account() {
    let addr = spawn_default().await;
    let alice = register(addr, "alice", "a").await;
    let bob = register(addr, "bob", "b").await;

    post(addr, "/analyze", &json!({ "text": "love it", "account_id": alice })).await;

    let resp = get(addr, &format!("/history/{bob}")).await;
    assert_eq!(resp.status, 200);
    assert!(resp.json()["history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let addr = spawn_default().await;

    let resp = post(addr, "/analyze", &json!({ "text": "hello", "account_id": 42 })).await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.json()["detail"], "Account not found");

    let resp = get(addr, "/history/42").await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn analyze_rejects_bad_text() {
    let addr = spawn_default().await;

    let resp = post(addr, "/analyze", &json!({ "text": "   " })).await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["detail"], "Text must not be empty");

    let long = "a".repeat(1001);
    let resp = post(addr, "/analyze", &json!({ "text": long })).await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["detail"], "Text exceeds 1000 characters");
}

#[tokio::test]
async fn malformed_requests_are_unprocessable() {
    let addr = spawn_default().await;

    let resp = send_raw(addr, "POST", "/analyze", Some("{not json")).await;
    assert_eq!(resp.status, 422);
    assert!(resp.json()["detail"].is_string());

    let resp = post(addr, "/register", &json!({ "username": "alice" })).await;
    assert_eq!(resp.status, 422);

    let resp = get(addr, "/history/not-a-number").await;
    assert_eq!(resp.status, 422);

    let resp = send_raw(addr, "POST", "/logout", None).await;
    assert_eq!(resp.status, 422);
}

#[tokio::test]
async fn logout_acknowledges_account() {
    let addr = spawn_default().await;
    let id = register(addr, "alice", "secret").await;

    let resp = send_raw(addr, "POST", &format!("/logout?account_id={id}"), None).await;
    assert_eq!(resp.status, 200);
    let body = resp.json();
    assert_eq!(body["account_id"].as_i64(), Some(id));
    assert_eq!(body["message"], "Logged out successfully");
}

#[tokio::test]
async fn admin_listing_requires_admin_role() {
    let storage = Storage::open_in_memory().expect("open storage");
    let admin = storage.register_user("root", "pw").unwrap().unwrap();
    storage.set_admin("root", true).unwrap();
    let addr = spawn_app(AppState::new(Config::default(), storage).expect("state")).await;
    let user = register(addr, "alice", "secret").await;

    let resp = get(addr, &format!("/admin/{user}")).await;
    assert_eq!(resp.status, 403);
    assert_eq!(resp.json()["detail"], "Not authorized");

    let resp = get(addr, "/admin/999").await;
    assert_eq!(resp.status, 403);

    let resp = get(addr, &format!("/admin/{admin}")).await;
    assert_eq!(resp.status, 200);
    let users = resp.json()["users"].as_array().unwrap().clone();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["username"], "root");
    assert_eq!(users[0]["is_admin"], true);
    assert_eq!(users[1]["username"], "alice");
    assert_eq!(users[1]["is_admin"], false);
    assert!(users[0].get("password").is_none());
}

struct Constant(f64);

impl SentimentAnalyzer for Constant {
    fn polarity_scores(&self, _text: &str) -> PolarityScores {
        PolarityScores {
            compound: self.0,
            neu: 1.0,
            ..PolarityScores::default()
        }
    }
}

#[tokio::test]
async fn analyzer_is_interchangeable() {
    let storage = Storage::open_in_memory().expect("open storage");
    let state = AppState::with_analyzer(Config::default(), storage, Arc::new(Constant(-0.9)))
        .expect("state");
    let addr = spawn_app(state).await;

    let resp = post(addr, "/analyze", &json!({ "text": "I love everything" })).await;
    assert_eq!(resp.status, 200);
    let body = resp.json();
    assert_eq!(body["sentiment"], "negative");
    assert_eq!(body["scores"]["compound"].as_f64(), Some(-0.9));
}

#[tokio::test]
async fn thresholds_come_from_config() {
    let mut config = Config::default();
    config.sentiment.positive_threshold = 0.95;
    let storage = Storage::open_in_memory().expect("open storage");
    let state =
        AppState::with_analyzer(config, storage, Arc::new(Constant(0.5))).expect("state");
    let addr = spawn_app(state).await;

    let resp = post(addr, "/analyze", &json!({ "text": "anything" })).await;
    assert_eq!(resp.json()["sentiment"], "neutral");
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let addr = spawn_default().await;

    let resp = send_with_headers(
        addr,
        "GET",
        "/",
        &[("Origin", "http://anywhere.example")],
        None,
    )
    .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn cors_preflight_lists_methods() {
    let addr = spawn_default().await;

    let resp = send_with_headers(
        addr,
        "OPTIONS",
        "/analyze",
        &[
            ("Origin", "http://anywhere.example"),
            ("Access-Control-Request-Method", "POST"),
            ("Access-Control-Request-Headers", "content-type"),
        ],
        None,
    )
    .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
    let methods = resp
        .header("access-control-allow-methods")
        .expect("allow-methods header");
    assert!(methods.contains("POST"), "got {methods}");
}

#[tokio::test]
async fn cors_origin_list_is_enforced() {
    let mut config = Config::default();
    config.server.cors_origins = vec![
        "http://allowed.example".to_string(),
        "bad\norigin".to_string(),
    ];
    let addr = spawn_with_config(config).await;

    let resp = send_with_headers(
        addr,
        "GET",
        "/",
        &[("Origin", "http://allowed.example")],
        None,
    )
    .await;
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.header("access-control-allow-origin"),
        Some("http://allowed.example")
    );

    let resp = send_with_headers(
        addr,
        "GET",
        "/",
        &[("Origin", "http://other.example")],
        None,
    )
    .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("access-control-allow-origin"), None);
}

#[tokio::test]
async fn custom_username_pattern_must_match_whole_name() {
    let mut config = Config::default();
    config.auth.username_pattern = "[a-z]+".to_string();
    config.auth.min_password_length = 4;
    let addr = spawn_with_config(config).await;

    let resp = post(
        addr,
        "/register",
        &json!({ "username": "bob!", "password": "secret" }),
    )
    .await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.json()["detail"], "Invalid username: must match [a-z]+");

    let resp = post(
        addr,
        "/register",
        &json!({ "username": "bob", "password": "abc" }),
    )
    .await;
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.json()["detail"],
        "Password must be at least 4 characters"
    );

    register(addr, "bob", "secret").await;
}

#[tokio::test]
async fn everyday_phrases_get_a_polarity() {
    let addr = spawn_default().await;

    for (text, expected) in [
        ("I am loving it", "positive"),
        ("stop hating on this", "negative"),
        ("what a nightmare", "negative"),
    ] {
        let resp = post(addr, "/analyze", &json!({ "text": text })).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.json()["sentiment"], expected, "text: {text}");
    }
}
