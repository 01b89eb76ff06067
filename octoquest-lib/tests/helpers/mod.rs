//! Shared test helpers: a local stand-in for the GitHub REST API and a
//! running OctoQuest API server.
#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use octoquest_lib::config::{GitHubConfig, TimeoutConfig};
use octoquest_lib::security::RateLimitManager;
use octoquest_lib::server::{serve, AppContext};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub const TEST_TOKEN: &str = "test-token";

#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: u64,
    pub login: &'static str,
    pub public_repos: u64,
    pub followers: u64,
}

pub fn user(id: u64, login: &'static str, public_repos: u64, followers: u64) -> MockUser {
    MockUser { id, login, public_repos, followers }
}

/// Behaviour of the fake GitHub API
#[derive(Debug, Clone, Default)]
pub struct MockGitHub {
    /// Search results, in rank order
    pub users: Vec<MockUser>,
    /// Logins whose profile lookup answers 500
    pub failing: Vec<&'static str>,
    /// Logins whose profile lookup is delayed
    pub slow: Vec<(&'static str, Duration)>,
    /// Status returned by the search endpoint instead of results
    pub search_status: Option<u16>,
    /// Event feed returned for every login
    pub events: Vec<Value>,
}

/// Handle to a running fake GitHub API
pub struct MockServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    /// Number of requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Paths requested so far, with query strings
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Authorization headers received so far
    pub fn auth_headers(&self) -> Vec<String> {
        self.auth.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.base_url.clone(),
            token: Some(TEST_TOKEN.to_string()),
            enrich_timeout_ms: 500,
            request_timeout_ms: 2_000,
            ..GitHubConfig::default()
        }
    }
}

impl MockGitHub {
    pub fn with_users(users: Vec<MockUser>) -> Self {
        Self { users, ..Self::default() }
    }

    pub async fn start(self) -> std::io::Result<MockServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let hits = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let auth = Arc::new(Mutex::new(Vec::new()));
        let state = Arc::new(self);

        let (h, p, a) = (hits.clone(), paths.clone(), auth.clone());
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let state = state.clone();
                let (h, p, a) = (h.clone(), p.clone(), a.clone());
                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        let (h, p, a) = (h.clone(), p.clone(), a.clone());
                        async move {
                            h.fetch_add(1, Ordering::SeqCst);
                            if let Ok(mut paths) = p.lock() {
                                paths.push(req.uri().to_string());
                            }
                            if let Some(value) = req.headers().get("authorization") {
                                if let (Ok(mut auth), Ok(value)) = (a.lock(), value.to_str()) {
                                    auth.push(value.to_string());
                                }
                            }
                            Ok::<_, Infallible>(state.respond(req.uri().path()).await)
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        Ok(MockServer { base_url: format!("http://{addr}"), hits, paths, auth })
    }

    async fn respond(&self, path: &str) -> Response<Full<Bytes>> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["search", "users"] => match self.search_status {
                Some(status) => json_reply(status, json!({"message": "upstream unavailable"})),
                None => json_reply(200, self.search_body()),
            },
            ["users", login, "events"] => {
                if self.find(login).is_some() {
                    json_reply(200, Value::Array(self.events.clone()))
                } else {
                    json_reply(404, json!({"message": "Not Found"}))
                }
            }
            ["users", login] => self.profile(login).await,
            _ => json_reply(404, json!({"message": "Not Found"})),
        }
    }

    fn find(&self, login: &str) -> Option<&MockUser> {
        self.users.iter().find(|u| u.login == login)
    }

    fn search_body(&self) -> Value {
        let items: Vec<Value> = self
            .users
            .iter()
            .map(|u| {
                json!({
                    "login": u.login,
                    "id": u.id,
                    "avatar_url": format!("https://avatars.example/u/{}", u.id),
                    "html_url": format!("https://github.com/{}", u.login),
                    "type": "User",
                    "score": 1.0
                })
            })
            .collect();
        json!({"total_count": items.len(), "incomplete_results": false, "items": items})
    }

    async fn profile(&self, login: &str) -> Response<Full<Bytes>> {
        if let Some((_, delay)) = self.slow.iter().find(|(l, _)| *l == login) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.iter().any(|l| *l == login) {
            return json_reply(500, json!({"message": "Server Error"}));
        }
        match self.find(login) {
            Some(u) => json_reply(
                200,
                json!({
                    "login": u.login,
                    "id": u.id,
                    "avatar_url": format!("https://avatars.example/u/{}", u.id),
                    "name": format!("{} (test)", u.login),
                    "public_repos": u.public_repos,
                    "followers": u.followers,
                    "following": 0
                }),
            ),
            None => json_reply(404, json!({"message": "Not Found"})),
        }
    }
}

fn json_reply(status: u16, body: Value) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from(body.to_string())));
    *resp.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    resp.headers_mut()
        .insert("content-type", hyper::header::HeaderValue::from_static("application/json"));
    resp
}

/// A running OctoQuest API; stops when dropped
pub struct TestApi {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApi {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestApi {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Start the API against `github` with the given limiter.
pub async fn start_api(
    github: GitHubConfig,
    limiter: Option<RateLimitManager>,
) -> Result<TestApi, Box<dyn std::error::Error + Send + Sync>> {
    let ctx = Arc::new(AppContext::new(github, limiter.map(Arc::new), None)?);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let timeouts = TimeoutConfig { shutdown_secs: 1, connection_handling_secs: 30 };
        let _ = serve(listener, ctx, async { rx.await.unwrap_or(()) }, &timeouts).await;
    });

    Ok(TestApi { addr, shutdown: Some(tx) })
}

/// Default API limiter: 30 requests per 60 seconds
pub fn default_limiter() -> RateLimitManager {
    RateLimitManager::in_memory(30, Duration::from_secs(60))
}

/// GET `url` as client `ip`, returning status, headers and parsed JSON body
pub async fn get_as(
    client: &reqwest::Client,
    url: &str,
    ip: &str,
) -> Result<(u16, HashMap<String, String>, Value), Box<dyn std::error::Error + Send + Sync>> {
    let resp = client.get(url).header("x-forwarded-for", ip).send().await?;
    let status = resp.status().as_u16();
    let headers = resp
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = resp.json::<Value>().await?;
    Ok((status, headers, body))
}
