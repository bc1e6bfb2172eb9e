use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::domain::error::{AppError, Result};
use crate::interfaces::http::{add_log, LogEntry};

const SOURCE: &str = "MockServer";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockServerConfig {
    pub port: u16,
    #[serde(default)]
    pub routes: Vec<MockRoute>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            port: 4010,
            routes: sample_prediction_routes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRoute {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Option<MockBodyMatch>,
    #[serde(default)]
    pub response: MockResponse,
}

impl MockRoute {
    /// Enabled `POST` route answering with `status` and `body`.
    pub fn post(id: &str, path: &str, status: u16, body: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            enabled: true,
            method: "POST".to_string(),
            path: path.to_string(),
            body: None,
            response: MockResponse {
                status,
                body: body.to_string(),
                delay_ms: None,
            },
        }
    }

    pub fn matching(mut self, mode: MatchMode, value: &str) -> Self {
        self.body = Some(MockBodyMatch {
            mode,
            value: value.to_string(),
        });
        self
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.response.delay_ms = Some(delay_ms);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockBodyMatch {
    pub mode: MatchMode,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Exact,
    Contains,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay_ms: Option<u64>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: "{}".to_string(),
            delay_ms: None,
        }
    }
}

#[derive(Clone)]
pub struct MockServerState {
    pub config: Arc<Mutex<MockServerConfig>>,
    pub server: Arc<Mutex<Option<ServerHandle>>>,
    pub addr: Arc<Mutex<Option<SocketAddr>>>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl MockServerState {
    /// Loads routes from `config_path`, falling back to the sample routes.
    pub fn new(config_path: &Path, port: u16, logs: Arc<Mutex<Vec<LogEntry>>>) -> Self {
        let mut config = match load_config_from_path(config_path) {
            Ok(config) => config,
            Err(err) => {
                add_log(
                    &logs,
                    "ERROR",
                    SOURCE,
                    &format!("Failed to load mock server config: {}", err),
                );
                MockServerConfig::default()
            }
        };
        config.port = port;
        Self::with_config(config, logs)
    }

    pub fn with_config(config: MockServerConfig, logs: Arc<Mutex<Vec<LogEntry>>>) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            server: Arc::new(Mutex::new(None)),
            addr: Arc::new(Mutex::new(None)),
            logs,
        }
    }

    /// Base URL of the running server, e.g. `http://127.0.0.1:4010`.
    pub fn base_url(&self) -> Option<String> {
        self.addr
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|addr| format!("http://{}", addr))
    }
}

pub fn load_config_from_path(path: &Path) -> Result<MockServerConfig> {
    if !path.exists() {
        return Ok(MockServerConfig::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|err| AppError::Internal(format!("Failed to read mock server config: {}", err)))?;
    serde_json::from_str(&content)
        .map_err(|err| AppError::Internal(format!("Failed to parse mock server config: {}", err)))
}

/// Binds and spawns the server; returns its base URL.
///
/// Port `0` binds an ephemeral port.
pub async fn start_mock_server(state: Arc<MockServerState>) -> Result<String> {
    let port = { state.config.lock().unwrap_or_else(|e| e.into_inner()).port };
    let mut server_guard = state.server.lock().unwrap_or_else(|e| e.into_inner());
    if server_guard.is_some() {
        add_log(
            &state.logs,
            "INFO",
            SOURCE,
            "Mock server start requested but already running",
        );
        return Err(AppError::ValidationError(
            "Mock server is already running.".to_string(),
        ));
    }

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_state.clone()))
            .default_service(web::route().to(handle_mock_request))
    })
    .workers(1)
    .bind(("127.0.0.1", port))
    .map_err(|err| AppError::Internal(format!("Failed to bind mock server: {}", err)))?;

    let addr = server
        .addrs()
        .first()
        .copied()
        .ok_or_else(|| AppError::Internal("Mock server has no bound address".to_string()))?;
    let server = server.run();

    *server_guard = Some(server.handle());
    *state.addr.lock().unwrap_or_else(|e| e.into_inner()) = Some(addr);
    tokio::spawn(server);

    let url = format!("http://{}", addr);
    add_log(
        &state.logs,
        "INFO",
        SOURCE,
        &format!("Mock server started on {}", url),
    );
    tracing::info!(url = %url, "Mock prediction service started");

    Ok(url)
}

pub async fn stop_mock_server(state: Arc<MockServerState>) -> Result<()> {
    let handle = { state.server.lock().unwrap_or_else(|e| e.into_inner()).take() };
    *state.addr.lock().unwrap_or_else(|e| e.into_inner()) = None;
    if let Some(handle) = handle {
        let graceful = timeout(Duration::from_secs(2), handle.stop(true)).await;
        if graceful.is_err() {
            handle.stop(false).await;
            add_log(&state.logs, "WARN", SOURCE, "Mock server forced stop after timeout");
        } else {
            add_log(&state.logs, "INFO", SOURCE, "Mock server stopped");
        }
    } else {
        add_log(
            &state.logs,
            "INFO",
            SOURCE,
            "Mock server stop requested but already stopped",
        );
    }
    Ok(())
}

async fn handle_mock_request(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<Arc<MockServerState>>,
) -> HttpResponse {
    let method = req.method().as_str().to_uppercase();
    let path = req.path().to_string();
    let body_text = String::from_utf8_lossy(&body).to_string();

    let config = data.config.lock().unwrap_or_else(|e| e.into_inner()).clone();
    let enabled_routes: Vec<&MockRoute> = config.routes.iter().filter(|route| route.enabled).collect();

    let mut best_match: Option<(&MockRoute, i32)> = None;
    for route in enabled_routes.iter().copied() {
        if !method_matches(route, &method) || !path_matches(route, &path) {
            continue;
        }
        if let Some(score) = calculate_match_score(route, &body_text) {
            // first route wins ties
            if best_match.map_or(true, |(_, best_score)| score > best_score) {
                best_match = Some((route, score));
            }
        }
    }

    if let Some((route, _score)) = best_match {
        if let Some(delay_ms) = route.response.delay_ms.filter(|delay| *delay > 0) {
            sleep(Duration::from_millis(delay_ms)).await;
        }

        add_log(
            &data.logs,
            "INFO",
            SOURCE,
            &format!(
                "Mock response served (method={} path={} route={})",
                method, path, route.name
            ),
        );

        let content_type = if route.response.body.trim_start().starts_with('{')
            || route.response.body.trim_start().starts_with('[')
        {
            "application/json"
        } else {
            "text/plain"
        };

        return HttpResponse::build(
            actix_web::http::StatusCode::from_u16(route.response.status)
                .unwrap_or(actix_web::http::StatusCode::OK),
        )
        .append_header(("Content-Type", content_type))
        .body(route.response.body.clone());
    }

    add_log(
        &data.logs,
        "INFO",
        SOURCE,
        &format!(
            "Mock response not found (method={} path={} enabled_routes={})",
            method,
            path,
            enabled_routes.len()
        ),
    );

    HttpResponse::NotFound().json(serde_json::json!({
        "error": "No mock route matched.",
        "method": method,
        "path": path
    }))
}

fn method_matches(route: &MockRoute, method: &str) -> bool {
    route.method.trim().eq_ignore_ascii_case(method)
}

fn path_matches(route: &MockRoute, path: &str) -> bool {
    let route_path = route.path.trim();
    if route_path.is_empty() {
        return false;
    }
    normalize_path(route_path) == normalize_path(path)
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed == "/" {
        return "/".to_string();
    }
    trimmed.trim_end_matches('/').to_string()
}

/// `None` when a configured matcher rejects the body.
fn calculate_match_score(route: &MockRoute, body_text: &str) -> Option<i32> {
    match &route.body {
        Some(body_match) if !match_body(body_match, body_text) => None,
        Some(_) => Some(1),
        None => Some(0),
    }
}

fn match_body(rule: &MockBodyMatch, body_text: &str) -> bool {
    let rule_value = rule.value.trim();
    if rule_value.is_empty() {
        return true;
    }
    match rule.mode {
        MatchMode::Exact => body_text.trim() == rule_value,
        MatchMode::Contains => body_text.contains(rule_value),
        MatchMode::Regex => Regex::new(rule_value)
            .map(|re| re.is_match(body_text))
            .unwrap_or(false),
    }
}

/// Canned responses for local development without the real forecaster.
///
/// `column=all` gets a two-column mapping with one failure; anything else
/// gets a single grouped series.
pub fn sample_prediction_routes() -> Vec<MockRoute> {
    let single = serde_json::json!({
        "column": "sales",
        "time_column": "date",
        "group_column": "region",
        "steps": 2,
        "predictions": [
            {"date": "2024-01-01", "region": "north", "sales": 120.0, "source": "observed"},
            {"date": "2024-01-02", "region": "north", "sales": 125.5, "source": "observed"},
            {"date": "2024-01-03", "region": "north", "sales": 128.25, "source": "predicted"},
            {"date": "2024-01-01", "region": "south", "sales": 80.0, "source": "observed"},
            {"date": "2024-01-02", "region": "south", "sales": 82.0, "source": "observed"},
            {"date": "2024-01-03", "region": "south", "sales": 84.75, "source": "predicted"}
        ]
    });
    let multi = serde_json::json!({
        "sales": {
            "column": "sales",
            "time_column": "date",
            "predictions": [
                {"date": "2024-01-01", "sales": 120.0, "source": "observed"},
                {"date": "2024-01-02", "sales": 131.4, "source": "predicted"}
            ]
        },
        "cost": {"error": "insufficient data"}
    });

    vec![
        MockRoute::post("predict-all", "/api/predict", 200, &multi.to_string())
            .matching(MatchMode::Regex, r#"name="column"\s+all\s"#),
        MockRoute::post("predict-single", "/api/predict", 200, &single.to_string()),
    ]
}
