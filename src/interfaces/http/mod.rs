use crate::application::PredictionSession;
use crate::domain::error::AppError;
use crate::domain::prediction_request::{ColumnSelection, PredictionRequest, NO_GROUP};
use crate::domain::preview::{ColumnSection, GroupTable, PredictionPreview};
use crate::infrastructure::config::ServerConfig;
use actix_cors::Cors;
use actix_web::http::{header, StatusCode};
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const SOURCE: &str = "HttpApi";
const MAX_LOG_ENTRIES: usize = 100;
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const PREDICTED_ROW_TINT: &str = "rgba(255, 255, 0, 0.1)";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub session: Arc<PredictionSession>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    file_name: Option<String>,
}

/// Prediction form as the page sends it, sentinels included.
#[derive(Debug, Deserialize)]
pub struct PredictForm {
    pub column: String,
    pub steps: u32,
    #[serde(default)]
    pub time_column: Option<String>,
    #[serde(default)]
    pub group_column: Option<String>,
}

impl PredictForm {
    /// Resolves `auto` and empty selections to "let the service decide".
    ///
    /// `none` is only meaningful for the group column, where it is passed
    /// through to turn grouping off.
    pub fn into_request(self) -> PredictionRequest {
        PredictionRequest {
            column: ColumnSelection::parse(&self.column),
            steps: self.steps,
            time_column: resolve_selection(self.time_column)
                .filter(|column| !column.eq_ignore_ascii_case(NO_GROUP)),
            group_column: resolve_selection(self.group_column).map(|column| {
                if column.eq_ignore_ascii_case(NO_GROUP) {
                    NO_GROUP.to_string()
                } else {
                    column
                }
            }),
        }
    }
}

fn resolve_selection(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[post("/upload")]
async fn upload_file(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    let file_name = query
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "upload.csv".to_string());

    add_log(
        &data.logs,
        "INFO",
        SOURCE,
        &format!("Uploading {} ({} bytes)", file_name, body.len()),
    );

    match data.session.select_file(&file_name, body.to_vec()) {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            add_log(&data.logs, "ERROR", SOURCE, &format!("Upload failed: {}", e));
            error_response(&e)
        }
    }
}

#[post("/predict")]
async fn run_prediction(data: web::Data<HttpState>, form: web::Json<PredictForm>) -> impl Responder {
    let request = form.into_inner().into_request();
    add_log(
        &data.logs,
        "INFO",
        SOURCE,
        &format!(
            "Predicting (column={} steps={} time_column={:?} group_column={:?})",
            request.column, request.steps, request.time_column, request.group_column
        ),
    );

    match data.session.predict(request).await {
        Ok(preview) => HttpResponse::Ok().json(preview),
        Err(e) => {
            add_log(&data.logs, "ERROR", SOURCE, &format!("Prediction failed: {}", e));
            error_response(&e)
        }
    }
}

#[get("/preview")]
async fn get_preview(data: web::Data<HttpState>) -> impl Responder {
    match data.session.preview() {
        Some(preview) => HttpResponse::Ok().json(preview),
        None => error_response(&no_prediction()),
    }
}

#[get("/preview.html")]
async fn get_preview_html(data: web::Data<HttpState>) -> impl Responder {
    match data.session.preview() {
        Some(preview) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(render_preview_html(&preview)),
        None => error_response(&no_prediction()),
    }
}

#[get("/download")]
async fn download_csv(data: web::Data<HttpState>) -> impl Responder {
    match data.session.download() {
        Ok(document) => {
            add_log(
                &data.logs,
                "INFO",
                SOURCE,
                &format!("Exported {}", document.filename),
            );
            HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", document.filename),
                ))
                .body(document.content)
        }
        Err(e) => error_response(&e),
    }
}

#[get("/status")]
async fn get_status(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.session.status())
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|e| e.into_inner());
    HttpResponse::Ok().json(&*logs)
}

fn no_prediction() -> AppError {
    AppError::NotFound("No prediction has been made yet".to_string())
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::InputError(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AppError::PredictionError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::TransportError(_) => StatusCode::BAD_GATEWAY,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &AppError) -> HttpResponse {
    HttpResponse::build(status_for(err)).json(serde_json::json!({ "error": err.user_message() }))
}

/// HTML fragment for the page; predicted rows get a background tint.
pub fn render_preview_html(preview: &PredictionPreview) -> String {
    let mut html = String::from("<div class=\"prediction-results\">\n");

    for section in &preview.sections {
        html.push_str(&format!(
            "<section class=\"prediction-column\" data-column=\"{}\">\n<h3>{}</h3>\n",
            escape_html(section.column()),
            escape_html(section.column())
        ));

        match section {
            ColumnSection::Failed { error, .. } => {
                html.push_str(&format!(
                    "<p class=\"prediction-error\">Error: {}</p>\n",
                    escape_html(error)
                ));
            }
            ColumnSection::Empty { .. } => {
                html.push_str("<p class=\"prediction-empty\">No prediction data available</p>\n");
            }
            ColumnSection::Table(table) => {
                for group in &table.groups {
                    if let (Some(column), Some(label)) = (&table.group_column, &group.label) {
                        html.push_str(&format!(
                            "<h4>{}: {}</h4>\n",
                            escape_html(column),
                            escape_html(label)
                        ));
                    }
                    render_group_table(&mut html, group);
                }
            }
        }

        html.push_str("</section>\n");
    }

    html.push_str("</div>\n");
    html
}

fn render_group_table(html: &mut String, group: &GroupTable) {
    html.push_str("<table>\n<thead><tr>");
    for header in &group.headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for row in &group.rows {
        if row.predicted {
            html.push_str(&format!(
                "<tr class=\"predicted\" style=\"background-color: {}\">",
                PREDICTED_ROW_TINT
            ));
        } else {
            html.push_str("<tr>");
        }
        for cell in &row.cells {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }

    if let Some(summary) = &group.summary {
        html.push_str(&format!(
            "<tr class=\"summary\"><td colspan=\"{}\">{}</td></tr>\n",
            group.headers.len().max(1),
            escape_html(summary)
        ));
    }

    html.push_str("</tbody>\n</table>\n");
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|e| e.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Routes under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES)).service(
        web::scope("/api")
            .service(health_check)
            .service(upload_file)
            .service(run_prediction)
            .service(get_preview)
            .service(get_preview_html)
            .service(download_csv)
            .service(get_status)
            .service(get_logs),
    );
}

pub fn start_server(
    session: Arc<PredictionSession>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    config: &ServerConfig,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { session, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::prediction_session::tests::{regional_forecast, StubService};
    use crate::domain::error::{Result, TRANSPORT_MESSAGE};
    use crate::domain::prediction::PredictionResult;
    use actix_web::test::{call_service, init_service, read_body, read_body_json, TestRequest};

    fn state_with(response: Result<PredictionResult>) -> (web::Data<HttpState>, Arc<StubService>) {
        let service = StubService::answering(response);
        let state = web::Data::new(HttpState {
            session: Arc::new(PredictionSession::new(service.clone())),
            logs: Arc::new(Mutex::new(Vec::new())),
        });
        (state, service)
    }

    fn grouped_state() -> (web::Data<HttpState>, Arc<StubService>) {
        state_with(Ok(PredictionResult::Single(regional_forecast())))
    }

    macro_rules! app {
        ($state:expr) => {
            init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    fn upload_request() -> TestRequest {
        TestRequest::post()
            .uri("/api/upload?file_name=sales.csv")
            .set_payload("date,sales,region\n2024-01-01,101,north\n")
    }

    #[actix_web::test]
    async fn test_health() {
        let (state, _) = grouped_state();
        let app = app!(state);
        let resp = call_service(&app, TestRequest::get().uri("/api/health").to_request()).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn test_upload_returns_columns() {
        let (state, _) = grouped_state();
        let app = app!(state);
        let resp = call_service(&app, upload_request().to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["file_name"], "sales.csv");
        assert_eq!(body["columns"], serde_json::json!(["date", "sales", "region"]));
    }

    #[actix_web::test]
    async fn test_predict_resolves_sentinels_and_downloads() {
        let (state, service) = grouped_state();
        let app = app!(state);
        call_service(&app, upload_request().to_request()).await;

        let resp = call_service(
            &app,
            TestRequest::post()
                .uri("/api/predict")
                .set_json(serde_json::json!({
                    "column": "sales",
                    "steps": 3,
                    "time_column": "auto",
                    "group_column": "none"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["sections"][0]["status"], "table");

        let sent = service.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.column, ColumnSelection::Named("sales".into()));
        assert_eq!(sent.time_column, None);
        assert_eq!(sent.group_column.as_deref(), Some(NO_GROUP));

        let resp = call_service(&app, TestRequest::get().uri("/api/download").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap(),
            "attachment; filename=\"predictions_sales.csv\""
        );
        let body = read_body(resp).await;
        assert!(body.starts_with(b"date,region,sales,source\n"));
    }

    #[test]
    fn test_form_sentinels() {
        let form = PredictForm {
            column: "All".to_string(),
            steps: 5,
            time_column: Some(" auto ".to_string()),
            group_column: Some("None".to_string()),
        };
        let request = form.into_request();
        assert_eq!(request.column, ColumnSelection::All);
        assert_eq!(request.time_column, None);
        assert_eq!(request.group_column.as_deref(), Some("none"));

        let form = PredictForm {
            column: "sales".to_string(),
            steps: 5,
            time_column: Some("date".to_string()),
            group_column: Some(String::new()),
        };
        let request = form.into_request();
        assert_eq!(request.time_column.as_deref(), Some("date"));
        assert_eq!(request.group_column, None);
    }

    #[actix_web::test]
    async fn test_preview_and_status_after_prediction() {
        let (state, _) = grouped_state();
        let app = app!(state);

        let resp = call_service(&app, TestRequest::get().uri("/api/preview").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        call_service(&app, upload_request().to_request()).await;
        let resp = call_service(
            &app,
            TestRequest::post()
                .uri("/api/predict")
                .set_json(serde_json::json!({"column": "sales", "steps": 3}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call_service(&app, TestRequest::get().uri("/api/preview").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["sections"][0]["column"], "sales");

        let resp = call_service(&app, TestRequest::get().uri("/api/status").to_request()).await;
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["has_result"], true);
        assert_eq!(body["loading"], false);
        assert_eq!(body["file_name"], "sales.csv");
    }

    #[actix_web::test]
    async fn test_preview_html_tints_predicted_rows() {
        let (state, _) = grouped_state();
        let app = app!(state);

        let resp = call_service(&app, TestRequest::get().uri("/api/preview.html").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        call_service(&app, upload_request().to_request()).await;
        call_service(
            &app,
            TestRequest::post()
                .uri("/api/predict")
                .set_json(serde_json::json!({"column": "sales", "steps": 3, "group_column": "region"}))
                .to_request(),
        )
        .await;

        let resp = call_service(&app, TestRequest::get().uri("/api/preview.html").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains(PREDICTED_ROW_TINT));
        assert!(html.contains("<h4>region: north</h4>"));
    }

    #[actix_web::test]
    async fn test_errors_are_json_with_status() {
        let (state, _) = state_with(Err(AppError::TransportError("connection refused".into())));
        let app = app!(state);

        let predict = || {
            TestRequest::post()
                .uri("/api/predict")
                .set_json(serde_json::json!({"column": "all", "steps": 5}))
                .to_request()
        };

        let resp = call_service(&app, predict()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        call_service(&app, upload_request().to_request()).await;
        let resp = call_service(&app, predict()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["error"], TRANSPORT_MESSAGE);

        let resp = call_service(&app, TestRequest::get().uri("/api/download").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = call_service(&app, TestRequest::get().uri("/api/logs").to_request()).await;
        let logs: Vec<LogEntry> = read_body_json(resp).await;
        assert!(logs.iter().any(|entry| entry.level == "ERROR"));
    }

    #[test]
    fn test_log_buffer_is_bounded() {
        let logs = Mutex::new(Vec::new());
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            add_log(&logs, "INFO", "Test", &format!("entry {}", i));
        }
        let logs = logs.lock().unwrap();
        assert_eq!(logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(logs[0].message, "entry 5");
    }

    #[test]
    fn test_html_is_escaped() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }
}
