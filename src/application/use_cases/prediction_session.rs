// ============================================================
// PREDICTION SESSION USE CASE
// ============================================================
// Page-level controller: selected file, one outstanding request,
// last result and last error

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use super::csv_export::{CsvDocument, CsvExporter};
use super::header_sniffer::sniff_headers;
use super::result_renderer::ResultRenderer;
use crate::domain::error::{AppError, Result};
use crate::domain::prediction::PredictionResult;
use crate::domain::prediction_request::{ColumnSelection, PredictionRequest};
use crate::domain::preview::PredictionPreview;
use crate::domain::upload::{UploadSummary, UploadedFile};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv::{decode_upload, UploadReader};
use crate::infrastructure::prediction_client::PredictionService;

pub const IN_PROGRESS_MESSAGE: &str = "A prediction is already in progress";

/// What the page polls to draw its controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub loading: bool,
    pub file_name: Option<String>,
    pub headers: Vec<String>,
    pub has_result: bool,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct SessionState {
    file: Option<UploadedFile>,
    result: Option<PredictionResult>,
    preview: Option<PredictionPreview>,
    last_error: Option<String>,
}

/// Releases the in-flight flag on every exit path
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PredictionSession {
    service: Arc<dyn PredictionService>,
    renderer: ResultRenderer,
    exporter: CsvExporter,
    upload_reader: UploadReader,
    loading: AtomicBool,
    state: Mutex<SessionState>,
}

impl PredictionSession {
    pub fn new(service: Arc<dyn PredictionService>) -> Self {
        Self {
            service,
            renderer: ResultRenderer::default(),
            exporter: CsvExporter::default(),
            upload_reader: UploadReader::default(),
            loading: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn from_config(config: &AppConfig, service: Arc<dyn PredictionService>) -> Self {
        Self {
            renderer: ResultRenderer::new(config.preview.row_limit),
            exporter: CsvExporter::new(&config.export.single_prefix, &config.export.multi_prefix),
            upload_reader: UploadReader::new(config.preview.data_rows),
            ..Self::new(service)
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the selected file and clears any previous result or error.
    pub fn select_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadSummary> {
        let outcome = decode_upload(&bytes).and_then(|text| {
            let headers = sniff_headers(&text)?;
            let preview = self.upload_reader.preview(&text)?;
            Ok(UploadedFile {
                file_name: file_name.to_string(),
                bytes,
                headers,
                preview,
            })
        });

        let mut state = self.state();
        match outcome {
            Ok(file) => {
                info!(file_name = %file.file_name, columns = file.headers.len(), "File selected");
                let summary = file.summary();
                *state = SessionState {
                    file: Some(file),
                    ..SessionState::default()
                };
                Ok(summary)
            }
            Err(err) => {
                state.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Runs one prediction against the selected file.
    ///
    /// Input problems are reported before any request is sent. Only one
    /// request may be outstanding at a time.
    pub async fn predict(&self, request: PredictionRequest) -> Result<PredictionPreview> {
        let file = match self.check_request(&request) {
            Ok(file) => file,
            Err(err) => {
                self.state().last_error = Some(err.user_message());
                return Err(err);
            }
        };

        let Some(_loading) = LoadingGuard::claim(&self.loading) else {
            return Err(AppError::InputError(IN_PROGRESS_MESSAGE.to_string()));
        };

        let request_id = Uuid::new_v4();
        info!(
            request_id = %request_id,
            column = %request.column,
            steps = request.steps,
            file_name = %file.file_name,
            "Requesting prediction"
        );

        let outcome = self.service.predict(&file, &request).await;

        let mut state = self.state();
        match outcome {
            Ok(result) => {
                let preview = self.renderer.render(&result);
                info!(
                    request_id = %request_id,
                    sections = preview.sections.len(),
                    "Prediction received"
                );
                state.result = Some(result);
                state.preview = Some(preview.clone());
                state.last_error = None;
                Ok(preview)
            }
            Err(err) => {
                error!(request_id = %request_id, error = %err, "Prediction failed");
                state.result = None;
                state.preview = None;
                state.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    fn check_request(&self, request: &PredictionRequest) -> Result<UploadedFile> {
        let file = self
            .state()
            .file
            .clone()
            .ok_or_else(|| AppError::InputError("Please select a file first".to_string()))?;

        if let ColumnSelection::Named(name) = &request.column {
            if name.trim().is_empty() {
                return Err(AppError::InputError(
                    "Please select a column to predict".to_string(),
                ));
            }
        }

        request.validate()?;

        let named = match &request.column {
            ColumnSelection::Named(name) => Some(name.as_str()),
            ColumnSelection::All => None,
        };
        let columns = named
            .into_iter()
            .chain(request.time_column.as_deref())
            .chain(request.dataset_group_column());
        for column in columns {
            if !file.has_column(column) {
                return Err(AppError::InputError(format!(
                    "Column '{}' is not in {}",
                    column, file.file_name
                )));
            }
        }

        Ok(file)
    }

    pub fn preview(&self) -> Option<PredictionPreview> {
        self.state().preview.clone()
    }

    pub fn result(&self) -> Option<PredictionResult> {
        self.state().result.clone()
    }

    pub fn download(&self) -> Result<CsvDocument> {
        self.download_on(Utc::now().date_naive())
    }

    /// Export of the current result, dated `today`.
    pub fn download_on(&self, today: NaiveDate) -> Result<CsvDocument> {
        let state = self.state();
        let result = state.result.as_ref().ok_or_else(|| {
            AppError::InputError("There is no prediction to download yet".to_string())
        })?;
        let document = self.exporter.export(result, today);
        info!(filename = %document.filename, bytes = document.content.len(), "CSV export built");
        Ok(document)
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.state();
        SessionStatus {
            loading: self.loading.load(Ordering::Acquire),
            file_name: state.file.as_ref().map(|file| file.file_name.clone()),
            headers: state
                .file
                .as_ref()
                .map(|file| file.headers.clone())
                .unwrap_or_default(),
            has_result: state.result.is_some(),
            last_error: state.last_error.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::error::TRANSPORT_MESSAGE;
    use crate::domain::prediction::{
        CellValue, ColumnOutcome, MultiColumnResult, PredictionRow, SingleColumnResult,
    };
    use crate::domain::preview::ColumnSection;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Answers every request with a fixed outcome, optionally after a gate opens.
    pub(crate) struct StubService {
        pub response: Result<PredictionResult>,
        pub gate: Option<Arc<Notify>>,
        pub last_request: Mutex<Option<PredictionRequest>>,
    }

    impl StubService {
        pub(crate) fn answering(response: Result<PredictionResult>) -> Arc<Self> {
            Arc::new(Self {
                response,
                gate: None,
                last_request: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl PredictionService for StubService {
        async fn predict(&self, _file: &UploadedFile, request: &PredictionRequest) -> Result<PredictionResult> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.response.clone()
        }
    }

    /// Two regions, five observed and three predicted days each, interleaved
    /// and out of order.
    pub(crate) fn regional_forecast() -> SingleColumnResult {
        let mut rows = Vec::new();
        for day in (1..=8).rev() {
            for (region, base) in [("north", 100.0), ("south", 50.0)] {
                let source = if day > 5 { "predicted" } else { "observed" };
                rows.push(
                    PredictionRow::new()
                        .with("date", format!("2024-01-{:02}", day))
                        .with("region", region)
                        .with("sales", base + day as f64)
                        .with("source", source),
                );
            }
        }
        SingleColumnResult::new("sales", rows)
            .with_time_column("date")
            .with_group_column("region")
    }

    fn session_with(service: Arc<dyn PredictionService>, csv: &str) -> PredictionSession {
        let session = PredictionSession::new(service);
        session.select_file("data.csv", csv.as_bytes().to_vec()).unwrap();
        session
    }

    #[tokio::test]
    async fn test_scenario_grouped_single_column() {
        let service = StubService::answering(Ok(PredictionResult::Single(regional_forecast())));
        let session = session_with(service.clone(), "date,sales,region\n2024-01-01,101,north\n");

        let request = PredictionRequest::new(ColumnSelection::Named("sales".into()), 3)
            .with_time_column("date")
            .with_group_column("region");
        let preview = session.predict(request.clone()).await.unwrap();
        assert_eq!(service.last_request.lock().unwrap().as_ref(), Some(&request));

        let ColumnSection::Table(table) = &preview.sections[0] else {
            panic!("expected a table");
        };
        assert_eq!(table.groups.len(), 2);
        assert_eq!(table.groups[0].label.as_deref(), Some("north"));
        assert_eq!(table.groups[1].label.as_deref(), Some("south"));
        for group in &table.groups {
            assert_eq!(group.total_rows, 8);
            let dates: Vec<&str> = group.rows.iter().map(|row| row.cells[0].as_str()).collect();
            let mut sorted = dates.clone();
            sorted.sort();
            assert_eq!(dates, sorted);
            let flags: Vec<bool> = group.rows.iter().map(|row| row.predicted).collect();
            assert_eq!(flags, vec![false, false, false, false, false, true, true, true]);
        }

        let document = session.download().unwrap();
        assert_eq!(document.filename, "predictions_sales.csv");
        assert_eq!(document.content.lines().count(), 17);
        assert_eq!(document.content.lines().next(), Some("date,region,sales,source"));
    }

    #[tokio::test]
    async fn test_scenario_all_columns_with_one_failure() {
        let sales = SingleColumnResult::new(
            "sales",
            vec![
                PredictionRow::new().with("date", "2024-01-02").with("sales", 12.5),
                PredictionRow::new().with("date", "2024-01-01").with("sales", 10.0),
            ],
        )
        .with_time_column("date");
        let result = MultiColumnResult::new()
            .with("sales", ColumnOutcome::Succeeded(sales))
            .with("cost", ColumnOutcome::Failed { error: "insufficient data".into() });
        let service = StubService::answering(Ok(PredictionResult::Multiple(result)));
        let session = session_with(service, "date,sales,cost\n2024-01-01,10,4\n");

        let preview = session
            .predict(PredictionRequest::new(ColumnSelection::All, 5))
            .await
            .unwrap();
        assert!(matches!(preview.section("sales"), Some(ColumnSection::Table(_))));
        assert_eq!(
            preview.section("cost"),
            Some(&ColumnSection::Failed {
                column: "cost".into(),
                error: "insufficient data".into()
            })
        );

        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let document = session.download_on(today).unwrap();
        assert_eq!(document.filename, "all_predictions_2024-05-01.csv");
        assert_eq!(
            document.content,
            "date,sales\n\"2024-01-01\",10\n\"2024-01-02\",12.5\n"
        );
    }

    #[tokio::test]
    async fn test_scenario_missing_value_exports_empty_field() {
        let sales = SingleColumnResult::new(
            "sales",
            vec![
                PredictionRow::new().with("date", "2024-01-01").with("sales", 10.0),
                PredictionRow::new().with("date", "2024-01-02").with("sales", 12.0),
            ],
        )
        .with_time_column("date");
        let cost = SingleColumnResult::new(
            "cost",
            vec![PredictionRow::new().with("date", "2024-01-01").with("cost", CellValue::Number(4.0))],
        )
        .with_time_column("date");
        let result = MultiColumnResult::new()
            .with("sales", ColumnOutcome::Succeeded(sales))
            .with("cost", ColumnOutcome::Succeeded(cost));
        let service = StubService::answering(Ok(PredictionResult::Multiple(result)));
        let session = session_with(service, "date,sales,cost\n");

        session
            .predict(PredictionRequest::new(ColumnSelection::All, 5))
            .await
            .unwrap();
        let content = session.download().unwrap().content;
        assert_eq!(content, "date,sales,cost\n\"2024-01-01\",10,4\n\"2024-01-02\",12,\n");
        assert!(!content.contains("undefined"));
    }

    #[tokio::test]
    async fn test_input_errors_before_request() {
        let service = StubService::answering(Ok(PredictionResult::Single(regional_forecast())));
        let session = PredictionSession::new(service.clone());

        let err = session.predict(PredictionRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::InputError(_)));

        session.select_file("data.csv", b"date,sales\n".to_vec()).unwrap();
        let no_column = PredictionRequest::new(ColumnSelection::Named(" ".into()), 5);
        assert!(matches!(session.predict(no_column).await, Err(AppError::InputError(_))));

        let bad_steps = PredictionRequest::new(ColumnSelection::Named("sales".into()), 31);
        assert!(matches!(session.predict(bad_steps).await, Err(AppError::ValidationError(_))));

        let unknown = PredictionRequest::new(ColumnSelection::Named("profit".into()), 5);
        assert!(matches!(session.predict(unknown).await, Err(AppError::InputError(_))));

        assert!(service.last_request.lock().unwrap().is_none());
        assert!(session.status().last_error.is_some());
    }

    #[tokio::test]
    async fn test_transport_failure_clears_result() {
        let session = session_with(
            StubService::answering(Err(AppError::TransportError("connection refused".into()))),
            "date,sales\n",
        );
        let err = session.predict(PredictionRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::TransportError(_)));

        let status = session.status();
        assert!(!status.loading);
        assert!(!status.has_result);
        assert_eq!(status.last_error.as_deref(), Some(TRANSPORT_MESSAGE));
        assert!(session.preview().is_none());
        assert!(matches!(session.download(), Err(AppError::InputError(_))));
    }

    #[tokio::test]
    async fn test_overlapping_requests_are_rejected() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(StubService {
            response: Ok(PredictionResult::Single(regional_forecast())),
            gate: Some(gate.clone()),
            last_request: Mutex::new(None),
        });
        let session = Arc::new(session_with(service, "date,sales,region\n"));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.predict(PredictionRequest::default()).await })
        };
        while !session.status().loading {
            tokio::task::yield_now().await;
        }

        let err = session.predict(PredictionRequest::default()).await.unwrap_err();
        assert_eq!(err, AppError::InputError(IN_PROGRESS_MESSAGE.to_string()));

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(!session.status().loading);
        assert!(session.status().has_result);
    }

    #[test]
    fn test_new_file_clears_previous_state() {
        let session = PredictionSession::new(StubService::answering(Err(AppError::Internal("unused".into()))));
        assert!(session.select_file("empty.csv", Vec::new()).is_err());
        assert!(session.status().last_error.is_some());

        let summary = session
            .select_file("data.csv", b"date,sales\n2024-01-01,10\n".to_vec())
            .unwrap();
        assert_eq!(summary.columns, vec!["date", "sales"]);
        assert_eq!(summary.preview.rows.len(), 1);

        let status = session.status();
        assert_eq!(status.file_name.as_deref(), Some("data.csv"));
        assert_eq!(status.last_error, None);
        assert!(!status.has_result);
    }
}
