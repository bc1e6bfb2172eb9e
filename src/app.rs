use std::io;
use std::sync::{Arc, Mutex};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::application::PredictionSession;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::prediction_client::HttpPredictionClient;
use crate::interfaces::http::{add_log, start_server, LogEntry};
use crate::interfaces::mock_server::{start_mock_server, stop_mock_server, MockServerState};

pub async fn run() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            init_tracing("info");
            error!(error = %err, "Invalid configuration");
            return Err(io::Error::new(io::ErrorKind::InvalidInput, err));
        }
    };
    init_tracing(&config.log_filter);

    let logs: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));

    let mut prediction = config.prediction.clone();
    let mock_server = if config.mock.enabled {
        let state = Arc::new(MockServerState::new(
            &config.mock.config_path,
            config.mock.port,
            logs.clone(),
        ));
        let url = start_mock_server(state.clone())
            .await
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        prediction.base_url = format!("{}/api", url);
        Some(state)
    } else {
        None
    };

    let client = HttpPredictionClient::from_config(&prediction)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    info!(endpoint = %client.endpoint(), "Prediction service configured");

    let session = Arc::new(PredictionSession::from_config(&config, Arc::new(client)));
    let server = start_server(session, logs.clone(), &config.server)?;

    add_log(
        &logs,
        "INFO",
        "System",
        &format!(
            "HTTP server started on {}:{}",
            config.server.host, config.server.port
        ),
    );
    info!(host = %config.server.host, port = config.server.port, "HTTP server started");

    let result = server.await;

    if let Some(state) = mock_server {
        if let Err(err) = stop_mock_server(state).await {
            error!(error = %err, "Failed to stop mock server");
        }
    }

    result
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
