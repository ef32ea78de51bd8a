//! Main Entrypoint for the Interview API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the interviewer backend for the configured provider.
//! 3. Starting the periodic sweep of abandoned conversation memory.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::{Context, bail};
use async_openai::config::OpenAIConfig;
use interview_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use interview_core::{
    InterviewOrchestrator, InterviewerService, LlmInterviewer, OrchestratorOptions,
    StaticInterviewer, llm_client::OpenAICompatibleClient,
};
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc, time::Duration};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Failed to read prompts from {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

fn llm_interviewer(
    openai_config: OpenAIConfig,
    config: &Config,
) -> anyhow::Result<Arc<dyn InterviewerService>> {
    let prompts = load_prompts(&config.prompts_path)?;
    let client = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let interviewer = LlmInterviewer::new(client, prompts);
    let missing = interviewer.missing_prompts();
    if !missing.is_empty() {
        bail!(
            "Missing prompt templates in {}: {}",
            config.prompts_path.display(),
            missing.join(", ")
        );
    }
    Ok(Arc::new(interviewer))
}

fn build_interviewer(config: &Config) -> anyhow::Result<Arc<dyn InterviewerService>> {
    match &config.provider {
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let api_key = config
                .openai_api_key
                .as_ref()
                .context("OPENAI_API_KEY must be set for 'openai' provider")?;
            let openai_config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base("https://api.openai.com/v1/");
            llm_interviewer(openai_config, config)
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            let api_key = config
                .gemini_api_key
                .as_ref()
                .context("GEMINI_API_KEY must be set for 'gemini' provider")?;
            let openai_config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base("https://generativelanguage.googleapis.com/v1beta/openai");
            llm_interviewer(openai_config, config)
        }
        Provider::Static => {
            info!("Using static interviewer; no model calls will be made.");
            Ok(Arc::new(StaticInterviewer::new()))
        }
    }
}

/// Periodically evicts conversation memory of abandoned sessions.
fn spawn_sweeper(orchestrator: Arc<InterviewOrchestrator>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = orchestrator.sweep_expired();
            debug!(evicted, "Memory sweep finished");
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize the Interview Engine ---
    let interviewer = build_interviewer(&config)?;
    let options = OrchestratorOptions {
        reflection_probability: config.reflection_probability,
        memory_ttl_margin: chrono::Duration::seconds(config.session_ttl_margin_secs as i64),
        ..OrchestratorOptions::default()
    };
    let orchestrator = Arc::new(InterviewOrchestrator::new(interviewer, options));
    spawn_sweeper(
        Arc::clone(&orchestrator),
        Duration::from_secs(config.sweep_interval_secs),
    );

    let app_state = Arc::new(AppState {
        orchestrator,
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
