//! Application wiring
//!
//! Builds the real collaborators from `Config` and exposes the two run
//! modes: the HTTP server and a standalone pipeline run.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::api::{build_router, ApiContext};
use crate::clients::{HttpDocumentFetcher, MasumiPaymentClient, OpenAiReasoner};
use crate::config::Config;
use crate::error::ConfigError;
use crate::models::{AuditReport, PipelineInputs};
use crate::orchestrator::{JobManager, JobSettings, MemoryJobStore};
use crate::utils::logging::log_startup;
use crate::workflow::{AuditFlow, RunCtx};

/// Application main structure
pub struct App {
    config: Arc<Config>,
    flow: Arc<AuditFlow>,
    manager: Arc<JobManager>,
}

impl App {
    /// Initialize the application
    pub async fn initialize(config: Config) -> Result<Self> {
        if config.llm_api_key.is_empty() {
            warn!("⚠️ LLM_API_KEY is not set, LLM calls will be rejected");
        }

        let reasoner = Arc::new(OpenAiReasoner::new(&config));
        let fetcher = Arc::new(HttpDocumentFetcher::new(&config)?);
        let flow = Arc::new(AuditFlow::new(reasoner, fetcher, config.max_standard_chunk_chars));

        let manager = JobManager::start(
            Arc::new(MemoryJobStore::new()),
            Arc::new(MasumiPaymentClient::new(&config)),
            flow.clone(),
            JobSettings::from_config(&config),
        );

        Ok(Self {
            config: Arc::new(config),
            flow,
            manager,
        })
    }

    /// Serve the HTTP API until Ctrl-C
    pub async fn run_server(&self) -> Result<()> {
        if self.config.payment_service_url.is_empty() {
            return Err(ConfigError::Missing {
                var_name: "PAYMENT_SERVICE_URL".to_string(),
            }
            .into());
        }

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        log_startup(&self.config);

        let router = build_router(ApiContext::new(self.manager.clone(), self.config.clone()));
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.manager.shutdown();
        info!("✓ Server stopped");
        Ok(())
    }

    /// Run the pipeline once, outside any job or payment
    pub async fn run_standalone(&self, inputs: &PipelineInputs) -> Result<AuditReport> {
        let report = self.flow.kickoff(inputs, &RunCtx::standalone()).await?;
        Ok(report)
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("⚠️ Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Built-in parameter bag for a quick local run
pub fn demo_inputs() -> PipelineInputs {
    PipelineInputs {
        standard_name: Some("Local Test Standard".to_string()),
        standard_text: Some("A.5 Security Policies\nA.6 Roles and Responsibilities".to_string()),
        source_url: Some("https://raw.githubusercontent.com/github/gitignore/main/LICENSE".to_string()),
        doc_id: Some("policy_doc".to_string()),
        scope: Some("Local Test Run".to_string()),
        ..PipelineInputs::default()
    }
}
