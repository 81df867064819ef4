use crate::error::{AppError, AppResult, ConfigError};
use crate::models::inputs::PipelineInputs;
use std::path::Path;
use tokio::fs;

/// Load a standalone-mode parameter bag from a TOML file
///
/// ```toml
/// standard_name = "Local Test Standard"
/// standard_text = """
/// A.5 Security Policies
/// A.6 Roles and Responsibilities
/// """
/// source_url = "https://example.com/policy.txt"
/// doc_id = "policy_doc"
/// scope = "Local Test Run"
///
/// [[sources]]
/// locator = "./evidence/hr_handbook.txt"
/// doc_id = "hr_handbook"
/// ```
pub async fn load_bag_from_toml(toml_file_path: &Path) -> AppResult<PipelineInputs> {
    let path = toml_file_path.display().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| bag_file_error(&path, e))?;

    let inputs: PipelineInputs = toml::from_str(&content).map_err(|e| bag_file_error(&path, e))?;

    inputs.validate()?;

    tracing::info!(
        "Loaded parameter bag {} ({} evidence source(s))",
        path,
        inputs.evidence_sources().len()
    );

    Ok(inputs)
}

fn bag_file_error(path: &str, reason: impl std::fmt::Display) -> AppError {
    AppError::Config(ConfigError::BagFile {
        path: path.to_string(),
        reason: reason.to_string(),
    })
}
