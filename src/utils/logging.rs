/// Logging helpers
///
/// Subscriber setup plus the banner/preview helpers used across the app.
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialise the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with verbose logging.
/// Calling it more than once is harmless.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Log the server banner
pub fn log_startup(config: &Config) {
    let addr = config.bind_addr();
    info!("{}", "=".repeat(60));
    info!("🚀 Starting AuditSense API server with payment integration");
    info!("{}", "=".repeat(60));
    for (method, path) in crate::api::router::ENDPOINTS {
        info!("{:<5} http://{}{}", method, addr, path);
    }
    info!("Payment service:     {}", config.payment_service_url);
    info!("LLM model:           {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

/// Log the standalone-mode banner
pub fn log_standalone_start(source: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 Running AuditSense pipeline locally (standalone mode)");
    info!("📄 Parameter bag: {}", source);
    info!("{}", "=".repeat(60));
}

/// Truncate long text for log previews
///
/// # Arguments
/// - `text`: text to shorten
/// - `max_len`: maximum number of characters kept
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_keeps_short_text() {
        assert_eq!(truncate_text("A.5 Policies", 80), "A.5 Policies");
    }

    #[test]
    fn test_truncate_text_counts_chars_not_bytes() {
        assert_eq!(truncate_text("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
