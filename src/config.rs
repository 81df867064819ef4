/// Program configuration
///
/// Every field can be overridden through the environment; see [`Config::from_env`].
#[derive(Clone, Debug)]
pub struct Config {
    // --- HTTP server ---
    pub api_host: String,
    pub api_port: u16,
    /// Verbose (debug) logging
    pub verbose_logging: bool,
    // --- LLM ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// Some reasoning models reject any temperature other than the default,
    /// so it is only sent when configured.
    pub llm_temperature: Option<f32>,
    pub llm_max_tokens: u32,
    // --- Payment service ---
    pub payment_service_url: String,
    pub payment_api_key: String,
    pub network: String,
    pub agent_identifier: String,
    pub seller_vkey: String,
    pub payment_amount: String,
    pub payment_unit: String,
    pub payment_poll_interval_secs: u64,
    pub pay_by_secs: i64,
    pub submit_result_secs: i64,
    pub unlock_secs: i64,
    pub dispute_secs: i64,
    // --- Documents ---
    pub fetch_timeout_secs: u64,
    /// Standards longer than this are extracted paragraph-chunk by paragraph-chunk.
    pub max_standard_chunk_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-5-nano".to_string(),
            llm_temperature: None,
            llm_max_tokens: 8192,
            payment_service_url: String::new(),
            payment_api_key: String::new(),
            network: "Preprod".to_string(),
            agent_identifier: String::new(),
            seller_vkey: String::new(),
            payment_amount: "10000000".to_string(),
            payment_unit: "lovelace".to_string(),
            payment_poll_interval_secs: 60,
            pay_by_secs: 3_600,
            submit_result_secs: 43_200,
            unlock_secs: 86_400,
            dispute_secs: 172_800,
            fetch_timeout_secs: 30,
            max_standard_chunk_chars: 24_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_host: env_or("API_HOST", default.api_host),
            api_port: env_parse("API_PORT", default.api_port),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .unwrap_or(default.llm_api_key),
            llm_api_base_url: env_or("LLM_API_BASE_URL", default.llm_api_base_url),
            llm_model_name: env_or("LLM_MODEL_NAME", default.llm_model_name),
            llm_temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", default.llm_max_tokens),
            payment_service_url: env_or("PAYMENT_SERVICE_URL", default.payment_service_url),
            payment_api_key: env_or("PAYMENT_API_KEY", default.payment_api_key),
            network: env_or("NETWORK", default.network),
            agent_identifier: env_or("AGENT_IDENTIFIER", default.agent_identifier),
            seller_vkey: env_or("SELLER_VKEY", default.seller_vkey),
            payment_amount: env_or("PAYMENT_AMOUNT", default.payment_amount),
            payment_unit: env_or("PAYMENT_UNIT", default.payment_unit),
            payment_poll_interval_secs: env_parse("PAYMENT_POLL_INTERVAL_SECS", default.payment_poll_interval_secs),
            pay_by_secs: env_parse("PAY_BY_SECS", default.pay_by_secs),
            submit_result_secs: env_parse("SUBMIT_RESULT_SECS", default.submit_result_secs),
            unlock_secs: env_parse("UNLOCK_SECS", default.unlock_secs),
            dispute_secs: env_parse("DISPUTE_SECS", default.dispute_secs),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS", default.fetch_timeout_secs),
            max_standard_chunk_chars: env_parse("MAX_STANDARD_CHUNK_CHARS", default.max_standard_chunk_chars),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
