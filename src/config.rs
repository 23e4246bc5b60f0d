use clap::Parser;

/// mt-gateway — OpenAI-compatible gateway for machinetranslation.com.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Config {
    /// Listen address (e.g. ":8088" or "0.0.0.0:8088")
    #[arg(long, default_value = ":8088", env = "ADDR")]
    pub addr: String,

    /// Log format: "text" or "json"
    #[arg(long, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: String,

    /// Master key clients must present as a bearer token (unset disables auth)
    #[arg(long, env = "API_MASTER_KEY")]
    pub api_master_key: Option<String>,

    /// Upstream REST base URL
    #[arg(
        long,
        default_value = "https://api.machinetranslation.com/v1",
        env = "UPSTREAM_API_URL"
    )]
    pub upstream_api_url: String,

    /// Upstream socket base URL
    #[arg(
        long,
        default_value = "https://ss.machinetranslation.com",
        env = "UPSTREAM_SOCKET_URL"
    )]
    pub upstream_socket_url: String,

    /// Static credential for the upstream REST API
    #[arg(long, env = "UPSTREAM_API_KEY")]
    pub upstream_api_key: Option<String>,

    /// Source language code sent with every session
    #[arg(long, default_value = "auto", env = "SOURCE_LANG")]
    pub source_lang: String,

    /// Target language code sent with every session
    #[arg(long, default_value = "en", env = "TARGET_LANG")]
    pub target_lang: String,

    /// Comma-separated list of engines requested per translation
    #[arg(
        long,
        default_value = "chat_gpt,gemini,claude,libre,mistral_ai",
        env = "ENGINES"
    )]
    pub engines: String,

    /// Engine the upstream uses to score the final report
    #[arg(long, default_value = "gpt-4o-mini", env = "SCORER_MODEL")]
    pub scorer_model: String,

    /// Pseudo-model name selecting the best-scored translation
    #[arg(long, default_value = "machinetranslation-best", env = "BEST_MODEL")]
    pub best_model: String,

    /// Overall upstream request timeout in seconds
    #[arg(long, default_value_t = 120, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Total budget for the socket polling phase in seconds
    #[arg(long, default_value_t = 60, env = "SOCKET_TIMEOUT_SECS")]
    pub socket_timeout_secs: u64,

    /// Read timeout for a single poll request in seconds
    #[arg(long, default_value_t = 30, env = "POLL_TIMEOUT_SECS")]
    pub poll_timeout_secs: u64,

    /// Delay before fetching the scored report in seconds
    #[arg(long, default_value_t = 5, env = "REPORT_SETTLE_SECS")]
    pub report_settle_secs: u64,
}

/// Parse a comma-separated engine list, trimming whitespace and filtering
/// empties.
pub fn parse_engine_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
