pub mod errors;
pub mod packet;
pub mod polling;
pub mod session;
pub mod urls;

pub use errors::UpstreamError;

use std::time::{Duration, SystemTime};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use serde::Deserialize;
use tracing::{info, warn};

use polling::{PollPhase, PollingClient};
use session::SessionClient;

/// Upstream connection settings, assembled from process configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_base_url: String,
    pub socket_base_url: String,
    pub api_key: String,
    pub source_lang: String,
    pub target_lang: String,
    pub engines: Vec<String>,
    pub scorer: String,
    pub best_model: String,
    /// Total budget for the live polling phase.
    pub session_timeout: Duration,
    /// Read timeout for a single poll request.
    pub poll_timeout: Duration,
    /// Wait before fetching the scored report.
    pub settle_delay: Duration,
}

/// One request's upstream session handle. Owned by exactly one request and
/// discarded when that request completes.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ShareSession {
    pub id: String,
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub created_at: SystemTime,
}

/// A single engine's translation. The score stays empty until the scored
/// report replaces the live results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineTranslation {
    #[serde(default)]
    pub engine: String,
    #[serde(default, rename = "target_text")]
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// The final per-engine translation set for one share session.
#[derive(Debug, Clone)]
pub struct ScoredReport {
    #[allow(dead_code)]
    pub share_id: String,
    pub translations: Vec<EngineTranslation>,
}

/// The machinetranslation.com adapter: share session, long-polling socket
/// exchange, scored report. One short-lived upstream session per request.
pub struct MachineTranslation {
    sessions: SessionClient,
    polling: PollingClient,
    best_model: String,
}

impl MachineTranslation {
    pub fn new(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self {
            best_model: config.best_model.clone(),
            sessions: SessionClient::new(http.clone(), &config),
            polling: PollingClient::new(http, &config),
        }
    }

    /// Run the whole pipeline for one chat request and render the markdown
    /// answer. All steps are strictly sequential; the session is discarded
    /// when this returns.
    pub async fn translate(&self, text: &str, model: &str) -> Result<String, UpstreamError> {
        let session = self.sessions.open_session(text).await?;

        let outcome = self.polling.run(&session).await;
        match outcome.phase {
            PollPhase::Complete => {
                info!(
                    share_id = %session.id,
                    engines = outcome.translations.len(),
                    "live polling complete"
                );
            }
            phase => {
                // Scores can exist server-side even when the socket flow came
                // up short, so the report fetch still runs.
                warn!(
                    share_id = %session.id,
                    ?phase,
                    collected = outcome.translations.len(),
                    "live polling ended early, fetching report anyway"
                );
            }
        }

        let report = self.sessions.fetch_report(&session).await?;
        Ok(crate::report::render_markdown(model, &self.best_model, &report))
    }
}

/// Headers the upstream expects on every call, matching its own web client.
pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(
        ORIGIN,
        HeaderValue::from_static("https://www.machinetranslation.com"),
    );
    headers.insert(
        REFERER,
        HeaderValue::from_static("https://www.machinetranslation.com/"),
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36",
        ),
    );
    headers
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Config pointed at mock servers, with delays shrunk for tests.
    pub(crate) fn test_config(api_url: &str, socket_url: &str, engines: &[&str]) -> UpstreamConfig {
        UpstreamConfig {
            api_base_url: api_url.to_string(),
            socket_base_url: socket_url.to_string(),
            api_key: "test-key".into(),
            source_lang: "auto".into(),
            target_lang: "en".into(),
            engines: engines.iter().map(|e| e.to_string()).collect(),
            scorer: "scorer".into(),
            best_model: "mt-best".into(),
            session_timeout: Duration::from_millis(500),
            poll_timeout: Duration::from_millis(200),
            settle_delay: Duration::ZERO,
        }
    }

    /// Mount the standard happy-path socket mocks: handshake, then one poll
    /// response carrying an event per engine, plus a catch-all for POSTs.
    pub(crate) async fn mount_socket_flow(server: &MockServer, engines: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/socket.io/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"0{"sid":"sock-1","pingInterval":25000,"pingTimeout":20000}"#),
            )
            .up_to_n_times(1)
            .mount(server)
            .await;

        let events: Vec<String> = engines
            .iter()
            .map(|engine| {
                format!(r#"42["llm:translation:response",{{"llm":"{engine}"}}]"#)
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/socket.io/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(events.join(&packet::RECORD_SEPARATOR.to_string())),
            )
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/socket.io/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_translate_happy_path_prefers_best_score() {
        let api = MockServer::start().await;
        let socket = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translation/share-id"))
            .and(body_string_contains("\"text\":\"Hello\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "share_id": "abc123"
            })))
            .expect(1)
            .mount(&api)
            .await;

        mount_socket_flow(&socket, &["gemini", "claude"]).await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/translation/score_test/abc123/scorer$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [
                    {"engine": "gemini", "target_text": "Hallo", "score": 0.8},
                    {"engine": "claude", "target_text": "Hallo Welt", "score": 0.95},
                ]
            })))
            .expect(1)
            .mount(&api)
            .await;

        let upstream = MachineTranslation::new(
            reqwest::Client::new(),
            test_config(&api.uri(), &socket.uri(), &["gemini", "claude"]),
        );

        let markdown = upstream.translate("Hello", "mt-best").await.unwrap();
        assert!(markdown.starts_with("Hallo Welt"));
        assert!(markdown.contains("Detailed Translation Report"));
        assert!(markdown.contains("**Model: gemini** (score: 0.80)"));
    }

    #[tokio::test]
    async fn test_translate_missing_share_id_skips_protocol_calls() {
        let api = MockServer::start().await;
        let socket = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translation/share-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&api)
            .await;

        let upstream = MachineTranslation::new(
            reqwest::Client::new(),
            test_config(&api.uri(), &socket.uri(), &["gemini"]),
        );

        let err = upstream.translate("Hello", "mt-best").await.unwrap_err();
        assert!(matches!(err, UpstreamError::SessionCreation(_)));

        let socket_requests = socket.received_requests().await.unwrap();
        assert!(
            socket_requests.is_empty(),
            "no protocol calls should be attempted without a session id"
        );
    }

    #[tokio::test]
    async fn test_translate_proceeds_to_report_after_failed_polling() {
        // Socket flow produces nothing (handshake refused), yet the report
        // fetch still runs and the request succeeds from its results alone.
        let api = MockServer::start().await;
        let socket = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translation/share-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "share_id": "abc123"
            })))
            .mount(&api)
            .await;

        Mock::given(method("GET"))
            .and(path("/socket.io/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&socket)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/translation/score_test/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": [{"engine": "gemini", "target_text": "Hallo", "score": 0.5}]
            })))
            .expect(1)
            .mount(&api)
            .await;

        let upstream = MachineTranslation::new(
            reqwest::Client::new(),
            test_config(&api.uri(), &socket.uri(), &["gemini"]),
        );

        let markdown = upstream.translate("Hello", "mt-best").await.unwrap();
        assert!(markdown.starts_with("Hallo"));
    }

    #[tokio::test]
    async fn test_translate_empty_report_is_fatal() {
        let api = MockServer::start().await;
        let socket = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translation/share-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "share_id": "abc123"
            })))
            .mount(&api)
            .await;

        mount_socket_flow(&socket, &["gemini"]).await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/translation/score_test/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": []
            })))
            .mount(&api)
            .await;

        let upstream = MachineTranslation::new(
            reqwest::Client::new(),
            test_config(&api.uri(), &socket.uri(), &["gemini"]),
        );

        let err = upstream.translate("Hello", "mt-best").await.unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyTranslationSet));
    }
}
