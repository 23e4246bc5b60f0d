use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::packet::{self, Packet};
use super::{browser_headers, urls, EngineTranslation, ShareSession, UpstreamConfig, UpstreamError};

/// Event requesting translations from the configured engine list.
const TRANSLATION_REQUEST_EVENT: &str = "llm:translation:request";
/// Event carrying one engine's live translation.
const TRANSLATION_RESPONSE_EVENT: &str = "llm:translation:response";

/// States of the long-polling exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Init,
    Handshaking,
    Connected,
    Polling,
    /// Every expected engine responded.
    Complete,
    /// The session timeout elapsed first; partial results were kept.
    TimedOut,
    /// The upstream sent a connect-error packet.
    Rejected,
    /// Handshake or transport failure; whatever was accumulated is kept.
    Failed,
}

/// What one run of the polling flow produced.
#[derive(Debug)]
pub struct PollOutcome {
    pub translations: Vec<EngineTranslation>,
    pub phase: PollPhase,
}

/// Mutable per-session polling state.
struct PollState {
    sid: String,
    started: Instant,
    translations: Vec<EngineTranslation>,
}

#[derive(Deserialize)]
struct TranslationResponseEvent {
    #[serde(default)]
    llm: String,
    #[serde(default)]
    target_text: Option<String>,
}

/// Drives the handshake → connect → subscribe → poll loop exchange against
/// the upstream socket endpoint, entirely over sequential HTTP calls.
pub struct PollingClient {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
    engines: Vec<String>,
    session_timeout: Duration,
    poll_timeout: Duration,
}

impl PollingClient {
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            headers: browser_headers(),
            base_url: config.socket_base_url.clone(),
            engines: config.engines.clone(),
            session_timeout: config.session_timeout,
            poll_timeout: config.poll_timeout,
        }
    }

    /// Run the full exchange for one session.
    ///
    /// Never fails: every terminal condition returns the accumulated
    /// translations together with the phase the state machine stopped in,
    /// and the caller decides what a partial outcome means.
    pub async fn run(&self, session: &ShareSession) -> PollOutcome {
        let mut phase = PollPhase::Init;

        advance(&mut phase, PollPhase::Handshaking);
        let sid = match self.handshake().await {
            Ok(sid) => sid,
            Err(error) => {
                error!(%error, share_id = %session.id, "socket handshake failed");
                advance(&mut phase, PollPhase::Failed);
                return PollOutcome {
                    translations: Vec::new(),
                    phase,
                };
            }
        };

        advance(&mut phase, PollPhase::Connected);
        self.subscribe(&sid, session).await;

        advance(&mut phase, PollPhase::Polling);
        let mut state = PollState {
            sid,
            started: Instant::now(),
            translations: Vec::new(),
        };
        let terminal = self.poll_loop(&mut state).await;
        advance(&mut phase, terminal);

        PollOutcome {
            translations: state.translations,
            phase,
        }
    }

    /// Open the transport and extract the session id from the open packet.
    async fn handshake(&self) -> Result<String, UpstreamError> {
        let url = urls::transport_url(&self.base_url, Some(now_millis()), None)
            .map_err(UpstreamError::Handshake)?;

        let body = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| UpstreamError::Handshake(e.to_string()))?
            .text()
            .await
            .map_err(|e| UpstreamError::Handshake(e.to_string()))?;

        let sid = packet::decode_batch(&body)
            .into_iter()
            .find_map(|decoded| match decoded {
                Packet::Open(handshake) if !handshake.sid.is_empty() => Some(handshake.sid),
                _ => None,
            })
            .ok_or_else(|| UpstreamError::Handshake("no sid in handshake response".into()))?;

        debug!(sid = %sid, "socket handshake complete");
        Ok(sid)
    }

    /// Send the namespace connect carrying the share id, then the
    /// translation request event. Failures are logged only; the poll loop is
    /// the authority on whether the session is usable.
    async fn subscribe(&self, sid: &str, session: &ShareSession) {
        if let Err(error) = self
            .post_packet(sid, packet::encode_connect(&session.id))
            .await
        {
            warn!(error = %error, share_id = %session.id, "namespace connect post failed");
        }

        let request = json!({ "shareId": session.id, "llmList": self.engines });
        let event = packet::encode_event(TRANSLATION_REQUEST_EVENT, &request);
        if let Err(error) = self.post_packet(sid, event).await {
            warn!(error = %error, share_id = %session.id, "translation request post failed");
        }
    }

    /// Poll until every expected engine responded, the session timeout
    /// elapses, or the transport gives out.
    async fn poll_loop(&self, state: &mut PollState) -> PollPhase {
        let expected = self.engines.len();

        while state.translations.len() < expected {
            if state.started.elapsed() >= self.session_timeout {
                warn!(
                    collected = state.translations.len(),
                    expected, "session timeout elapsed with partial results"
                );
                return PollPhase::TimedOut;
            }

            let url = match urls::transport_url(
                &self.base_url,
                Some(now_millis()),
                Some(&state.sid),
            ) {
                Ok(url) => url,
                Err(error) => {
                    error!(error = %error, "failed to build poll URL");
                    return PollPhase::Failed;
                }
            };

            let response = self
                .http
                .get(&url)
                .headers(self.headers.clone())
                .timeout(self.poll_timeout)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            let body = match response {
                Ok(response) => match response.text().await {
                    Ok(body) => body,
                    Err(error) => {
                        error!(%error, "failed to read poll response");
                        return PollPhase::Failed;
                    }
                },
                // A read timeout on a single poll is a retryable no-op.
                Err(error) if error.is_timeout() => {
                    debug!("poll read timed out, retrying");
                    continue;
                }
                Err(error) => {
                    error!(%error, "poll transport error");
                    return PollPhase::Failed;
                }
            };

            for decoded in packet::decode_batch(&body) {
                match decoded {
                    Packet::Ping => self.send_pong(&state.sid).await,
                    Packet::ConnectError(raw) => {
                        warn!(packet = %raw, "upstream rejected the session");
                        return PollPhase::Rejected;
                    }
                    Packet::Event { name, payload } if name == TRANSLATION_RESPONSE_EVENT => {
                        match serde_json::from_value::<TranslationResponseEvent>(payload) {
                            Ok(event) => {
                                let translation = EngineTranslation {
                                    engine: event.llm,
                                    text: event.target_text.unwrap_or_default(),
                                    score: None,
                                };
                                info!(
                                    engine = %translation.engine,
                                    received = state.translations.len() + 1,
                                    expected,
                                    "live translation received"
                                );
                                state.translations.push(translation);
                            }
                            Err(error) => {
                                warn!(%error, "unparseable translation event payload");
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        PollPhase::Complete
    }

    /// Reply to a heartbeat probe. Sent before the next poll GET is issued.
    async fn send_pong(&self, sid: &str) {
        if let Err(error) = self.post_packet(sid, packet::encode_pong().to_string()).await {
            warn!(error = %error, "pong post failed");
        }
    }

    async fn post_packet(&self, sid: &str, body: String) -> Result<(), String> {
        let url = urls::transport_url(&self.base_url, None, Some(sid))?;
        self.http
            .post(&url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

fn advance(phase: &mut PollPhase, next: PollPhase) {
    debug!(from = ?*phase, to = ?next, "socket state");
    *phase = next;
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
