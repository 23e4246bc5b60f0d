use std::time::{Duration, SystemTime};

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    browser_headers, urls, EngineTranslation, ScoredReport, ShareSession, UpstreamConfig,
    UpstreamError,
};

/// Header carrying the static upstream credential on REST calls.
const API_KEY_HEADER: &str = "api-key";

/// REST client for opening a translation share session and later fetching
/// its scored report.
pub struct SessionClient {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
    api_key: String,
    source_lang: String,
    target_lang: String,
    scorer: String,
    settle_delay: Duration,
}

#[derive(Serialize)]
struct ShareIdRequest<'a> {
    text: &'a str,
    source_language_code: &'a str,
    target_language_code: &'a str,
    // Placeholder fields the upstream's own web client always sends.
    s3_file_path: Option<()>,
    total_words: Option<()>,
    secure_mode: bool,
    total_words_in_file: Option<()>,
    is_doc_translation_disabled: bool,
    doc_translation_disabled_reason: &'a str,
}

#[derive(Deserialize)]
struct ShareIdResponse {
    #[serde(default)]
    share_id: Option<String>,
}

#[derive(Deserialize)]
struct ReportResponse {
    #[serde(default)]
    translations: Vec<EngineTranslation>,
}

impl SessionClient {
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            headers: browser_headers(),
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            scorer: config.scorer.clone(),
            settle_delay: config.settle_delay,
        }
    }

    /// Open a share session for one piece of source text.
    pub async fn open_session(&self, text: &str) -> Result<ShareSession, UpstreamError> {
        let url = urls::endpoint_url(&self.base_url, "translation/share-id")
            .map_err(UpstreamError::SessionCreation)?;

        let body = ShareIdRequest {
            text,
            source_language_code: &self.source_lang,
            target_language_code: &self.target_lang,
            s3_file_path: None,
            total_words: None,
            secure_mode: false,
            total_words_in_file: None,
            is_doc_translation_disabled: false,
            doc_translation_disabled_reason: "",
        };

        let response = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| UpstreamError::SessionCreation(e.to_string()))?;

        let parsed: ShareIdResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::SessionCreation(e.to_string()))?;

        let share_id = match parsed.share_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(UpstreamError::SessionCreation(
                    "response missing share_id".into(),
                ))
            }
        };

        info!(share_id = %share_id, "opened translation share session");

        Ok(ShareSession {
            id: share_id,
            text: text.to_string(),
            source_lang: self.source_lang.clone(),
            target_lang: self.target_lang.clone(),
            created_at: SystemTime::now(),
        })
    }

    /// Fetch the scored report for a session whose live phase has ended.
    ///
    /// The upstream needs a moment after the live phase to finish scoring,
    /// hence the configurable settle delay before the call.
    pub async fn fetch_report(&self, session: &ShareSession) -> Result<ScoredReport, UpstreamError> {
        tokio::time::sleep(self.settle_delay).await;

        let path = format!("translation/score_test/{}/{}", session.id, self.scorer);
        let url =
            urls::endpoint_url(&self.base_url, &path).map_err(UpstreamError::ReportFetch)?;

        debug!(share_id = %session.id, scorer = %self.scorer, "fetching scored report");

        let response = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .body("")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| UpstreamError::ReportFetch(e.to_string()))?;

        let parsed: ReportResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::ReportFetch(e.to_string()))?;

        if parsed.translations.is_empty() {
            return Err(UpstreamError::EmptyTranslationSet);
        }

        info!(
            share_id = %session.id,
            engines = parsed.translations.len(),
            "scored report received"
        );

        Ok(ScoredReport {
            share_id: session.id.clone(),
            translations: parsed.translations,
        })
    }
}
