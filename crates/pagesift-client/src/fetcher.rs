use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE, ETAG, HeaderMap, HeaderName, HeaderValue, LAST_MODIFIED};
use reqwest::{Client, StatusCode, redirect};

use pagesift_core::config::FetchConfig;
use pagesift_core::error::AppError;
use pagesift_core::guard::GuardDecision;
use pagesift_core::models::{FetchedPage, SourceInfo};
use pagesift_core::traits::PageFetcher;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// HTTP fetcher using reqwest.
///
/// Performs one bounded GET for a guard-approved URL: connect/read timeout,
/// a hard cap on redirect hops, and a hard cap on response size enforced
/// mid-transfer. Known limitation: redirect hops are followed by the HTTP
/// client without re-running the guard's host rules against each target;
/// only the initial URL is checked.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    config: FetchConfig,
}

impl ReqwestFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| AppError::service(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }
}

impl PageFetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        decision: &GuardDecision,
        headers: &HashMap<String, String>,
    ) -> Result<FetchedPage, AppError> {
        let extra = build_headers(headers)?;

        let mut response = self
            .client
            .get(&decision.href)
            .header(ACCEPT, ACCEPT_HTML)
            .headers(extra)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.config.timeout_ms)
                } else if e.is_redirect() {
                    AppError::service(format!(
                        "redirect limit of {} exceeded for {}",
                        self.config.max_redirects, decision.href
                    ))
                } else if e.is_connect() {
                    AppError::Network(format!("connection failed: {e}"))
                } else {
                    AppError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !acceptable_status(status) {
            return Err(AppError::Service {
                message: format!("upstream returned HTTP {} for {}", status.as_u16(), decision.href),
                status_code: Some(status.as_u16()),
            });
        }

        let cap = self.config.max_content_length_bytes;
        if let Some(declared) = response.content_length()
            && declared as usize > cap
        {
            return Err(AppError::service(format!(
                "response of {declared} bytes exceeds the {cap} byte limit"
            )));
        }

        let final_url = response.url().to_string();
        let content_type = header_string(response.headers(), CONTENT_TYPE);
        let etag = header_string(response.headers(), ETAG);
        let last_modified = header_string(response.headers(), LAST_MODIFIED);

        // Stream the body so an oversize transfer is aborted, not buffered.
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::Network(format!("failed reading response body: {e}")))?
        {
            if body.len() + chunk.len() > cap {
                return Err(AppError::service(format!(
                    "response exceeded the {cap} byte limit mid-transfer"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            html: String::from_utf8_lossy(&body).into_owned(),
            source_info: SourceInfo {
                fetched_url: decision.href.clone(),
                final_url,
                fetched_at: Utc::now(),
                status: status.as_u16(),
                content_type,
                etag,
                last_modified,
            },
        })
    }
}

/// 2xx and 3xx are acceptable; everything else is a service failure
/// carrying the upstream status.
fn acceptable_status(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

/// Build caller headers, omitting any entry with an empty value.
fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap, AppError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if value.trim().is_empty() {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AppError::Validation(format!("invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| AppError::Validation(format!("invalid value for header '{name}'")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
