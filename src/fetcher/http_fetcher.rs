use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use url::Url;

use crate::app::{Result, ScoutError};
use crate::config::DownloadConfig;
use crate::evasion::ChallengeDetector;
use crate::fetcher::{FetchResult, Route, MOBILE_USER_AGENT};

pub struct HttpFetcher {
    client: Client,
    detector: ChallengeDetector,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig, detector: ChallengeDetector) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, detector })
    }

    /// Request a page over plain HTTP.
    ///
    /// Verification pages come back as [`FetchResult::Challenged`]; other
    /// non-success statuses are errors.
    pub async fn get(&self, url: &str, route: Route) -> Result<FetchResult> {
        let mut headers = HeaderMap::new();
        if route == Route::Mobile {
            headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_USER_AGENT));
            if let Some(referer) = origin_referer(url) {
                if let Ok(value) = HeaderValue::from_str(&referer) {
                    headers.insert(REFERER, value);
                }
            }
        }

        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if self.detector.is_challenge(status.as_u16(), &body) {
            tracing::debug!(url, status = status.as_u16(), "challenge page served");
            return Ok(FetchResult::Challenged {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(ScoutError::Fetch(format!("HTTP {} for {}", status, url)));
        }

        Ok(FetchResult::Document(body))
    }
}

/// `https://host/` for a page URL.
fn origin_referer(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(format!("{}/", origin.ascii_serialization()))
}
