use std::sync::Arc;

use async_trait::async_trait;

use crate::app::{Result, ScoutError};
use crate::evasion::PageRenderer;
use crate::fetcher::{FetchResult, Fetcher, HttpFetcher, Route};

/// Plain HTTP first, browser when the site pushes back.
///
/// With no renderer configured, challenge pages surface as fetch errors and
/// browser routes degrade to plain requests.
pub struct EvasiveFetcher {
    http: HttpFetcher,
    renderer: Option<Arc<dyn PageRenderer>>,
    browser_always: bool,
}

impl EvasiveFetcher {
    pub fn new(http: HttpFetcher, renderer: Option<Arc<dyn PageRenderer>>) -> Self {
        Self {
            http,
            renderer,
            browser_always: false,
        }
    }

    /// Send every desktop request through the browser, for manual solving.
    pub fn browser_always(mut self, enabled: bool) -> Self {
        self.browser_always = enabled;
        self
    }

    async fn plain(&self, url: &str, route: Route) -> Result<String> {
        match self.http.get(url, route).await? {
            FetchResult::Document(body) => Ok(body),
            FetchResult::Challenged { status } => match self.renderer {
                Some(ref renderer) => {
                    tracing::info!(url, status, "challenge page, retrying in browser");
                    renderer.render(url).await
                }
                None => Err(ScoutError::Fetch(format!(
                    "verification page (HTTP {}) at {} and the browser fallback is disabled",
                    status, url
                ))),
            },
        }
    }
}

#[async_trait]
impl Fetcher for EvasiveFetcher {
    async fn fetch(&self, url: &str, route: Route) -> Result<String> {
        let wants_browser = route == Route::Browser || (self.browser_always && route == Route::Direct);

        match (wants_browser, &self.renderer) {
            (true, Some(renderer)) => renderer.render(url).await,
            (true, None) => self.plain(url, Route::Direct).await,
            (false, _) => self.plain(url, route).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DownloadConfig;
    use crate::evasion::{ChallengeDetector, EvasionConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingRenderer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageRenderer for CountingRenderer {
        async fn render(&self, _url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("<div class=\"chapter-li-a\">rendered</div>".into())
        }
    }

    fn http() -> HttpFetcher {
        let detector = ChallengeDetector::new(&EvasionConfig::default().challenge_markers);
        HttpFetcher::new(&DownloadConfig::default(), detector).unwrap()
    }

    async fn server_with(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_plain_document_skips_browser() {
        let server = server_with(200, "<p>plain</p>").await;
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });
        let fetcher = EvasiveFetcher::new(http(), Some(renderer.clone()));

        let body = fetcher.fetch(&server.uri(), Route::Direct).await.unwrap();
        assert_eq!(body, "<p>plain</p>");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_challenge_falls_back_to_browser() {
        let server = server_with(403, "<title>Security checking</title>").await;
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });
        let fetcher = EvasiveFetcher::new(http(), Some(renderer.clone()));

        let body = fetcher.fetch(&server.uri(), Route::Direct).await.unwrap();
        assert!(body.contains("rendered"));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_challenge_without_renderer_is_transient_error() {
        let server = server_with(503, "<title>Just a moment...</title>").await;
        let fetcher = EvasiveFetcher::new(http(), None);

        let err = fetcher.fetch(&server.uri(), Route::Direct).await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("verification page"));
    }

    #[tokio::test]
    async fn test_browser_route_and_visible_mode() {
        let server = server_with(200, "<p>plain</p>").await;
        let renderer = Arc::new(CountingRenderer {
            calls: AtomicUsize::new(0),
        });

        let fetcher = EvasiveFetcher::new(http(), Some(renderer.clone()));
        fetcher.fetch(&server.uri(), Route::Browser).await.unwrap();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

        let visible = EvasiveFetcher::new(http(), Some(renderer.clone())).browser_always(true);
        visible.fetch(&server.uri(), Route::Direct).await.unwrap();
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);

        // the mobile route is the plain-HTTP escape hatch and never renders
        let body = visible.fetch(&server.uri(), Route::Mobile).await.unwrap();
        assert_eq!(body, "<p>plain</p>");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_browser_route_without_renderer_uses_http() {
        let server = server_with(200, "<p>plain</p>").await;
        let fetcher = EvasiveFetcher::new(http(), None);
        let body = fetcher.fetch(&server.uri(), Route::Browser).await.unwrap();
        assert_eq!(body, "<p>plain</p>");
    }
}
