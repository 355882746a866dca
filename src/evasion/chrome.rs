use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::app::{Result, ScoutError};
use crate::evasion::config::EvasionConfig;
use crate::evasion::script::{ProbeReport, ProbeScript};
use crate::evasion::PageRenderer;

/// Chromium-backed renderer using chromiumoxide.
///
/// The browser is launched on first use and shared by every page rendered
/// afterwards.
pub struct ChromeRenderer {
    browser: OnceCell<Browser>,
    config: EvasionConfig,
    probe: ProbeScript,
}

impl ChromeRenderer {
    pub fn new(config: EvasionConfig) -> Self {
        let probe = ProbeScript::new(config.clone());
        Self {
            browser: OnceCell::new(),
            config,
            probe,
        }
    }

    async fn browser(&self) -> Result<&Browser> {
        self.browser
            .get_or_try_init(|| launch(self.config.visible))
            .await
    }

    async fn wait_until_passed(&self, page: &Page, url: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.timeout();
        let script = self.probe.source();
        let mut announced = false;

        loop {
            let report = match page.evaluate(script.clone()).await {
                Ok(result) => result.into_value::<ProbeReport>().unwrap_or_default(),
                Err(e) => {
                    // Challenge pages reload themselves; the execution context
                    // disappears for a moment.
                    tracing::debug!(url, error = %e, "probe evaluation failed, retrying");
                    ProbeReport::default()
                }
            };

            if report.passed() {
                return Ok(());
            }

            if report.challenged && !announced {
                announced = true;
                if self.config.visible {
                    tracing::warn!(url, "verification page shown, solve it in the browser window");
                } else {
                    tracing::info!(url, "verification page detected, waiting for it to clear");
                }
            }

            if Instant::now() >= deadline {
                return Err(ScoutError::EvasionTimeout {
                    url: url.to_string(),
                    secs: self.config.timeout_secs,
                });
            }

            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    async fn render_page(&self, page: &Page, url: &str) -> Result<String> {
        page.wait_for_navigation()
            .await
            .map_err(|e| ScoutError::Browser(format!("Navigation failed: {}", e)))?;

        self.wait_until_passed(page, url).await?;

        // Late-rendered content (lazy catalog sections, reader body)
        tokio::time::sleep(self.config.settle()).await;

        page.content()
            .await
            .map_err(|e| ScoutError::Browser(format!("Failed to read page content: {}", e)))
    }
}

async fn launch(visible: bool) -> Result<Browser> {
    let mut builder = BrowserConfig::builder()
        .arg("--no-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-blink-features=AutomationControlled");

    if visible {
        builder = builder.with_head();
    }

    let browser_config = builder
        .build()
        .map_err(|e| ScoutError::Browser(format!("Failed to build browser config: {}", e)))?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        ScoutError::Browser(format!(
            "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
            e
        ))
    })?;

    tokio::spawn(async move {
        while let Some(_event) = handler.next().await {}
    });

    tracing::info!(visible, "browser launched");
    Ok(browser)
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let browser = self.browser().await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScoutError::Browser(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| ScoutError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        let result = match page.goto(url).await {
            Ok(_) => self.render_page(&page, url).await,
            Err(e) => Err(ScoutError::Browser(format!("Failed to open {}: {}", url, e))),
        };

        if let Err(e) = page.close().await {
            tracing::debug!(url, error = %e, "failed to close page");
        }

        if let Ok(ref html) = result {
            tracing::debug!(url, bytes = html.len(), "rendered page");
        }
        result
    }
}
