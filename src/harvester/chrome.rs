use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::{GleanerError, Result};
use crate::harvester::config::HarvesterConfig;
use crate::harvester::extractor::RawCard;
use crate::harvester::scripts::PageScripts;
use crate::harvester::selectors::{selector_kind, SelectorConfig, SelectorKind};
use crate::harvester::session::ReviewSession;

/// Chrome-backed review session using chromiumoxide
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    scripts: PageScripts,
    timeout: Duration,
    closed: bool,
}

impl ChromeSession {
    /// Launch a browser and open a blank page
    pub async fn launch(config: &HarvesterConfig, selectors: SelectorConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg(format!("--lang={}", config.language_arg))
            .window_size(config.window_width, config.window_height)
            .request_timeout(config.script_timeout());

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| GleanerError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut events) = Browser::launch(browser_config).await.map_err(|e| {
            GleanerError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = events.next().await {}
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(GleanerError::Browser(format!("Failed to create page: {}", e)));
            }
        };

        if let Some(ref ua) = config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| GleanerError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(Self {
            browser,
            page,
            handler,
            scripts: PageScripts::new(selectors),
            timeout: config.script_timeout(),
            closed: false,
        })
    }

    /// Evaluate `script` in the page, treating a hang or a protocol failure
    /// as a rendering engine fault
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let result = tokio::time::timeout(self.timeout, self.page.evaluate(script))
            .await
            .map_err(|_| {
                GleanerError::RenderingEngine(format!(
                    "page did not answer within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| GleanerError::RenderingEngine(format!("Script execution failed: {}", e)))?;

        result
            .into_value()
            .map_err(|e| GleanerError::RenderingEngine(format!("Failed to parse result: {:?}", e)))
    }

    async fn find_element(&self, selector: &str) -> Result<Element> {
        let found = match selector_kind(selector) {
            SelectorKind::Css => self.page.find_element(selector).await,
            SelectorKind::XPath => self.page.find_xpath(selector).await,
        };
        found.map_err(|e| GleanerError::Navigation(format!("'{}' not found: {}", selector, e)))
    }
}

#[async_trait]
impl ReviewSession for ChromeSession {
    async fn open(&mut self, url: &str) -> Result<()> {
        debug!("Opening {}", url);
        tokio::time::timeout(self.timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .map_err(|_| GleanerError::Navigation(format!("Timed out loading {}", url)))?
        .map_err(|e| GleanerError::Navigation(format!("Failed to load {}: {}", url, e)))
    }

    async fn find_first(&mut self, chain: &[String]) -> Result<Option<usize>> {
        let index: i64 = self.eval(self.scripts.presence_script(chain)).await?;
        Ok(usize::try_from(index).ok())
    }

    async fn click(&mut self, selector: &str) -> Result<bool> {
        self.eval(self.scripts.click_script(selector)).await
    }

    async fn submit_search(&mut self, input_selector: &str, query: &str) -> Result<()> {
        let input = self.find_element(input_selector).await?;
        let typing = async {
            input.click().await?;
            input
                .call_js_fn("function() { this.value = ''; }", false)
                .await?;
            input.type_str(query).await?;
            input.press_key("Enter").await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        typing
            .await
            .map_err(|e| GleanerError::Navigation(format!("Failed to submit search: {}", e)))
    }

    async fn expand_cards(&mut self, seen_ids: &[String], limit: usize) -> Result<usize> {
        if limit == 0 {
            return Ok(0);
        }
        self.eval(self.scripts.expand_script(seen_ids, limit)).await
    }

    async fn collect_cards(&mut self, seen_ids: &[String]) -> Result<Vec<RawCard>> {
        self.eval(self.scripts.collect_script(seen_ids)).await
    }

    async fn scroll_reviews(&mut self) -> Result<bool> {
        self.eval(self.scripts.scroll_script()).await
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let outcome = shut_down(&mut self.browser, self.timeout).await;
        self.handler.abort();
        let outcome = outcome?;
        debug!("Browser shut down: {:?}", outcome);
        Ok(())
    }
}

/// The parts of a browser process the shutdown sequence needs.
#[async_trait]
trait BrowserProcess: Send {
    /// Ask the browser to close itself.
    async fn request_close(&mut self) -> Result<()>;

    /// Wait for the process to exit.
    async fn wait_exit(&mut self) -> Result<()>;

    async fn force_kill(&mut self) -> Result<()>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> Result<()> {
        self.close()
            .await
            .map(|_| ())
            .map_err(|e| GleanerError::Browser(format!("Failed to close browser: {}", e)))
    }

    async fn wait_exit(&mut self) -> Result<()> {
        self.wait().await.map(|_| ()).map_err(GleanerError::Io)
    }

    async fn force_kill(&mut self) -> Result<()> {
        match self.kill().await {
            Some(result) => result.map_err(GleanerError::Io),
            // Not a child of ours, nothing to kill.
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Clean,
    Killed,
}

/// Close `browser` and wait for it to exit, each step bounded by `limit`.
/// A browser that refuses or stays alive is killed.
async fn shut_down<B: BrowserProcess + ?Sized>(browser: &mut B, limit: Duration) -> Result<Shutdown> {
    let asked = match tokio::time::timeout(limit, browser.request_close()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("{}", e);
            false
        }
        Err(_) => {
            warn!("Browser did not acknowledge close within {:?}", limit);
            false
        }
    };

    if asked {
        match tokio::time::timeout(limit, browser.wait_exit()).await {
            Ok(Ok(())) => return Ok(Shutdown::Clean),
            Ok(Err(e)) => warn!("Waiting for browser exit failed: {}", e),
            Err(_) => warn!("Browser still running {:?} after close", limit),
        }
    }

    match tokio::time::timeout(limit, browser.force_kill()).await {
        Ok(Ok(())) => {
            info!("Browser process killed");
            Ok(Shutdown::Killed)
        }
        Ok(Err(e)) => Err(GleanerError::Browser(format!("Failed to kill browser: {}", e))),
        Err(_) => Err(GleanerError::Browser(format!(
            "browser process survived kill for {:?}",
            limit
        ))),
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
