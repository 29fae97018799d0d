//! Chromium-backed [`RemoteClient`].
//!
//! One browser, one tab, for the whole run. Element lookups poll until the
//! implicit wait runs out, so callers never sleep themselves.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use cms_export_core::contract::{ClientError, RemoteClient};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// CDP modifier bits.
const MODIFIER_CTRL: i64 = 2;
const MODIFIER_META: i64 = 4;

/// Reads what a select-all left selected: the focused editor's textarea, the
/// document selection, or the CodeMirror instance inside `el` as a last resort.
const READ_SELECTION_JS: &str = r#"(function (el) {
    const active = document.activeElement;
    if (active && typeof active.selectionStart === "number") {
        const picked = active.value.substring(active.selectionStart, active.selectionEnd);
        if (picked.length > 0) { return picked; }
    }
    const selected = window.getSelection ? window.getSelection().toString() : "";
    if (selected.length > 0) { return selected; }
    const editor = el && el.querySelector(".CodeMirror");
    if (editor && editor.CodeMirror) { return editor.CodeMirror.getValue(); }
    return "";
})(document.querySelector(SELECTOR))"#;

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub implicit_wait: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            implicit_wait: Duration::from_secs(15),
        }
    }
}

pub struct BrowserSession {
    browser: Mutex<Browser>,
    handler: Mutex<Option<JoinHandle<()>>>,
    page: Page,
    implicit_wait: Duration,
}

impl BrowserSession {
    pub async fn launch(options: &BrowserOptions) -> Result<Self, ClientError> {
        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ClientError::Browser(format!("invalid browser config: {e}")))?;

        info!(headless = options.headless, "Launching browser");
        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
            debug!("Browser handler task completed");
        });

        let page = browser.new_page("about:blank").await.map_err(browser_error)?;
        Ok(Self {
            browser: Mutex::new(browser),
            handler: Mutex::new(Some(handler)),
            page,
            implicit_wait: options.implicit_wait,
        })
    }

    async fn find(&self, selector: &str, timeout: Duration) -> Result<Element, ClientError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) if Instant::now() >= deadline => {
                    debug!(error = %e, selector, "Element lookup gave up");
                    return Err(ClientError::ElementNotFound {
                        selector: selector.to_string(),
                    });
                }
                Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn press_with_modifier(&self, key: &str, code: &str, key_code: i64) -> Result<(), ClientError> {
        let modifiers = if cfg!(target_os = "macos") {
            MODIFIER_META
        } else {
            MODIFIER_CTRL
        };
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let params = DispatchKeyEventParams::builder()
                .r#type(kind)
                .modifiers(modifiers)
                .key(key)
                .code(code)
                .windows_virtual_key_code(key_code)
                .build()
                .map_err(ClientError::Browser)?;
            self.page.execute(params).await.map_err(browser_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteClient for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<(), ClientError> {
        debug!(url, "Navigating");
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| ClientError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn current_url(&self) -> Result<String, ClientError> {
        let url = self.page.url().await.map_err(browser_error)?;
        Ok(url.unwrap_or_default())
    }

    async fn current_document(&self) -> Result<String, ClientError> {
        self.page.content().await.map_err(browser_error)
    }

    async fn click(&self, selector: &str) -> Result<(), ClientError> {
        let element = self.find(selector, self.implicit_wait).await?;
        element.click().await.map_err(browser_error)?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ClientError> {
        let element = self.find(selector, self.implicit_wait).await?;
        element.click().await.map_err(browser_error)?;
        element.type_str(text).await.map_err(browser_error)?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ClientError> {
        match self.find(selector, timeout).await {
            Ok(_) => Ok(()),
            Err(ClientError::ElementNotFound { selector }) => {
                Err(ClientError::Timeout { selector, timeout })
            }
            Err(e) => Err(e),
        }
    }

    async fn copy_all(&self, selector: &str) -> Result<String, ClientError> {
        let element = self.find(selector, self.implicit_wait).await?;
        element.click().await.map_err(browser_error)?;
        self.press_with_modifier("a", "KeyA", 65).await?;
        self.press_with_modifier("c", "KeyC", 67).await?;

        let selector_literal = serde_json::to_string(selector)
            .map_err(|e| ClientError::Browser(e.to_string()))?;
        let script = READ_SELECTION_JS.replace("SELECTOR", &selector_literal);
        self.page
            .evaluate(script)
            .await
            .map_err(browser_error)?
            .into_value::<String>()
            .map_err(|e| ClientError::Browser(format!("selection was not text: {e}")))
    }

    async fn close(&self) -> Result<(), ClientError> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map(|_| ()).map_err(browser_error);
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
            if let Err(e) = handler.await {
                if !e.is_cancelled() {
                    error!(error = %e, "Browser handler task failed");
                }
            }
        }
        info!("Browser closed");
        closed
    }
}

fn browser_error(e: chromiumoxide::error::CdpError) -> ClientError {
    ClientError::Browser(e.to_string())
}
