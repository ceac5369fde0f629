use crate::session::{BrowserSession, ElementHandle, Locator, WindowHandle};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rera_core::{ReraError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

fn driver_err(e: CdpError) -> ReraError {
    ReraError::Scraping(e.to_string())
}

struct SessionState {
    window_ids: HashMap<TargetId, WindowHandle>,
    windows: HashMap<WindowHandle, Page>,
    current: WindowHandle,
    elements: HashMap<ElementHandle, Arc<Element>>,
    next_window: u64,
    next_element: u64,
}

impl SessionState {
    fn register_window(&mut self, page: Page) -> WindowHandle {
        let target = page.target_id().clone();
        if let Some(handle) = self.window_ids.get(&target) {
            return *handle;
        }
        let handle = WindowHandle(self.next_window);
        self.next_window += 1;
        self.window_ids.insert(target, handle);
        self.windows.insert(handle, page);
        handle
    }

    fn register_elements(&mut self, elements: Vec<Element>) -> Vec<ElementHandle> {
        elements
            .into_iter()
            .map(|element| {
                let handle = ElementHandle(self.next_element);
                self.next_element += 1;
                self.elements.insert(handle, Arc::new(element));
                handle
            })
            .collect()
    }

    fn element(&self, handle: ElementHandle) -> Result<Arc<Element>> {
        self.elements
            .get(&handle)
            .cloned()
            .ok_or_else(|| ReraError::Scraping(format!("stale element handle {:?}", handle)))
    }

    /// Handles go stale whenever the current window's document is replaced.
    fn invalidate_elements(&mut self) {
        self.elements.clear();
    }
}

/// Chrome-backed [`BrowserSession`] over the DevTools protocol.
pub struct ChromeSession {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    state: Mutex<SessionState>,
}

impl ChromeSession {
    /// Launch Chrome with the hardening flags the registry tolerates and
    /// open an initial blank window.
    pub async fn launch(headless: bool) -> Result<Self> {
        let mut config = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", USER_AGENT));
        if !headless {
            config = config.with_head();
        }
        let config = config.build().map_err(ReraError::Setup)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ReraError::Setup(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ReraError::Setup(e.to_string()))?;

        info!("Chrome session established (headless: {})", headless);

        let mut state = SessionState {
            window_ids: HashMap::new(),
            windows: HashMap::new(),
            current: WindowHandle(0),
            elements: HashMap::new(),
            next_window: 0,
            next_element: 0,
        };
        let current = state.register_window(page);
        state.current = current;

        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            state: Mutex::new(state),
        })
    }

    async fn current_page(&self) -> Result<Page> {
        let state = self.state.lock().await;
        state
            .windows
            .get(&state.current)
            .cloned()
            .ok_or_else(|| ReraError::Scraping("current window is gone".to_string()))
    }

    async fn locate(&self, page: &Page, locator: &Locator) -> Vec<Element> {
        match locator {
            Locator::Css(css) => page.find_elements(*css).await.unwrap_or_default(),
            Locator::Text { css, needle } => {
                let mut matched = Vec::new();
                for element in page.find_elements(*css).await.unwrap_or_default() {
                    let text = element.inner_text().await.ok().flatten().unwrap_or_default();
                    if text.contains(needle) {
                        matched.push(element);
                    }
                }
                matched
            }
        }
    }

    async fn locate_in(&self, parent: &Element, locator: &Locator) -> Vec<Element> {
        match locator {
            Locator::Css(css) => parent.find_elements(*css).await.unwrap_or_default(),
            Locator::Text { css, needle } => {
                let mut matched = Vec::new();
                for element in parent.find_elements(*css).await.unwrap_or_default() {
                    let text = element.inner_text().await.ok().flatten().unwrap_or_default();
                    if text.contains(needle) {
                        matched.push(element);
                    }
                }
                matched
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        let page = self.current_page().await?;
        page.goto(url).await.map_err(driver_err)?;
        let _ = page.wait_for_navigation().await;
        self.state.lock().await.invalidate_elements();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.current_page().await?;
        Ok(page.url().await.map_err(driver_err)?.unwrap_or_default())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let page = self.current_page().await?;
        let elements = self.locate(&page, locator).await;
        Ok(self.state.lock().await.register_elements(elements))
    }

    async fn find_in(&self, parent: ElementHandle, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let parent = self.state.lock().await.element(parent)?;
        let elements = self.locate_in(&parent, locator).await;
        Ok(self.state.lock().await.register_elements(elements))
    }

    async fn text(&self, element: ElementHandle) -> Result<String> {
        let element = self.state.lock().await.element(element)?;
        Ok(element
            .inner_text()
            .await
            .map_err(driver_err)?
            .unwrap_or_default())
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>> {
        let element = self.state.lock().await.element(element)?;
        element.attribute(name).await.map_err(driver_err)
    }

    async fn sibling_text(&self, element: ElementHandle, tag: &str) -> Result<Option<String>> {
        let element = self.state.lock().await.element(element)?;
        let tag = tag.to_lowercase();
        let js = format!(
            "function() {{ \
                let node = this.nextElementSibling; \
                while (node) {{ \
                    if ('{tag}' === '*' || node.tagName.toLowerCase() === '{tag}') {{ return node.innerText; }} \
                    node = node.nextElementSibling; \
                }} \
                return null; \
            }}",
            tag = tag
        );
        let returned = element.call_js_fn(&js, false).await.map_err(driver_err)?;
        Ok(returned
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn is_enabled(&self, element: ElementHandle) -> Result<bool> {
        let element = self.state.lock().await.element(element)?;
        let returned = element
            .call_js_fn(
                "function() { return !(this.disabled || this.classList.contains('disabled')); }",
                false,
            )
            .await
            .map_err(driver_err)?;
        Ok(returned
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()> {
        let element = self.state.lock().await.element(element)?;
        element.scroll_into_view().await.map_err(driver_err)?;
        Ok(())
    }

    async fn click(&self, element: ElementHandle) -> Result<()> {
        let element = self.state.lock().await.element(element)?;
        element
            .call_js_fn("function() { this.click(); }", false)
            .await
            .map_err(driver_err)?;
        Ok(())
    }

    async fn press_escape(&self) -> Result<()> {
        let page = self.current_page().await?;
        let body = page.find_element("body").await.map_err(driver_err)?;
        body.press_key("Escape").await.map_err(driver_err)?;
        Ok(())
    }

    async fn back(&self) -> Result<()> {
        let page = self.current_page().await?;
        page.evaluate("window.history.back()")
            .await
            .map_err(driver_err)?;
        self.state.lock().await.invalidate_elements();
        Ok(())
    }

    async fn windows(&self) -> Result<Vec<WindowHandle>> {
        let pages = self.browser.lock().await.pages().await.map_err(driver_err)?;
        let mut state = self.state.lock().await;
        Ok(pages
            .into_iter()
            .map(|page| state.register_window(page))
            .collect())
    }

    async fn current_window(&self) -> Result<WindowHandle> {
        Ok(self.state.lock().await.current)
    }

    async fn switch_to(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.windows.contains_key(&window) {
            return Err(ReraError::Scraping(format!(
                "unknown window handle {:?}",
                window
            )));
        }
        state.current = window;
        state.invalidate_elements();
        Ok(())
    }

    async fn close_window(&self, window: WindowHandle) -> Result<()> {
        let page = {
            let mut state = self.state.lock().await;
            let page = state.windows.remove(&window);
            state.window_ids.retain(|_, handle| *handle != window);
            if state.current == window {
                state.invalidate_elements();
            }
            page
        };
        if let Some(page) = page {
            page.close().await.map_err(driver_err)?;
        }
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.browser.lock().await.close().await {
            debug!("browser shutdown error: {}", e);
        }
        self.handler_task.abort();
        info!("Browser session released");
    }
}
