use async_trait::async_trait;
use rera_core::{ReraError, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Opaque reference to a located DOM element. Valid only until the window
/// it was found in navigates or closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Opaque reference to a browser window or tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// How to locate elements. The registry's markup sometimes only
/// distinguishes controls by their visible text, so a CSS selector can be
/// combined with a text needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    Text {
        css: &'static str,
        needle: &'static str,
    },
}

/// The rendering capability the scraper runs against: navigate, locate,
/// read, click, and juggle windows. Backed by Chrome in production and by
/// a scripted fake in tests. All operations act on the currently selected
/// window unless they take a handle.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// First match in the current window.
    async fn find(&self, locator: &Locator) -> Result<Option<ElementHandle>>;

    /// All matches in the current window, in document order.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// All matches among the descendants of `parent`.
    async fn find_in(&self, parent: ElementHandle, locator: &Locator) -> Result<Vec<ElementHandle>>;

    async fn text(&self, element: ElementHandle) -> Result<String>;

    async fn attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>>;

    /// Text of the nearest following sibling with the given tag name
    /// (`"*"` matches any tag), if one exists.
    async fn sibling_text(&self, element: ElementHandle, tag: &str) -> Result<Option<String>>;

    async fn is_enabled(&self, element: ElementHandle) -> Result<bool>;

    async fn scroll_into_view(&self, element: ElementHandle) -> Result<()>;

    /// Scripted click, tolerant of overlays that swallow plain UI clicks.
    async fn click(&self, element: ElementHandle) -> Result<()>;

    /// Escape key against the current window, used to dismiss modals whose
    /// close control cannot be found.
    async fn press_escape(&self) -> Result<()>;

    /// History-back in the current window.
    async fn back(&self) -> Result<()>;

    /// Every open window, oldest first.
    async fn windows(&self) -> Result<Vec<WindowHandle>>;

    async fn current_window(&self) -> Result<WindowHandle>;

    async fn switch_to(&self, window: WindowHandle) -> Result<()>;

    async fn close_window(&self, window: WindowHandle) -> Result<()>;

    /// Release the session. Best-effort; called on every exit path.
    async fn close(&self);
}

pub const ELEMENT_WAIT: Duration = Duration::from_secs(10);
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Bounded polling wait for at least one match. Stands in for the fixed
/// pauses of a driver without readiness signals wherever the DOM itself is
/// the signal.
pub async fn wait_for_all(
    session: &dyn BrowserSession,
    locator: &Locator,
    timeout: Duration,
) -> Result<Vec<ElementHandle>> {
    let deadline = Instant::now() + timeout;
    loop {
        let found = session.find_all(locator).await?;
        if !found.is_empty() {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Err(ReraError::PageTimeout(format!(
                "no element matched {:?} within {:?}",
                locator, timeout
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Fixed pause after an action with no observable completion signal
/// (script-driven navigation, tab opening, modal animation).
pub async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}
