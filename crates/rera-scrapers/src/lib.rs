pub mod card;
pub mod chrome;
pub mod controller;
pub mod detail;
pub mod promoter;
pub mod session;
pub mod wiki;

pub use chrome::ChromeSession;
pub use controller::{
    developer_search, registration_lookup, summary_envelope, ScrapeController, ScrapeOptions,
    CARDS_PER_PAGE, DEFAULT_LISTING_URL,
};
pub use detail::DetailOutcome;
pub use session::{BrowserSession, ElementHandle, Locator, WindowHandle};
pub use wiki::{fetch_wikipedia_summary, WikiSummary};
