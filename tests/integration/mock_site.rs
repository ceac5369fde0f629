//! Scripted in-memory stand-in for a Chrome session, driving the scraper
//! through every navigation mode the live registry exhibits.

use async_trait::async_trait;
use rera_core::{ReraError, Result};
use rera_scrapers::{BrowserSession, ElementHandle, Locator, WindowHandle};
use std::collections::HashMap;
use std::sync::Mutex;

/// What clicking a card's "View Details" control does.
#[derive(Clone, Default)]
pub enum DetailBehavior {
    /// No "View Details" control at all.
    #[default]
    None,
    /// Opens the detail page in a new tab.
    NewWindow(DetailContent),
    /// Navigates the listing window itself to the detail page.
    SameWindow(DetailContent),
    /// Opens an in-page modal over the listing.
    Modal(ModalContent),
    /// The click itself raises (overlay swallowed it).
    ClickFails,
}

#[derive(Clone, Default)]
pub struct DetailContent {
    pub url: String,
    pub description: String,
    pub total_area: String,
    pub promoter_tab: bool,
    pub tab_active: bool,
    pub promoter_panels: Vec<String>,
}

#[derive(Clone, Default)]
pub struct ModalContent {
    pub text: String,
    pub promoter_panels: Vec<String>,
    pub has_close_control: bool,
}

#[derive(Clone, Default)]
pub struct CardSpec {
    /// Empty title renders the card invalid.
    pub title: String,
    /// Raw text of the `<small>` element, e.g. "by ABC Builders".
    pub developer_line: String,
    /// `.label-control` label texts paired with their `<strong>` sibling.
    pub labels: Vec<(String, String)>,
    pub units: String,
    /// Empty string means the `.fw-bold` element is absent.
    pub registration: String,
    pub certificate_href: String,
    pub detail: DetailBehavior,
}

impl CardSpec {
    pub fn basic(title: &str, developer: &str, registration: &str) -> Self {
        Self {
            title: title.to_string(),
            developer_line: format!("by {}", developer),
            labels: vec![
                ("Address".to_string(), format!("Plot 1, {}", title)),
                ("Project Type".to_string(), "Apartment".to_string()),
                ("Started From".to_string(), "Jan 2023".to_string()),
                ("Possession by".to_string(), "Dec 2026".to_string()),
            ],
            units: "120 Units".to_string(),
            registration: registration.to_string(),
            certificate_href: format!("https://registry.example/cert/{}.pdf", title),
            detail: DetailBehavior::None,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockSite {
    pub listing_url: String,
    pub pages: Vec<Vec<CardSpec>>,
    /// Paragraph texts served for a Wikipedia URL.
    pub wiki_paragraphs: Vec<String>,
}

#[derive(Clone)]
enum View {
    Listing,
    Detail(DetailContent),
    Wiki,
    Blank,
}

#[derive(Clone)]
struct Window {
    handle: WindowHandle,
    url: String,
    view: View,
}

#[derive(Clone)]
enum Node {
    Card(usize),
    CardTitle(usize),
    CardSmall(usize),
    CardLabel(usize, usize),
    CardUnits(usize),
    CardRegistration(usize),
    CardCertificate(usize),
    ViewDetails(usize),
    NextControl,
    ModalRoot,
    ModalClose,
    PromoterTab,
    PromoterRegion,
    PromoterPanel(usize),
    Description,
    TotalAreaLabel,
    WikiParagraph(usize),
}

struct State {
    page_index: usize,
    windows: Vec<Window>,
    current: usize,
    open_modal: Option<ModalContent>,
    nodes: HashMap<u64, Node>,
    next_node: u64,
    next_window: u64,
    next_activations: u32,
    tab_clicks: u32,
    escape_presses: u32,
    closed: bool,
}

pub struct MockSession {
    site: MockSite,
    state: Mutex<State>,
}

impl MockSession {
    pub fn new(site: MockSite) -> Self {
        let state = State {
            page_index: 0,
            windows: vec![Window {
                handle: WindowHandle(0),
                url: "about:blank".to_string(),
                view: View::Blank,
            }],
            current: 0,
            open_modal: None,
            nodes: HashMap::new(),
            next_node: 0,
            next_window: 1,
            next_activations: 0,
            tab_clicks: 0,
            escape_presses: 0,
            closed: false,
        };
        Self {
            site,
            state: Mutex::new(state),
        }
    }

    pub fn next_activations(&self) -> u32 {
        self.state.lock().unwrap().next_activations
    }

    pub fn tab_clicks(&self) -> u32 {
        self.state.lock().unwrap().tab_clicks
    }

    pub fn escape_presses(&self) -> u32 {
        self.state.lock().unwrap().escape_presses
    }

    pub fn modal_open(&self) -> bool {
        self.state.lock().unwrap().open_modal.is_some()
    }

    pub fn window_count(&self) -> usize {
        self.state.lock().unwrap().windows.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl State {
    fn register(&mut self, node: Node) -> ElementHandle {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(id, node);
        ElementHandle(id)
    }

    fn node(&self, handle: ElementHandle) -> Result<Node> {
        self.nodes
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| ReraError::Scraping(format!("unknown element {:?}", handle)))
    }

    fn current_window(&self) -> &Window {
        &self.windows[self.current]
    }

    fn on_listing(&self) -> bool {
        matches!(self.current_window().view, View::Listing)
    }

    /// The promoter content visible right now: an open modal shadows
    /// whatever detail view is underneath.
    fn active_panels(&self) -> Vec<String> {
        if let Some(modal) = &self.open_modal {
            return modal.promoter_panels.clone();
        }
        match &self.current_window().view {
            View::Detail(content) => content.promoter_panels.clone(),
            _ => Vec::new(),
        }
    }

    fn active_detail(&self) -> Option<DetailContent> {
        if self.open_modal.is_some() {
            return None;
        }
        match &self.current_window().view {
            View::Detail(content) => Some(content.clone()),
            _ => None,
        }
    }

    fn promoter_tab_present(&self) -> bool {
        if self.open_modal.is_some() {
            return false;
        }
        matches!(&self.current_window().view, View::Detail(content) if content.promoter_tab)
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let view = if url.contains("wikipedia.org") {
            View::Wiki
        } else if url == self.site.listing_url {
            state.page_index = 0;
            View::Listing
        } else {
            View::Blank
        };
        let current = state.current;
        state.windows[current].url = url.to_string();
        state.windows[current].view = view;
        state.open_modal = None;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().current_window().url.clone())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let mut state = self.state.lock().unwrap();
        let page_index = state.page_index;
        let cards = self.site.pages.get(page_index).cloned().unwrap_or_default();

        let nodes: Vec<Node> = match locator {
            Locator::Css(css) => match *css {
                ".project-card" if state.on_listing() => {
                    (0..cards.len()).map(Node::Card).collect()
                }
                ".modal-content" if state.open_modal.is_some() => vec![Node::ModalRoot],
                ".promoter" | "div.promoter" if !state.active_panels().is_empty() => {
                    vec![Node::PromoterRegion]
                }
                ".project-description, .description" => match state.active_detail() {
                    Some(content) if !content.description.is_empty() => vec![Node::Description],
                    _ => Vec::new(),
                },
                "div.mw-parser-output > p"
                    if matches!(state.current_window().view, View::Wiki) =>
                {
                    (0..self.site.wiki_paragraphs.len())
                        .map(Node::WikiParagraph)
                        .collect()
                }
                _ => Vec::new(),
            },
            Locator::Text { css, needle } => match (*css, *needle) {
                ("a", "Next") if state.on_listing() && self.site.pages.len() > 1 => {
                    vec![Node::NextControl]
                }
                ("a", "Promoter Details") | ("a", "Promoters Details")
                | ("li.nav-item a", "Promoter")
                    if state.promoter_tab_present() =>
                {
                    vec![Node::PromoterTab]
                }
                ("label", "Total Area") => match state.active_detail() {
                    Some(content) if !content.total_area.is_empty() => {
                        vec![Node::TotalAreaLabel]
                    }
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            },
        };

        Ok(nodes.into_iter().map(|n| state.register(n)).collect())
    }

    async fn find_in(&self, parent: ElementHandle, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let mut state = self.state.lock().unwrap();
        let parent = state.node(parent)?;
        let page_index = state.page_index;
        let cards = self.site.pages.get(page_index).cloned().unwrap_or_default();

        let nodes: Vec<Node> = match (&parent, locator) {
            (Node::Card(i), Locator::Css(css)) => {
                let Some(card) = cards.get(*i) else {
                    return Ok(Vec::new());
                };
                match *css {
                    ".card-title" if !card.title.is_empty() => vec![Node::CardTitle(*i)],
                    "small" if !card.developer_line.is_empty() => vec![Node::CardSmall(*i)],
                    ".label-control" => {
                        (0..card.labels.len()).map(|j| Node::CardLabel(*i, j)).collect()
                    }
                    ".apartment-unit strong" if !card.units.is_empty() => {
                        vec![Node::CardUnits(*i)]
                    }
                    ".fw-bold" if !card.registration.is_empty() => {
                        vec![Node::CardRegistration(*i)]
                    }
                    ".icon-pdf" if !card.certificate_href.is_empty() => {
                        vec![Node::CardCertificate(*i)]
                    }
                    _ => Vec::new(),
                }
            }
            (
                Node::Card(i),
                Locator::Text {
                    css: "a",
                    needle: "View Details",
                },
            ) => match cards.get(*i).map(|c| &c.detail) {
                Some(DetailBehavior::None) | None => Vec::new(),
                Some(_) => vec![Node::ViewDetails(*i)],
            },
            (Node::PromoterRegion, Locator::Css(".card-body")) => (0..state
                .active_panels()
                .len())
                .map(Node::PromoterPanel)
                .collect(),
            (Node::ModalRoot, Locator::Css(".close, .btn-close, [data-dismiss='modal']")) => {
                match &state.open_modal {
                    Some(modal) if modal.has_close_control => vec![Node::ModalClose],
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        };

        Ok(nodes.into_iter().map(|n| state.register(n)).collect())
    }

    async fn text(&self, element: ElementHandle) -> Result<String> {
        let state = self.state.lock().unwrap();
        let cards = self.site.pages.get(state.page_index).cloned().unwrap_or_default();
        let text = match state.node(element)? {
            Node::CardTitle(i) => cards.get(i).map(|c| c.title.clone()),
            Node::CardSmall(i) => cards.get(i).map(|c| c.developer_line.clone()),
            Node::CardLabel(i, j) => cards
                .get(i)
                .and_then(|c| c.labels.get(j))
                .map(|(label, _)| label.clone()),
            Node::CardUnits(i) => cards.get(i).map(|c| c.units.clone()),
            Node::CardRegistration(i) => cards.get(i).map(|c| c.registration.clone()),
            Node::ModalRoot => state.open_modal.as_ref().map(|m| m.text.clone()),
            Node::PromoterPanel(k) => state.active_panels().get(k).cloned(),
            Node::Description => state.active_detail().map(|c| c.description),
            Node::TotalAreaLabel => Some("Total Area".to_string()),
            Node::WikiParagraph(k) => self.site.wiki_paragraphs.get(k).cloned(),
            Node::NextControl => Some("Next".to_string()),
            Node::ViewDetails(_) => Some("View Details".to_string()),
            _ => Some(String::new()),
        };
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let cards = self.site.pages.get(state.page_index).cloned().unwrap_or_default();
        Ok(match (state.node(element)?, name) {
            (Node::CardCertificate(i), "href") => cards.get(i).map(|c| c.certificate_href.clone()),
            (Node::PromoterTab, "class") => {
                let active = matches!(
                    state.active_detail(),
                    Some(content) if content.tab_active
                );
                Some(if active {
                    "nav-link active".to_string()
                } else {
                    "nav-link".to_string()
                })
            }
            _ => None,
        })
    }

    async fn sibling_text(&self, element: ElementHandle, tag: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let cards = self.site.pages.get(state.page_index).cloned().unwrap_or_default();
        Ok(match (state.node(element)?, tag) {
            (Node::CardLabel(i, j), "strong") => cards
                .get(i)
                .and_then(|c| c.labels.get(j))
                .map(|(_, value)| value.clone()),
            (Node::TotalAreaLabel, "*") => state.active_detail().map(|c| c.total_area),
            _ => None,
        })
    }

    async fn is_enabled(&self, element: ElementHandle) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(match state.node(element)? {
            Node::NextControl => state.page_index + 1 < self.site.pages.len(),
            _ => true,
        })
    }

    async fn scroll_into_view(&self, _element: ElementHandle) -> Result<()> {
        Ok(())
    }

    async fn click(&self, element: ElementHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let node = state.node(element)?;
        let cards = self.site.pages.get(state.page_index).cloned().unwrap_or_default();
        match node {
            Node::ViewDetails(i) => {
                let behavior = cards
                    .get(i)
                    .map(|c| c.detail.clone())
                    .unwrap_or(DetailBehavior::None);
                match behavior {
                    DetailBehavior::NewWindow(content) => {
                        let handle = WindowHandle(state.next_window);
                        state.next_window += 1;
                        let url = content.url.clone();
                        state.windows.push(Window {
                            handle,
                            url,
                            view: View::Detail(content),
                        });
                    }
                    DetailBehavior::SameWindow(content) => {
                        let current = state.current;
                        state.windows[current].url = content.url.clone();
                        state.windows[current].view = View::Detail(content);
                    }
                    DetailBehavior::Modal(modal) => {
                        state.open_modal = Some(modal);
                    }
                    DetailBehavior::ClickFails => {
                        return Err(ReraError::Scraping("element click intercepted".to_string()));
                    }
                    DetailBehavior::None => {}
                }
            }
            Node::NextControl => {
                if state.page_index + 1 < self.site.pages.len() {
                    state.page_index += 1;
                }
                state.next_activations += 1;
            }
            Node::ModalClose => {
                state.open_modal = None;
            }
            Node::PromoterTab => {
                state.tab_clicks += 1;
            }
            _ => {}
        }
        Ok(())
    }

    async fn press_escape(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.escape_presses += 1;
        state.open_modal = None;
        Ok(())
    }

    async fn back(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let current = state.current;
        state.windows[current].url = self.site.listing_url.clone();
        state.windows[current].view = View::Listing;
        Ok(())
    }

    async fn windows(&self) -> Result<Vec<WindowHandle>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .windows
            .iter()
            .map(|w| w.handle)
            .collect())
    }

    async fn current_window(&self) -> Result<WindowHandle> {
        let state = self.state.lock().unwrap();
        Ok(state.current_window().handle)
    }

    async fn switch_to(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.windows.iter().position(|w| w.handle == window) {
            Some(index) => {
                state.current = index;
                Ok(())
            }
            None => Err(ReraError::Scraping(format!(
                "unknown window handle {:?}",
                window
            ))),
        }
    }

    async fn close_window(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = state.windows.iter().position(|w| w.handle == window) else {
            return Err(ReraError::Scraping(format!(
                "unknown window handle {:?}",
                window
            )));
        };
        state.windows.remove(index);
        if state.current >= state.windows.len() {
            state.current = 0;
        }
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}
