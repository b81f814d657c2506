use crate::config::Config;
use crate::controller::{Dispatch, KeyBindings, ToolbarController};
use crate::document::DocumentSurface;
use crate::models::{InputMode, MarkupLine, PageMetadata, RegionSpan};
use crate::network::{NetworkManager, NetworkResponse, PageError};
use crate::persistence::{PageContext, Persistence, PersistenceClient};
use crate::region::RegionId;
use crate::renderer::DomRenderer;
use crate::session::{EditSession, PendingSave, SessionState};

use ratatui::text::Line;
use scraper::Html;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use url::Url;

pub struct App {
    pub page_url: Url,
    pub page_title: String,
    pub status_message: String,
    pub session: EditSession<DocumentSurface>,
    /// Only created when the page opens the editor gate.
    pub controller: Option<ToolbarController>,
    pub rendered_content: Vec<Line<'static>>,
    pub region_spans: Vec<RegionSpan>,
    pub markup_lines: Vec<MarkupLine>,
    pub scroll: usize,
    pub selected_region: usize,
    pub input_mode: InputMode,
    pub render_width: u16,
    pub tx: mpsc::Sender<NetworkResponse>,
    pub rx: mpsc::Receiver<NetworkResponse>,
    pub clipboard: Option<arboard::Clipboard>,
    pub network_manager: Arc<NetworkManager>,
    persistence: Option<Arc<PersistenceClient>>,
    bindings: KeyBindings,
}

impl App {
    pub fn new(
        config: &Config,
        page_url: Url,
        tx: mpsc::Sender<NetworkResponse>,
        rx: mpsc::Receiver<NetworkResponse>,
    ) -> Result<Self, PageError> {
        let network_manager = Arc::new(NetworkManager::new(config, &page_url)?);
        let context = PageContext::from_page(&page_url, &PageMetadata::default());
        let clipboard = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard unavailable");
                None
            }
        };

        Ok(Self {
            page_url,
            page_title: String::from("Loading..."),
            status_message: String::from("Ready"),
            session: EditSession::new(DocumentSurface::from_html(""), context),
            controller: None,
            rendered_content: Vec::new(),
            region_spans: Vec::new(),
            markup_lines: Vec::new(),
            scroll: 0,
            selected_region: 0,
            input_mode: InputMode::Normal,
            render_width: 80,
            tx,
            rx,
            clipboard,
            network_manager,
            persistence: None,
            bindings: config.keys.clone(),
        })
    }

    pub fn editor_enabled(&self) -> bool {
        self.controller.is_some()
    }

    /// Fetches the page in the background; the result arrives on `rx`.
    pub fn load_page(&mut self) {
        let url = self.page_url.clone();
        let tx_clone = self.tx.clone();
        let network_manager = Arc::clone(&self.network_manager);

        tokio::spawn(async move {
            let _ = tx_clone.send(NetworkResponse::Loading).await;
            let message = match network_manager.fetch_page(&url).await {
                Ok((metadata, html)) => NetworkResponse::PageLoaded(url, metadata, html),
                Err(e) => {
                    tracing::error!(%url, error = %e, "page load failed");
                    NetworkResponse::Error(e.to_string())
                }
            };
            let _ = tx_clone.send(message).await;
        });
    }

    /// Replaces the session with one for the freshly loaded page.
    pub fn install_page(&mut self, url: Url, metadata: PageMetadata, html: &str) {
        let context = PageContext::from_page(&url, &metadata);
        tracing::info!(
            %url,
            staff = context.staff_user,
            kind = ?context.kind,
            content_id = ?context.content_id,
            "page installed"
        );

        self.persistence = Some(Arc::new(
            PersistenceClient::new(self.network_manager.client().clone(), url.clone())
                .with_csrf_token(context.csrf_token.clone()),
        ));
        self.controller = context
            .staff_user
            .then(|| ToolbarController::new(self.bindings.clone()));
        self.session = EditSession::new(DocumentSurface::from_html(html), context)
            .with_shortcut_hint(self.bindings.hint());
        self.page_url = url;
        self.page_title = metadata.title;
        self.scroll = 0;
        self.selected_region = 0;
        self.input_mode = InputMode::Normal;
        self.rerender();
        if let Some(first) = self.region_spans.first() {
            self.selected_region = first.region.0;
        }
    }

    pub fn rerender(&mut self) {
        let width = self.render_width as usize;
        let selected = (self.session.is_edit_mode() && !self.session.surface().is_empty())
            .then_some(RegionId(self.selected_region));
        let surface = self.session.surface();
        let document = Html::parse_document(surface.source());
        let mut renderer = DomRenderer::new(width, surface, selected);
        renderer.render(&document);

        self.rendered_content = renderer.lines;
        self.region_spans = renderer.regions;
        self.markup_lines = renderer.markup_lines;
    }

    pub fn resize(&mut self, width: u16) {
        self.render_width = width;
        self.rerender();
    }

    pub fn tick(&mut self) {
        self.session.toasts_mut().prune(Instant::now());
    }

    pub fn region_at_line(&self, line_index: usize) -> Option<RegionId> {
        self.region_spans
            .iter()
            .find(|span| span.contains(line_index))
            .map(|span| span.region)
    }

    pub fn span_of(&self, region: RegionId) -> Option<&RegionSpan> {
        self.region_spans.iter().find(|span| span.region == region)
    }

    /// Equivalent of clicking a region.
    pub fn click_region(&mut self, region: RegionId) {
        if !self.editor_enabled() {
            return;
        }
        if self.session.start_editing(region) {
            self.selected_region = region.0;
        }
        self.rerender();
    }

    /// Follows up on whatever the controller decided.
    pub fn apply_dispatch(&mut self, dispatch: Dispatch) {
        if let Dispatch::Save(pending) = dispatch {
            self.spawn_save(pending);
        }
        if self.session.state() != SessionState::Editing {
            self.input_mode = InputMode::Normal;
        }
        self.rerender();
    }

    /// The UI stays live while the request is out; the result is matched
    /// back to its edit through the ticket.
    pub fn spawn_save(&mut self, pending: PendingSave) {
        let Some(persistence) = self.persistence.clone() else {
            tracing::warn!("save requested before a page was loaded");
            return;
        };
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let PendingSave {
                ticket,
                endpoint,
                payload,
            } = pending;
            let result = persistence.save(&endpoint, &payload).await;
            let _ = tx.send(NetworkResponse::SaveFinished(ticket, result)).await;
        });
    }

    pub fn handle_network_response(&mut self, response: NetworkResponse) {
        match response {
            NetworkResponse::Loading => {
                self.page_title = String::from("Loading...");
                self.status_message = String::from("Fetching...");
            }
            NetworkResponse::PageLoaded(url, metadata, html) => {
                self.install_page(url, metadata, &html);
                self.status_message = if self.editor_enabled() {
                    String::from("Loaded - F2 to edit")
                } else {
                    String::from("Loaded (read-only)")
                };
            }
            NetworkResponse::Error(msg) => {
                self.page_title = String::from("Error");
                self.status_message = msg;
            }
            NetworkResponse::SaveFinished(ticket, result) => {
                self.session.complete_save(ticket, result);
                self.rerender();
            }
        }
    }
}
