use std::time::Instant;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use crate::api::ApiResponse;
use crate::catalog::{Catalog, CatalogSource, Product, ProductId};
use crate::errors::CliError;
use crate::modal::ModalPresenter;
use crate::orchestrator::{ChatOrchestrator, ChatPayload};
use crate::persona::Persona;
use crate::store::{ConversationStore, SelectionStore};
use crate::tui::view::DoubleClickTracker;

// ============================================================================
// Commands and effects
// ============================================================================

/// One user gesture. Handled to completion before the next event is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectCategory(String),
    ToggleProduct(ProductId),
    RemoveSelected(ProductId),
    ClearSelections,
    ShowDetails(ProductId),
    HideDetails,
    SubmitChat(String),
    GenerateRoutine,
    ClearConversation,
    SetPersona(Persona),
    Quit,
}

/// Asynchronous work requested by a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchCatalog { category: Option<String> },
    SendChat(ChatPayload),
}

#[derive(Debug)]
pub enum TuiMsg {
    Catalog {
        category: Option<String>,
        result: Result<Vec<Product>, CliError>,
    },
    Chat(Result<ApiResponse, CliError>),
}

// ============================================================================
// UI mode and focus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    CategoryPicker,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Grid,
    Selected,
    Chat,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Grid => Focus::Selected,
            Focus::Selected => Focus::Chat,
            Focus::Chat => Focus::Grid,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Grid => Focus::Chat,
            Focus::Selected => Focus::Grid,
            Focus::Chat => Focus::Selected,
        }
    }
}

/// Areas from the last draw, for mouse hit testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitAreas {
    pub grid: Rect,
    pub selected: Rect,
    pub modal: Option<Rect>,
    pub modal_close: Option<Rect>,
}

// ============================================================================
// Main App state
// ============================================================================

#[derive(Debug)]
pub struct App {
    pub mode: Mode,
    pub focus: Focus,
    pub should_quit: bool,

    pub catalog_source: CatalogSource,
    /// First full catalog loaded this session; used for detail lookups across filters.
    pub catalog: Option<Catalog>,
    pub categories: Vec<String>,
    pub category: Option<String>,
    /// Products of the active category; `None` before a category is chosen.
    pub visible_products: Option<Vec<Product>>,
    pub loading_catalog: bool,

    pub selection: SelectionStore,
    pub conversation: ConversationStore,
    pub orchestrator: ChatOrchestrator,
    pub modal: ModalPresenter,

    pub grid_state: ListState,
    pub selected_state: ListState,
    pub category_state: ListState,
    pub double_click: DoubleClickTracker,
    pub hit: HitAreas,

    pub input: Vec<char>,
    pub cursor: usize,
    pub scroll_from_bottom: usize,

    pub status: String,
    pub spinner_step: u64,
    pub spinner_last: Instant,
}

impl App {
    pub fn new(
        catalog_source: CatalogSource,
        selection: SelectionStore,
        conversation: ConversationStore,
        orchestrator: ChatOrchestrator,
    ) -> Self {
        let mut app = Self {
            mode: Mode::Browse,
            focus: Focus::Grid,
            should_quit: false,
            catalog_source,
            catalog: None,
            categories: Vec::new(),
            category: None,
            visible_products: None,
            loading_catalog: false,
            selection,
            conversation,
            orchestrator,
            modal: ModalPresenter::default(),
            grid_state: ListState::default(),
            selected_state: ListState::default(),
            category_state: ListState::default(),
            double_click: DoubleClickTracker::default(),
            hit: HitAreas::default(),
            input: Vec::new(),
            cursor: 0,
            scroll_from_bottom: 0,
            status: "F2 choose a category. F1 help.".to_string(),
            spinner_step: 0,
            spinner_last: Instant::now(),
        };
        if !app.selection.is_empty() {
            app.selected_state.select(Some(0));
        }
        app
    }

    /// Submissions are disabled while a chat request is in flight.
    pub fn waiting(&self) -> bool {
        self.orchestrator.is_pending()
    }

    /// Resolve a product for toggling or details regardless of the active filter.
    pub fn find_product(&self, id: ProductId) -> Option<Product> {
        self.visible_products
            .as_deref()
            .and_then(|ps| ps.iter().find(|p| p.id == id))
            .or_else(|| self.catalog.as_ref().and_then(|c| c.by_id(id)))
            .or_else(|| self.selection.get(id))
            .cloned()
    }
}
