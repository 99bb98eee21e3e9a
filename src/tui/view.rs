// Pure projections of catalog + selection into card view models.
// Rebuilt on every frame; highlight state always comes from the selection store.

use std::time::{Duration, Instant};

use crate::catalog::{Product, ProductId};
use crate::store::SelectionStore;
use crate::tui::types::Command;

pub const NO_CATEGORY_PLACEHOLDER: &str = "Select a category to view products";
pub const EMPTY_CATEGORY_PLACEHOLDER: &str = "No products in this category";
pub const NO_SELECTION_PLACEHOLDER: &str = "No products selected";
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub selected: bool,
}

impl CardView {
    fn from_product(product: &Product, selected: bool) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.clone(),
            selected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardsView {
    Placeholder(&'static str),
    Cards(Vec<CardView>),
}

impl CardsView {
    pub fn cards(&self) -> &[CardView] {
        match self {
            CardsView::Placeholder(_) => &[],
            CardsView::Cards(cards) => cards,
        }
    }

    pub fn card_at(&self, idx: usize) -> Option<&CardView> {
        self.cards().get(idx)
    }
}

/// Product grid for the active category. `products` is `None` until a category is chosen.
pub fn project_grid(products: Option<&[Product]>, selection: &SelectionStore) -> CardsView {
    let Some(products) = products else {
        return CardsView::Placeholder(NO_CATEGORY_PLACEHOLDER);
    };
    if products.is_empty() {
        return CardsView::Placeholder(EMPTY_CATEGORY_PLACEHOLDER);
    }
    CardsView::Cards(
        products
            .iter()
            .map(|p| CardView::from_product(p, selection.contains(p.id)))
            .collect(),
    )
}

/// Selected products panel; independent of the category filter.
pub fn project_selected(selection: &SelectionStore) -> CardsView {
    if selection.is_empty() {
        return CardsView::Placeholder(NO_SELECTION_PLACEHOLDER);
    }
    CardsView::Cards(
        selection
            .items()
            .iter()
            .map(|p| CardView::from_product(p, true))
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPanel {
    Grid,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardGesture {
    Click,
    DoubleClick,
    Info,
}

/// The info affordance never toggles; removal from the selected panel needs a double click.
pub fn gesture_command(panel: CardPanel, gesture: CardGesture, id: ProductId) -> Option<Command> {
    match (panel, gesture) {
        (_, CardGesture::Info) => Some(Command::ShowDetails(id)),
        (CardPanel::Grid, CardGesture::Click | CardGesture::DoubleClick) => {
            Some(Command::ToggleProduct(id))
        }
        (CardPanel::Selected, CardGesture::DoubleClick) => Some(Command::RemoveSelected(id)),
        (CardPanel::Selected, CardGesture::Click) => None,
    }
}

/// Turns a second activation of the same card within the window into a double click.
#[derive(Debug, Default)]
pub struct DoubleClickTracker {
    last: Option<(CardPanel, ProductId, Instant)>,
}

impl DoubleClickTracker {
    pub fn classify(&mut self, panel: CardPanel, id: ProductId, now: Instant) -> CardGesture {
        let repeated = matches!(
            self.last,
            Some((p, i, at)) if p == panel && i == id && now.duration_since(at) <= DOUBLE_CLICK_WINDOW
        );
        if repeated {
            self.last = None;
            CardGesture::DoubleClick
        } else {
            self.last = Some((panel, id, now));
            CardGesture::Click
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, sample_product};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn empty_selection() -> SelectionStore {
        SelectionStore::restore(Box::new(MemoryStore::new()))
    }

    #[test]
    fn filtered_grid_shows_only_matching_card() {
        let catalog = Catalog::new(vec![
            sample_product(1, "A", "cleanser"),
            sample_product(2, "B", "serum"),
        ]);
        let filtered = catalog.filter_by_category("cleanser");
        let grid = project_grid(Some(&filtered), &empty_selection());
        let names: Vec<_> = grid.cards().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn placeholders_before_category_and_for_empty_results() {
        let selection = empty_selection();
        assert_eq!(
            project_grid(None, &selection),
            CardsView::Placeholder(NO_CATEGORY_PLACEHOLDER)
        );
        assert_eq!(
            project_grid(Some(&[]), &selection),
            CardsView::Placeholder(EMPTY_CATEGORY_PLACEHOLDER)
        );
        assert_eq!(
            project_selected(&selection),
            CardsView::Placeholder(NO_SELECTION_PLACEHOLDER)
        );
    }

    #[test]
    fn highlight_follows_selection_store() {
        let products = vec![sample_product(1, "A", "serum"), sample_product(2, "B", "serum")];
        let mut selection = empty_selection();
        selection.toggle(&products[1]).unwrap();
        let grid = project_grid(Some(&products), &selection);
        assert_eq!(
            grid.cards().iter().map(|c| c.selected).collect::<Vec<_>>(),
            vec![false, true]
        );

        selection.remove(ProductId(2)).unwrap();
        let grid = project_grid(Some(&products), &selection);
        assert!(grid.cards().iter().all(|c| !c.selected));
    }

    #[test]
    fn selected_list_ignores_filter_and_keeps_order() {
        let mut selection = empty_selection();
        selection.toggle(&sample_product(5, "Toner", "toner")).unwrap();
        selection.toggle(&sample_product(1, "Wash", "cleanser")).unwrap();
        let names: Vec<_> = project_selected(&selection)
            .cards()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["Toner", "Wash"]);
    }

    #[test]
    fn info_never_toggles_and_selected_click_is_inert() {
        let id = ProductId(3);
        assert_eq!(
            gesture_command(CardPanel::Grid, CardGesture::Info, id),
            Some(Command::ShowDetails(id))
        );
        assert_eq!(
            gesture_command(CardPanel::Grid, CardGesture::Click, id),
            Some(Command::ToggleProduct(id))
        );
        assert_eq!(gesture_command(CardPanel::Selected, CardGesture::Click, id), None);
        assert_eq!(
            gesture_command(CardPanel::Selected, CardGesture::DoubleClick, id),
            Some(Command::RemoveSelected(id))
        );
    }

    #[test]
    fn double_click_requires_same_card_within_window() {
        let mut tracker = DoubleClickTracker::default();
        let t0 = Instant::now();
        let a = ProductId(1);
        let b = ProductId(2);
        assert_eq!(tracker.classify(CardPanel::Selected, a, t0), CardGesture::Click);
        assert_eq!(
            tracker.classify(CardPanel::Selected, b, t0 + Duration::from_millis(50)),
            CardGesture::Click
        );
        assert_eq!(
            tracker.classify(CardPanel::Selected, b, t0 + Duration::from_millis(100)),
            CardGesture::DoubleClick
        );
        assert_eq!(
            tracker.classify(CardPanel::Selected, b, t0 + Duration::from_millis(150)),
            CardGesture::Click
        );
        assert_eq!(
            tracker.classify(CardPanel::Selected, b, t0 + Duration::from_millis(1_000)),
            CardGesture::Click
        );
        assert_eq!(
            tracker.classify(CardPanel::Grid, b, t0 + Duration::from_millis(1_100)),
            CardGesture::Click
        );
    }
}
