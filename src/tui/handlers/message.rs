// Results of async effects, applied on the UI thread between terminal events.

use crate::catalog::Catalog;
use crate::orchestrator::Settled;
use crate::tui::types::{App, TuiMsg};

pub fn handle_tui_msg(app: &mut App, msg: TuiMsg) {
    match msg {
        TuiMsg::Catalog { category, result } => {
            let current = category.is_none() || category == app.category;
            if current {
                app.loading_catalog = false;
            }
            match result {
                Ok(products) => {
                    let catalog = Catalog::new(products);
                    let categories = catalog.categories();
                    if !categories.is_empty() {
                        app.categories = categories;
                    }
                    let total = catalog.products().len();
                    let filtered = category.as_deref().map(|c| catalog.filter_by_category(c));
                    if app.catalog.is_none() {
                        app.catalog = Some(catalog);
                    }
                    if !current {
                        return;
                    }
                    match (category, filtered) {
                        (Some(category), Some(products)) => {
                            app.grid_state
                                .select(if products.is_empty() { None } else { Some(0) });
                            app.status = format!("{} products in {category}.", products.len());
                            app.visible_products = Some(products);
                        }
                        _ => {
                            app.status =
                                format!("Catalog loaded: {total} products. F2 choose a category.");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "catalog load failed");
                    if !current {
                        return;
                    }
                    if category.is_some() {
                        app.visible_products = Some(Vec::new());
                        app.grid_state.select(None);
                    }
                    app.status = format!("Failed loading catalog: {err}");
                }
            }
        }
        TuiMsg::Chat(res) => {
            match app.orchestrator.settle(res, &mut app.conversation) {
                Ok(Settled::Reply) => app.status = "Ready.".to_string(),
                Ok(Settled::Fallback) => app.status = "No reply text returned.".to_string(),
                Ok(Settled::Failed(_)) => app.status = "Request failed.".to_string(),
                Err(err) => app.status = format!("Failed saving conversation: {err}"),
            }
            app.scroll_from_bottom = 0;
        }
    }
}
