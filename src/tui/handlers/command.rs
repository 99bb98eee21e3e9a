// Command dispatch: every mutation of selection, modal and conversation goes through here.

use crate::errors::CliError;
use crate::orchestrator::{Begin, ChatRequestKind};
use crate::tui::types::{App, Command, Effect, Focus, Mode};

pub fn dispatch(app: &mut App, command: Command) -> Result<Option<Effect>, CliError> {
    tracing::debug!(?command, "dispatch");
    match command {
        Command::SelectCategory(category) => {
            app.mode = Mode::Browse;
            app.category = Some(category.clone());
            app.loading_catalog = true;
            app.grid_state.select(None);
            app.status = format!("Loading {category}...");
            Ok(Some(Effect::FetchCatalog {
                category: Some(category),
            }))
        }
        Command::ToggleProduct(id) => {
            let Some(product) = app.find_product(id) else {
                app.status = format!("Product {id} is not in the catalog.");
                return Ok(None);
            };
            let selected = app.selection.toggle(&product)?;
            app.status = if selected {
                format!("Selected {}.", product.name)
            } else {
                format!("Removed {}.", product.name)
            };
            clamp_selected_cursor(app);
            Ok(None)
        }
        Command::RemoveSelected(id) => {
            if let Some(name) = app.selection.get(id).map(|p| p.name.clone()) {
                app.selection.remove(id)?;
                app.status = format!("Removed {name}.");
            }
            app.double_click.reset();
            clamp_selected_cursor(app);
            Ok(None)
        }
        Command::ClearSelections => {
            app.selection.clear()?;
            app.selected_state.select(None);
            app.status = "Selections cleared.".to_string();
            Ok(None)
        }
        Command::ShowDetails(id) => {
            match app.find_product(id) {
                Some(product) => {
                    app.modal.show(&product);
                    tracing::debug!(%id, aria_hidden = app.modal.aria_hidden(), "details shown");
                }
                None => app.status = format!("Product {id} is not in the catalog."),
            }
            Ok(None)
        }
        Command::HideDetails => {
            app.modal.hide();
            tracing::debug!(aria_hidden = app.modal.aria_hidden(), "details hidden");
            Ok(None)
        }
        Command::SubmitChat(text) => begin_chat(app, ChatRequestKind::Chat(text)),
        Command::GenerateRoutine => begin_chat(app, ChatRequestKind::Routine),
        Command::ClearConversation => {
            if app.waiting() {
                app.status = "Wait for the current reply before clearing.".to_string();
                return Ok(None);
            }
            app.conversation.clear()?;
            app.scroll_from_bottom = 0;
            app.status = "Conversation cleared.".to_string();
            Ok(None)
        }
        Command::SetPersona(persona) => {
            app.orchestrator.set_persona(persona);
            app.status = format!("Advisor voice: {}.", persona.label());
            Ok(None)
        }
        Command::Quit => {
            app.should_quit = true;
            Ok(None)
        }
    }
}

fn begin_chat(app: &mut App, kind: ChatRequestKind) -> Result<Option<Effect>, CliError> {
    if app.waiting() {
        app.status = "Still waiting for the previous reply...".to_string();
        return Ok(None);
    }
    let begin = app
        .orchestrator
        .begin(kind, &app.selection, &mut app.conversation)?;
    app.scroll_from_bottom = 0;
    match begin {
        Begin::Send(payload) => {
            app.status = "Thinking...".to_string();
            Ok(Some(Effect::SendChat(payload)))
        }
        Begin::Answered => {
            app.focus = Focus::Grid;
            Ok(None)
        }
        Begin::Ignored => Ok(None),
    }
}

fn clamp_selected_cursor(app: &mut App) {
    let len = app.selection.len();
    if len == 0 {
        app.selected_state.select(None);
        return;
    }
    let idx = app.selected_state.selected().unwrap_or(0).min(len - 1);
    app.selected_state.select(Some(idx));
}

#[cfg(test)]
pub(crate) fn test_app() -> App {
    use crate::catalog::{Catalog, CatalogSource, sample_product};
    use crate::orchestrator::ChatOrchestrator;
    use crate::persona::Persona;
    use crate::store::{ConversationStore, MemoryStore, SelectionStore};

    let storage = MemoryStore::new();
    let mut app = App::new(
        CatalogSource::File("products.json".into()),
        SelectionStore::restore(Box::new(storage.clone())),
        ConversationStore::replay(Box::new(storage)),
        ChatOrchestrator::new("gpt-4o", Persona::Glow),
    );
    let products = vec![
        sample_product(1, "A", "cleanser"),
        sample_product(2, "B", "serum"),
    ];
    let catalog = Catalog::new(products);
    app.visible_products = Some(catalog.filter_by_category("cleanser"));
    app.category = Some("cleanser".into());
    app.catalog = Some(catalog);
    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductId;
    use crate::orchestrator::EMPTY_SELECTION_MESSAGE;
    use crate::persona::Persona;
    use crate::store::Role;
    use crate::tui::view::project_grid;

    #[test]
    fn select_category_requests_fetch() {
        let mut app = test_app();
        let effect = dispatch(&mut app, Command::SelectCategory("serum".into())).unwrap();
        assert_eq!(
            effect,
            Some(Effect::FetchCatalog {
                category: Some("serum".into())
            })
        );
        assert!(app.loading_catalog);
    }

    #[test]
    fn toggle_resolves_products_outside_the_filter() {
        let mut app = test_app();
        dispatch(&mut app, Command::ToggleProduct(ProductId(2))).unwrap();
        assert!(app.selection.contains(ProductId(2)));
        dispatch(&mut app, Command::ToggleProduct(ProductId(99))).unwrap();
        assert_eq!(app.selection.len(), 1);
    }

    #[test]
    fn remove_from_selected_clears_grid_highlight() {
        let mut app = test_app();
        dispatch(&mut app, Command::ToggleProduct(ProductId(1))).unwrap();
        let grid = project_grid(app.visible_products.as_deref(), &app.selection);
        assert!(grid.cards()[0].selected);

        dispatch(&mut app, Command::RemoveSelected(ProductId(1))).unwrap();
        let grid = project_grid(app.visible_products.as_deref(), &app.selection);
        assert!(!grid.cards()[0].selected);
        assert_eq!(app.selected_state.selected(), None);
    }

    #[test]
    fn details_then_cancel_leaves_selection_untouched() {
        let mut app = test_app();
        dispatch(&mut app, Command::ToggleProduct(ProductId(1))).unwrap();
        let before = app.selection.items().to_vec();

        dispatch(&mut app, Command::ShowDetails(ProductId(2))).unwrap();
        assert!(app.modal.is_open());
        dispatch(&mut app, Command::HideDetails).unwrap();

        assert!(!app.modal.is_open());
        assert_eq!(app.modal.aria_hidden(), "true");
        assert_eq!(app.selection.items(), before.as_slice());
    }

    #[test]
    fn clear_selections_empties_store() {
        let mut app = test_app();
        dispatch(&mut app, Command::ToggleProduct(ProductId(1))).unwrap();
        dispatch(&mut app, Command::ToggleProduct(ProductId(2))).unwrap();
        dispatch(&mut app, Command::ClearSelections).unwrap();
        assert!(app.selection.is_empty());
        let grid = project_grid(app.visible_products.as_deref(), &app.selection);
        assert!(grid.cards().iter().all(|c| !c.selected));
    }

    #[test]
    fn routine_without_selection_has_no_effect_and_one_message() {
        let mut app = test_app();
        let effect = dispatch(&mut app, Command::GenerateRoutine).unwrap();
        assert_eq!(effect, None);
        let entries = app.conversation.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role, Role::Assistant);
        assert_eq!(entries[0].content, EMPTY_SELECTION_MESSAGE);
    }

    #[test]
    fn persona_change_applies_to_next_request() {
        let mut app = test_app();
        dispatch(&mut app, Command::SetPersona(Persona::Luxe)).unwrap();
        let Some(Effect::SendChat(payload)) =
            dispatch(&mut app, Command::SubmitChat("hello".into())).unwrap()
        else {
            panic!("expected a chat request");
        };
        assert_eq!(payload.messages[0].content, Persona::Luxe.system_prompt());
    }

    #[test]
    fn submit_disables_until_settled() {
        let mut app = test_app();
        let effect = dispatch(&mut app, Command::SubmitChat("hello".into())).unwrap();
        assert!(matches!(effect, Some(Effect::SendChat(_))));
        assert!(app.waiting());

        let second = dispatch(&mut app, Command::SubmitChat("again".into())).unwrap();
        assert_eq!(second, None);
        assert_eq!(app.conversation.entries().len(), 1);
    }
}
