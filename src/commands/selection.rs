use clap::Subcommand;
use serde_json::json;

use crate::app::Runtime;
use crate::catalog::{Catalog, ProductId, load_catalog};
use crate::errors::CliError;
use crate::store::SelectionStore;

#[derive(Debug, Subcommand)]
pub enum SelectionCommand {
    /// Show the selected products in selection order
    List,
    /// Select a product by id, or unselect it if already selected
    Toggle { id: u32 },
    /// Remove a product from the selection
    Remove { id: u32 },
    /// Remove every selected product
    Clear,
}

pub async fn handle(runtime: &Runtime, command: SelectionCommand) -> Result<(), CliError> {
    let mut selection = runtime.selection_store()?;
    match command {
        SelectionCommand::List => list(runtime, &selection),
        SelectionCommand::Toggle { id } => toggle(runtime, &mut selection, ProductId(id)).await,
        SelectionCommand::Remove { id } => {
            let removed = selection.remove(ProductId(id))?;
            runtime
                .output
                .emit(&json!({ "id": id, "removed": removed }), || {
                    vec![if removed {
                        format!("Removed product {id}.")
                    } else {
                        format!("Product {id} was not selected.")
                    }]
                })
        }
        SelectionCommand::Clear => {
            selection.clear()?;
            runtime
                .output
                .emit(&json!({ "ok": true }), || vec!["Selections cleared.".to_string()])
        }
    }
}

fn list(runtime: &Runtime, selection: &SelectionStore) -> Result<(), CliError> {
    runtime
        .output
        .emit(&json!({ "selected": selection.items() }), || {
            if selection.is_empty() {
                return vec!["No products selected".to_string()];
            }
            selection
                .items()
                .iter()
                .map(|p| format!("{:>4}  {} ({})", p.id.0, p.name, p.brand))
                .collect()
        })
}

async fn toggle(
    runtime: &Runtime,
    selection: &mut SelectionStore,
    id: ProductId,
) -> Result<(), CliError> {
    // Unselecting works from the stored snapshot; only a new selection needs the catalog.
    let product = match selection.get(id) {
        Some(product) => product.clone(),
        None => {
            let api = runtime.api_client()?;
            let catalog = Catalog::new(load_catalog(&runtime.catalog_source(), &api).await?);
            catalog
                .by_id(id)
                .cloned()
                .ok_or_else(|| CliError::Usage(format!("No product with id {id} in the catalog.")))?
        }
    };
    let selected = selection.toggle(&product)?;
    runtime.output.emit(
        &json!({ "id": id, "name": product.name, "selected": selected }),
        || {
            vec![if selected {
                format!("Selected {}.", product.name)
            } else {
                format!("Removed {}.", product.name)
            }]
        },
    )
}
