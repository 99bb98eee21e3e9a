use clap::Subcommand;
use serde_json::json;

use crate::app::Runtime;
use crate::catalog::{Catalog, load_catalog};
use crate::errors::CliError;

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List products, optionally for one category
    List {
        #[arg(short = 'c', long)]
        category: Option<String>,
    },
    /// List the distinct categories
    Categories,
}

pub async fn handle(runtime: &Runtime, command: CatalogCommand) -> Result<(), CliError> {
    let api = runtime.api_client()?;
    let source = runtime.catalog_source();
    runtime
        .output
        .print_verbose(&format!("catalog={source}"));
    let catalog = Catalog::new(load_catalog(&source, &api).await?);
    let selection = runtime.selection_store()?;

    match command {
        CatalogCommand::List { category } => {
            let products = match category.as_deref() {
                Some(category) => catalog.filter_by_category(category),
                None => catalog.products().to_vec(),
            };
            runtime.output.emit(&json!({ "products": products }), || {
                if products.is_empty() {
                    return vec!["No products in this category".to_string()];
                }
                products
                    .iter()
                    .map(|p| {
                        let marker = if selection.contains(p.id) { "*" } else { " " };
                        format!("{marker} {:>4}  {} ({}) [{}]", p.id.0, p.name, p.brand, p.category)
                    })
                    .collect()
            })
        }
        CatalogCommand::Categories => {
            let categories = catalog.categories();
            runtime
                .output
                .emit(&json!({ "categories": categories }), || categories.clone())
        }
    }
}
