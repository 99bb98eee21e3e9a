use std::collections::BTreeSet;
use std::fmt;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::errors::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<Product>,
}

/// Where the product list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(String),
    Url(String),
}

impl CatalogSource {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(trimmed.to_string())
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::File(path) => write!(f, "{path}"),
            CatalogSource::Url(url) => write!(f, "{url}"),
        }
    }
}

pub fn parse_catalog(text: &str) -> Result<Vec<Product>, CliError> {
    let file: CatalogFile = serde_json::from_str(text)
        .map_err(|e| CliError::Generic(format!("Invalid catalog: {e}")))?;
    Ok(file.products)
}

/// Fetch and parse the catalog. Errors propagate; there is no retry.
pub async fn load_catalog(source: &CatalogSource, api: &ApiClient) -> Result<Vec<Product>, CliError> {
    let products = match source {
        CatalogSource::File(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::Generic(format!("Failed reading catalog {path}: {e}")))?;
            parse_catalog(&text)?
        }
        CatalogSource::Url(url) => {
            let res = api.get_json(url).await?;
            let file: CatalogFile = serde_json::from_value(res.json)
                .map_err(|e| CliError::Generic(format!("Invalid catalog: {e}")))?;
            file.products
        }
    };
    tracing::debug!(source = %source, count = products.len(), "catalog loaded");
    Ok(products)
}

/// Read-only product list.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn by_id(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Exact, case-sensitive category match in catalog order.
    pub fn filter_by_category(&self, category: &str) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        self.products
            .iter()
            .map(|p| p.category.clone())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_product(id: u32, name: &str, category: &str) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_string(),
        brand: "CeraVe".to_string(),
        category: category.to_string(),
        description: format!("{name} description"),
        image: format!("https://img.example/{id}.jpg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"{
        "products": [
            {"id": 1, "name": "A", "brand": "X", "category": "cleanser", "description": "d", "image": "a.jpg", "extra": true},
            {"id": 2, "name": "B", "brand": "Y", "category": "serum", "description": "d", "image": "b.jpg"},
            {"id": 3, "name": "C", "brand": "Z", "category": "cleanser", "description": "d", "image": "c.jpg"}
        ]
    }"#;

    #[test]
    fn parses_products_ignoring_unknown_fields() {
        let products = parse_catalog(CATALOG).unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[1].name, "B");
        assert_eq!(products[1].id, ProductId(2));
    }

    #[test]
    fn rejects_missing_products_key() {
        assert!(parse_catalog(r#"{"items": []}"#).is_err());
        assert!(parse_catalog("not json").is_err());
    }

    #[test]
    fn filter_is_exact_category_match() {
        let catalog = Catalog::new(vec![
            sample_product(1, "A", "cleanser"),
            sample_product(2, "B", "serum"),
        ]);
        let names: Vec<_> = catalog
            .filter_by_category("cleanser")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["A".to_string()]);
        assert!(catalog.filter_by_category("Cleanser").is_empty());
    }

    #[test]
    fn categories_are_distinct_and_sorted() {
        let catalog = Catalog::new(parse_catalog(CATALOG).unwrap());
        assert_eq!(catalog.categories(), vec!["cleanser", "serum"]);
        assert_eq!(catalog.by_id(ProductId(3)).map(|p| p.name.as_str()), Some("C"));
        assert!(catalog.by_id(ProductId(9)).is_none());
    }

    #[test]
    fn source_detects_urls() {
        assert_eq!(
            CatalogSource::parse("https://cdn.example/products.json"),
            CatalogSource::Url("https://cdn.example/products.json".into())
        );
        assert_eq!(
            CatalogSource::parse(" products.json "),
            CatalogSource::File("products.json".into())
        );
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        fs::write(&path, CATALOG).unwrap();
        let api = ApiClient::new("http://localhost:1".into(), 1_000, false).unwrap();
        let source = CatalogSource::File(path.display().to_string());
        let products = load_catalog(&source, &api).await.unwrap();
        assert_eq!(products.len(), 3);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let api = ApiClient::new("http://localhost:1".into(), 1_000, false).unwrap();
        let source = CatalogSource::File("/definitely/not/here.json".into());
        assert!(load_catalog(&source, &api).await.is_err());
    }
}
