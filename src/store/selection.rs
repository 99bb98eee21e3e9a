use crate::catalog::{Product, ProductId};
use crate::errors::CliError;
use crate::store::kv::{KeyValueStore, SELECTION_KEY, load_json, save_json};

/// Products the user picked, in selection order. Persisted after every mutation.
#[derive(Debug)]
pub struct SelectionStore {
    items: Vec<Product>,
    storage: Box<dyn KeyValueStore>,
}

impl SelectionStore {
    /// Load the persisted selection; anything unreadable starts empty.
    pub fn restore(storage: Box<dyn KeyValueStore>) -> Self {
        let items: Vec<Product> = load_json(storage.as_ref(), SELECTION_KEY).unwrap_or_default();
        let mut store = Self {
            items: Vec::new(),
            storage,
        };
        for item in items {
            if !store.contains(item.id) {
                store.items.push(item);
            }
        }
        store
    }

    pub fn items(&self) -> &[Product] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.items.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.items.iter().find(|p| p.id == id)
    }

    /// Select or deselect. Returns `true` when the product is selected afterwards.
    pub fn toggle(&mut self, product: &Product) -> Result<bool, CliError> {
        let mut next = self.items.clone();
        let selected = match next.iter().position(|p| p.id == product.id) {
            Some(idx) => {
                next.remove(idx);
                false
            }
            None => {
                next.push(snapshot(product));
                true
            }
        };
        self.commit(next)?;
        Ok(selected)
    }

    pub fn remove(&mut self, id: ProductId) -> Result<bool, CliError> {
        let Some(idx) = self.items.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let mut next = self.items.clone();
        next.remove(idx);
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), CliError> {
        self.commit(Vec::new())
    }

    /// Memory only changes once storage holds the new list.
    fn commit(&mut self, next: Vec<Product>) -> Result<(), CliError> {
        save_json(self.storage.as_ref(), SELECTION_KEY, &next)?;
        self.items = next;
        Ok(())
    }
}

fn snapshot(product: &Product) -> Product {
    Product {
        id: product.id,
        name: product.name.trim().to_string(),
        brand: product.brand.trim().to_string(),
        category: product.category.trim().to_string(),
        description: product.description.clone(),
        image: product.image.trim().to_string(),
    }
}
