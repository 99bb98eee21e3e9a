use std::sync::OnceLock;

use regex::Regex;

use crate::catalog::{Product, ProductId};

/// Sanitized copy of a product's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPane {
    pub id: ProductId,
    pub image: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
}

impl DetailPane {
    fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            image: sanitize_text(&product.image),
            name: sanitize_text(&product.name),
            brand: sanitize_text(&product.brand),
            category: sanitize_text(&product.category),
            description: sanitize_text(&product.description),
        }
    }
}

/// Product detail overlay. At most one product is shown; there is no stacking.
#[derive(Debug, Default)]
pub struct ModalPresenter {
    pane: Option<DetailPane>,
}

impl ModalPresenter {
    pub fn show(&mut self, product: &Product) {
        self.pane = Some(DetailPane::from_product(product));
    }

    pub fn hide(&mut self) {
        self.pane = None;
    }

    pub fn is_open(&self) -> bool {
        self.pane.is_some()
    }

    pub fn pane(&self) -> Option<&DetailPane> {
        self.pane.as_ref()
    }

    /// Accessibility mirror of the open flag.
    pub fn aria_hidden(&self) -> &'static str {
        if self.is_open() { "false" } else { "true" }
    }
}

fn escape_sequences() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-_]?")
            .expect("escape sequence pattern is valid")
    })
}

/// Strip terminal escape sequences and control characters except newline and tab.
pub fn sanitize_text(input: &str) -> String {
    escape_sequences()
        .replace_all(input, "")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// HTML entity escaping for exported transcripts.
pub fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
