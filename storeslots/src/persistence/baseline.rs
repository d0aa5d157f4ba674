//! Default slot trees used to seed a page's first draft.

use std::path::PathBuf;

use crate::error::{PersistenceError, PersistenceResult, SlotResult};
use crate::slots::{SlotId, SlotStore, SlotType};

use super::{ConfigurationDocument, DocumentMetadata, PageType};

/// Where the first draft of a page comes from.
#[derive(Debug, Clone)]
pub enum Baseline {
    /// The tree shipped with the engine for each page type.
    BuiltIn,
    /// A configuration document stored as JSON on disk.
    File(PathBuf),
    Document(ConfigurationDocument),
}

impl Baseline {
    pub fn resolve(&self, page_type: PageType) -> PersistenceResult<ConfigurationDocument> {
        let document = match self {
            Baseline::BuiltIn => {
                let store = default_store(page_type)
                    .map_err(|e| PersistenceError::Baseline(e.to_string()))?;
                store.to_document(DocumentMetadata::named(page_title(page_type)))
            }
            Baseline::File(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    PersistenceError::Baseline(format!("{}: {}", path.display(), e))
                })?;
                serde_json::from_str::<ConfigurationDocument>(&raw)?
            }
            Baseline::Document(document) => document.clone(),
        };
        document.validate()?;
        Ok(document)
    }
}

fn page_title(page_type: PageType) -> &'static str {
    match page_type {
        PageType::Cart => "Cart",
        PageType::Checkout => "Checkout",
        PageType::Product => "Product",
        PageType::Category => "Category",
        PageType::Home => "Home",
        PageType::Success => "Order confirmation",
    }
}

/// Built-in layout for `page_type`.
pub fn default_store(page_type: PageType) -> SlotResult<SlotStore> {
    let mut b = TreeBuilder::default();
    match page_type {
        PageType::Cart => {
            let header = b.add(SlotType::Container, None, "Header", "")?;
            b.add(SlotType::Text, Some(&header), "Title", "My Cart")?;
            b.add(SlotType::Text, Some(&header), "Empty cart message", "Your cart is empty")?;
            let body = b.add(SlotType::Grid, None, "Cart body", "")?;
            b.add(SlotType::Html, Some(&body), "Line items", "<div data-cart-items></div>")?;
            let summary = b.add(SlotType::Container, Some(&body), "Order summary", "")?;
            b.add(SlotType::Text, Some(&summary), "Summary title", "Order Summary")?;
            b.add(SlotType::Html, Some(&summary), "Totals", "<div data-cart-totals></div>")?;
            b.add(SlotType::Button, Some(&summary), "Checkout button", "Proceed to Checkout")?;
        }
        PageType::Checkout => {
            b.add(SlotType::Text, None, "Title", "Checkout")?;
            let body = b.add(SlotType::Grid, None, "Checkout body", "")?;
            let details = b.add(SlotType::Container, Some(&body), "Details", "")?;
            b.add(SlotType::Html, Some(&details), "Shipping form", "<div data-shipping-form></div>")?;
            b.add(SlotType::Html, Some(&details), "Payment form", "<div data-payment-form></div>")?;
            let summary = b.add(SlotType::Container, Some(&body), "Order summary", "")?;
            b.add(SlotType::Html, Some(&summary), "Totals", "<div data-cart-totals></div>")?;
            b.add(SlotType::Button, Some(&summary), "Place order button", "Place Order")?;
        }
        PageType::Product => {
            let main = b.add(SlotType::Grid, None, "Product main", "")?;
            b.add(SlotType::Image, Some(&main), "Product image", "")?;
            let info = b.add(SlotType::Container, Some(&main), "Product info", "")?;
            b.add(SlotType::Html, Some(&info), "Product name", "<h1 data-product-name></h1>")?;
            b.add(SlotType::Html, Some(&info), "Price", "<div data-product-price></div>")?;
            b.add(SlotType::Button, Some(&info), "Add to cart button", "Add to Cart")?;
            b.add(SlotType::Html, None, "Description", "<div data-product-description></div>")?;
        }
        PageType::Category => {
            b.add(SlotType::Html, None, "Category header", "<h1 data-category-name></h1>")?;
            let body = b.add(SlotType::Grid, None, "Category body", "")?;
            b.add(SlotType::Html, Some(&body), "Filters", "<div data-category-filters></div>")?;
            b.add(SlotType::Html, Some(&body), "Product grid", "<div data-category-products></div>")?;
        }
        PageType::Home => {
            let hero = b.add(SlotType::Container, None, "Hero", "")?;
            b.add(SlotType::Text, Some(&hero), "Headline", "Welcome to our store")?;
            b.add(SlotType::Button, Some(&hero), "Shop button", "Shop now")?;
            b.add(SlotType::Html, None, "Featured products", "<div data-featured-products></div>")?;
        }
        PageType::Success => {
            b.add(SlotType::Text, None, "Title", "Thank you for your order!")?;
            b.add(SlotType::Html, None, "Order details", "<div data-order-details></div>")?;
            b.add(SlotType::Button, None, "Continue shopping button", "Continue Shopping")?;
        }
    }
    Ok(b.store)
}

#[derive(Default)]
struct TreeBuilder {
    store: SlotStore,
}

impl TreeBuilder {
    fn add(
        &mut self,
        slot_type: SlotType,
        parent: Option<&SlotId>,
        name: &str,
        content: &str,
    ) -> SlotResult<SlotId> {
        let id = self.store.create_slot(slot_type, parent)?.id.clone();
        self.store.rename_slot(&id, name)?;
        if !content.is_empty() {
            self.store.update_content(&id, content)?;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_page_type_has_a_valid_baseline() {
        for page_type in PageType::ALL {
            let doc = Baseline::BuiltIn.resolve(page_type).unwrap();
            assert!(!doc.root_slots.is_empty(), "{} baseline is empty", page_type);
            assert!(doc.metadata.page_name.is_some());
        }
    }

    #[test]
    fn cart_baseline_nests_summary_in_body() {
        let store = default_store(PageType::Cart).unwrap();
        let body = &store.root_slots()[1];
        let summary = &store.children_of(body)[1];
        let names: Vec<_> = store
            .children_of(summary)
            .iter()
            .map(|id| store.get(id).unwrap().display_name().to_string())
            .collect();
        assert_eq!(names, ["Summary title", "Totals", "Checkout button"]);
    }

    #[test]
    fn file_baseline_is_read_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("cart.json");
        let doc = Baseline::BuiltIn.resolve(PageType::Cart).unwrap();
        std::fs::write(&good, serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(Baseline::File(good).resolve(PageType::Cart).unwrap(), doc);

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, r#"{"slots":{},"rootSlots":["ghost"]}"#).unwrap();
        assert!(matches!(
            Baseline::File(broken).resolve(PageType::Cart),
            Err(PersistenceError::Document(_))
        ));

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Baseline::File(missing).resolve(PageType::Cart),
            Err(PersistenceError::Baseline(_))
        ));
    }
}
