// Custom item reification
//
// Personalized cart items arrive with synthetic client ids that reference
// no catalog row. Each one is mapped onto a persisted generic product so
// every order line carries a real product reference.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{NewProduct, Product};
use crate::orders::error::OrderError;
use crate::orders::models::{CartLine, Size};
use crate::orders::repository::OrderStore;

/// Generic product kinds a custom line can be folded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Mug,
    Blend,
    Generic,
}

impl Archetype {
    /// Classify a line from its id and display name, case-insensitively
    pub fn classify(id: &str, name: &str) -> Self {
        let haystack = format!("{} {}", id, name).to_lowercase();
        if haystack.contains("mug") {
            Archetype::Mug
        } else if haystack.contains("blend") {
            Archetype::Blend
        } else {
            Archetype::Generic
        }
    }

    pub fn product_name(&self) -> &'static str {
        match self {
            Archetype::Mug => "Personalized Mug",
            Archetype::Blend => "Personalized Blend",
            Archetype::Generic => "Custom Product",
        }
    }

    pub fn category_name(&self) -> &'static str {
        match self {
            Archetype::Mug => "Merchandise",
            Archetype::Blend => "Custom Blends",
            Archetype::Generic => "Custom Creations",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Archetype::Mug => "Mug personalized to order",
            Archetype::Blend => "Coffee blend composed to order",
            Archetype::Generic => "Item made to order",
        }
    }
}

/// The catalog key behind a line id, or `None` for a client-side placeholder
pub fn canonical_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}

/// A cart line resolved to a persisted product id
#[derive(Debug, Clone, PartialEq)]
pub struct ReifiedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Size,
    /// Price the client submitted for the line
    pub submitted_price: Decimal,
    /// True when the line was mapped onto a generic product
    pub custom: bool,
}

/// Resolve every cart line to a product id, in cart order
///
/// Writes made here are not part of the order transaction; a generic
/// product created for a cart that later fails stays in the catalog.
pub async fn reify(store: &dyn OrderStore, lines: &[CartLine]) -> Result<Vec<ReifiedLine>, OrderError> {
    let mut reified = Vec::with_capacity(lines.len());

    for line in lines {
        let size = line.size.unwrap_or_default();

        if let Some(product_id) = canonical_id(&line.id) {
            reified.push(ReifiedLine {
                product_id,
                quantity: line.quantity,
                size,
                submitted_price: line.price,
                custom: false,
            });
            continue;
        }

        let archetype = Archetype::classify(&line.id, &line.name);
        let product = resolve_generic_product(store, archetype, line).await?;
        tracing::debug!(
            "Reified custom line {:?} onto product {} ({})",
            line.id,
            product.id,
            product.name
        );

        reified.push(ReifiedLine {
            product_id: product.id,
            quantity: line.quantity,
            size,
            submitted_price: line.price,
            custom: true,
        });
    }

    Ok(reified)
}

async fn resolve_generic_product(
    store: &dyn OrderStore,
    archetype: Archetype,
    line: &CartLine,
) -> Result<Product, OrderError> {
    if let Some(product) = store.find_product_by_name(archetype.product_name()).await? {
        return Ok(product);
    }

    let category = store.find_or_create_category(archetype.category_name()).await?;
    let product = store
        .create_product(NewProduct {
            name: archetype.product_name().to_string(),
            description: archetype.description().to_string(),
            price: line.price,
            image: line.image.clone(),
            category_id: category.id,
        })
        .await?;

    tracing::info!(
        "Created generic product {} in category {}",
        product.name,
        category.name
    );

    Ok(product)
}
