use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A persisted catalog product
///
/// Every order line ends up referencing one of these, either a seeded
/// catalog entry or a generic product materialized for a custom cart item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    #[schema(value_type = String, example = "7b0c5f4e-8a43-4a0e-9d5b-3c1f6f0f2a11")]
    pub id: Uuid,
    #[schema(example = "Ethiopia Yirgacheffe")]
    pub name: String,
    #[schema(example = "Floral light roast")]
    pub description: String,
    #[schema(value_type = f64, example = 54.9)]
    pub price: Decimal,
    pub image: Option<String>,
    #[schema(value_type = Option<String>)]
    pub category_id: Option<Uuid>,
}

/// A product category, unique by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Fields for inserting a product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub category_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_product_serialization() {
        let product = Product {
            id: Uuid::nil(),
            name: "House Blend".to_string(),
            description: "Chocolate and hazelnut".to_string(),
            price: dec!(42.50),
            image: None,
            category_id: None,
        };

        let json = serde_json::to_value(&product).expect("Failed to serialize Product");

        assert_eq!(json["name"], "House Blend");
        assert_eq!(json["price"], "42.50");
        assert!(json["image"].is_null());
    }
}
