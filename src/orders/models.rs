use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::business_rules::LoyaltyTier;
use crate::models::Product;
use crate::validation::{validate_coupon_code, validate_money_amount, validate_not_blank};

/// Order status enum representing the lifecycle of an order
///
/// Order creation only ever writes `Pending`; every other state is reached
/// by fulfillment code elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Convert status to its stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Size of an order line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    S,
    #[default]
    M,
    L,
}

/// Domain model representing an order in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: i32,
    pub total: Decimal,
    pub discount: Decimal,
    pub vip_discount: Decimal,
    pub shipping_fee: Decimal,
    pub applied_coupon: Option<String>,
    pub status: OrderStatus,
    pub shipping_address: serde_json::Value,
    pub points_earned: i64,
    pub created_at: DateTime<Utc>,
}

/// Domain model representing an item within an order
///
/// `product_id` is cleared when the product is deleted from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    pub size: Size,
    pub unit_price: Decimal,
}

/// An order item joined with its product, if the product still exists
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub item: OrderItem,
    pub product: Option<Product>,
}

/// An order together with its lines
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

/// A cart line as submitted by the client
///
/// `id` is either a catalog product id or a synthetic client-side id for a
/// personalized item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CartLine {
    #[validate(custom = "validate_not_blank")]
    pub id: String,
    #[validate(custom = "validate_not_blank")]
    pub name: String,
    #[validate(custom = "validate_money_amount")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Request DTO for creating a new order
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate]
    pub items: Vec<CartLine>,
    /// Cart total as computed by the client; checked against server prices
    #[validate(custom = "validate_money_amount")]
    #[schema(value_type = f64)]
    pub total: Decimal,
    #[schema(value_type = Object)]
    pub shipping_address: serde_json::Value,
    #[validate(custom = "validate_coupon_code")]
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Fields of an order row about to be inserted
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub total: Decimal,
    pub discount: Decimal,
    pub vip_discount: Decimal,
    pub shipping_fee: Decimal,
    pub applied_coupon: Option<String>,
    pub shipping_address: serde_json::Value,
    pub points_earned: i64,
}

/// Fields of an order item row about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Size,
    pub unit_price: Decimal,
}

/// Increments applied to the owning user's cumulative statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsIncrement {
    pub points: i64,
    pub spent: Decimal,
    pub orders: i32,
}

/// Response data for a created order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    #[schema(value_type = String)]
    pub order_id: Uuid,
    pub points_earned: i64,
    pub applied_coupon: Option<String>,
    #[schema(value_type = f64)]
    pub discount: Decimal,
    #[schema(value_type = f64)]
    pub vip_discount: Decimal,
    #[schema(value_type = f64)]
    pub shipping_fee: Decimal,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub user_tier: LoyaltyTier,
    /// Best-effort: null when the tier refresh did not finish in time,
    /// even if it later upgrades the user
    pub loyalty_upgrade: Option<LoyaltyTier>,
}

/// Response data for a quick re-order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderResponse {
    #[schema(value_type = String)]
    pub order_id: Uuid,
}

/// Win-back hint shown to an eligible customer
///
/// Carries only a product name and image; never prices or order ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReengagementHint {
    pub product_name: String,
    pub product_image: Option<String>,
    pub coupon_code: String,
}

/// Response DTO for order with items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub status: OrderStatus,
    #[schema(value_type = f64)]
    pub total: Decimal,
    #[schema(value_type = f64)]
    pub discount: Decimal,
    #[schema(value_type = f64)]
    pub vip_discount: Decimal,
    #[schema(value_type = f64)]
    pub shipping_fee: Decimal,
    pub applied_coupon: Option<String>,
    pub points_earned: i64,
    #[schema(value_type = Object)]
    pub shipping_address: serde_json::Value,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

/// Response DTO for order item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    #[schema(value_type = Option<String>)]
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub size: Size,
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
}

impl From<OrderLine> for OrderItemResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            product_id: line.item.product_id,
            product_name: line.product.map(|p| p.name),
            quantity: line.item.quantity,
            size: line.item.size,
            unit_price: line.item.unit_price,
        }
    }
}

impl From<OrderWithItems> for OrderResponse {
    fn from(order: OrderWithItems) -> Self {
        let OrderWithItems { order, items } = order;
        Self {
            id: order.id,
            status: order.status,
            total: order.total,
            discount: order.discount,
            vip_discount: order.vip_discount,
            shipping_fee: order.shipping_fee,
            applied_coupon: order.applied_coupon,
            points_earned: order.points_earned,
            shipping_address: order.shipping_address,
            items: items.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
        }
    }
}
