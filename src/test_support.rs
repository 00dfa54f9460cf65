// In-memory order store for unit and handler tests

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::User;
use crate::business_rules::LoyaltyTier;
use crate::models::{Category, NewProduct, Product};
use crate::orders::{
    LoyaltySummary, NewOrder, NewOrderItem, Order, OrderError, OrderItem, OrderLine, OrderStatus,
    OrderStore, OrderWithItems, StatsIncrement,
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    categories: Vec<Category>,
    products: Vec<Product>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    next_user_id: i32,
    next_item_id: i32,
    fail_reads: bool,
    fail_next_place_order: bool,
    fail_tier_updates: bool,
    tier_update_delay: Option<Duration>,
}

impl State {
    fn check_reads(&self) -> Result<(), OrderError> {
        if self.fail_reads {
            return Err(OrderError::DatabaseError("injected read failure".to_string()));
        }
        Ok(())
    }

    fn with_items(&self, order: &Order) -> OrderWithItems {
        let items = self
            .items
            .iter()
            .filter(|item| item.order_id == order.id)
            .map(|item| OrderLine {
                item: item.clone(),
                product: item
                    .product_id
                    .and_then(|id| self.products.iter().find(|p| p.id == id).cloned()),
            })
            .collect();

        OrderWithItems {
            order: order.clone(),
            items,
        }
    }
}

/// `OrderStore` backed by vectors behind a mutex
///
/// Mirrors the relational constraints that matter to the order core:
/// unique product and category names, item product ids cleared on product
/// delete, and all-or-nothing `place_order`.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_user(&self, email: &str, name: &str, tier: Option<&str>) -> User {
        self.with_state(|s| {
            s.next_user_id += 1;
            let user = User {
                id: s.next_user_id,
                email: email.to_string(),
                name: name.to_string(),
                tier: tier.map(str::to_string),
                points: 0,
                total_spent: Decimal::ZERO,
                order_count: 0,
            };
            s.users.push(user.clone());
            user
        })
    }

    pub fn user(&self, user_id: i32) -> User {
        self.with_state(|s| {
            s.users
                .iter()
                .find(|u| u.id == user_id)
                .cloned()
                .expect("user exists")
        })
    }

    pub fn add_product(&self, name: &str, price: Decimal) -> Product {
        self.with_state(|s| {
            let product = Product {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: format!("{} from the catalog", name),
                price,
                image: Some(format!("{}.png", name.to_lowercase().replace(' ', "-"))),
                category_id: None,
            };
            s.products.push(product.clone());
            product
        })
    }

    pub fn set_product_price(&self, product_id: Uuid, price: Decimal) {
        self.with_state(|s| {
            if let Some(product) = s.products.iter_mut().find(|p| p.id == product_id) {
                product.price = price;
            }
        })
    }

    /// Remove a product; order items keep their row with no product
    pub fn delete_product(&self, product_id: Uuid) {
        self.with_state(|s| {
            s.products.retain(|p| p.id != product_id);
            for item in s.items.iter_mut().filter(|i| i.product_id == Some(product_id)) {
                item.product_id = None;
            }
        })
    }

    pub fn product_count(&self) -> usize {
        self.with_state(|s| s.products.len())
    }

    /// Record a past order without lines, e.g. to shape a user's history
    pub fn add_order_with_status(&self, user_id: i32, total: Decimal, status: OrderStatus) -> Order {
        self.with_state(|s| {
            let order = Order {
                id: Uuid::new_v4(),
                user_id,
                total,
                discount: Decimal::ZERO,
                vip_discount: Decimal::ZERO,
                shipping_fee: Decimal::ZERO,
                applied_coupon: None,
                status,
                shipping_address: serde_json::json!({}),
                points_earned: 0,
                created_at: Utc::now(),
            };
            s.orders.push(order.clone());
            order
        })
    }

    pub fn set_order_status(&self, order_id: Uuid, status: OrderStatus) {
        self.with_state(|s| {
            if let Some(order) = s.orders.iter_mut().find(|o| o.id == order_id) {
                order.status = status;
            }
        })
    }

    /// Make catalog and order-history reads fail
    pub fn fail_reads(&self, fail: bool) {
        self.with_state(|s| s.fail_reads = fail)
    }

    pub fn fail_next_place_order(&self) {
        self.with_state(|s| s.fail_next_place_order = true)
    }

    pub fn fail_tier_updates(&self, fail: bool) {
        self.with_state(|s| s.fail_tier_updates = fail)
    }

    pub fn delay_tier_updates(&self, delay: Duration) {
        self.with_state(|s| s.tier_update_delay = Some(delay))
    }
}

#[axum::async_trait]
impl OrderStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, OrderError> {
        let email = email.trim().to_lowercase();
        Ok(self.with_state(|s| s.users.iter().find(|u| u.email.to_lowercase() == email).cloned()))
    }

    async fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>, OrderError> {
        Ok(self.with_state(|s| s.users.iter().find(|u| u.id == user_id).cloned()))
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, OrderError> {
        self.with_state(|s| {
            s.check_reads()?;
            Ok(s.products.iter().find(|p| p.name == name).cloned())
        })
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, OrderError> {
        self.with_state(|s| {
            if let Some(existing) = s.products.iter().find(|p| p.name == product.name) {
                return Ok(existing.clone());
            }
            let created = Product {
                id: Uuid::new_v4(),
                name: product.name,
                description: product.description,
                price: product.price,
                image: product.image,
                category_id: Some(product.category_id),
            };
            s.products.push(created.clone());
            Ok(created)
        })
    }

    async fn find_or_create_category(&self, name: &str) -> Result<Category, OrderError> {
        self.with_state(|s| {
            if let Some(existing) = s.categories.iter().find(|c| c.name == name) {
                return Ok(existing.clone());
            }
            let category = Category {
                id: Uuid::new_v4(),
                name: name.to_string(),
            };
            s.categories.push(category.clone());
            Ok(category)
        })
    }

    async fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, OrderError> {
        self.with_state(|s| {
            s.check_reads()?;
            Ok(s.products.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
        })
    }

    async fn place_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        stats: StatsIncrement,
    ) -> Result<Order, OrderError> {
        self.with_state(|s| {
            if std::mem::take(&mut s.fail_next_place_order) {
                return Err(OrderError::TransactionFailed("injected failure".to_string()));
            }
            if let Some(missing) = items
                .iter()
                .find(|item| !s.products.iter().any(|p| p.id == item.product_id))
            {
                return Err(OrderError::TransactionFailed(format!(
                    "foreign key violation on product {}",
                    missing.product_id
                )));
            }
            let user = s
                .users
                .iter_mut()
                .find(|u| u.id == order.user_id)
                .ok_or_else(|| OrderError::TransactionFailed("user row not updated".to_string()))?;

            user.points += stats.points;
            user.total_spent += stats.spent;
            user.order_count += stats.orders;

            let stored = Order {
                id: Uuid::new_v4(),
                user_id: order.user_id,
                total: order.total,
                discount: order.discount,
                vip_discount: order.vip_discount,
                shipping_fee: order.shipping_fee,
                applied_coupon: order.applied_coupon,
                status: OrderStatus::Pending,
                shipping_address: order.shipping_address,
                points_earned: order.points_earned,
                created_at: Utc::now(),
            };

            for item in items {
                s.next_item_id += 1;
                s.items.push(OrderItem {
                    id: s.next_item_id,
                    order_id: stored.id,
                    product_id: Some(item.product_id),
                    quantity: item.quantity,
                    size: item.size,
                    unit_price: item.unit_price,
                });
            }
            s.orders.push(stored.clone());

            Ok(stored)
        })
    }

    async fn count_orders_by_status(
        &self,
        user_id: i32,
        statuses: &[OrderStatus],
    ) -> Result<i64, OrderError> {
        self.with_state(|s| {
            s.check_reads()?;
            Ok(s.orders
                .iter()
                .filter(|o| o.user_id == user_id && statuses.contains(&o.status))
                .count() as i64)
        })
    }

    async fn find_latest_order_by_status(
        &self,
        user_id: i32,
        status: OrderStatus,
    ) -> Result<Option<OrderWithItems>, OrderError> {
        self.with_state(|s| {
            s.check_reads()?;
            Ok(s.orders
                .iter()
                .rev()
                .find(|o| o.user_id == user_id && o.status == status)
                .map(|o| s.with_items(o)))
        })
    }

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<OrderWithItems>, OrderError> {
        Ok(self.with_state(|s| s.orders.iter().find(|o| o.id == order_id).map(|o| s.with_items(o))))
    }

    async fn find_orders_by_user(&self, user_id: i32) -> Result<Vec<OrderWithItems>, OrderError> {
        Ok(self.with_state(|s| {
            s.orders
                .iter()
                .rev()
                .filter(|o| o.user_id == user_id)
                .map(|o| s.with_items(o))
                .collect()
        }))
    }

    async fn loyalty_summary(
        &self,
        user_id: i32,
        excluded: &[OrderStatus],
    ) -> Result<LoyaltySummary, OrderError> {
        self.with_state(|s| {
            s.check_reads()?;
            let qualifying: Vec<&Order> = s
                .orders
                .iter()
                .filter(|o| o.user_id == user_id && !excluded.contains(&o.status))
                .collect();
            Ok(LoyaltySummary {
                qualifying_spend: qualifying.iter().map(|o| o.total).sum(),
                qualifying_orders: qualifying.len() as i64,
            })
        })
    }

    async fn update_user_tier(&self, user_id: i32, tier: LoyaltyTier) -> Result<(), OrderError> {
        let delay = self.with_state(|s| s.tier_update_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.with_state(|s| {
            if s.fail_tier_updates {
                return Err(OrderError::DatabaseError("injected write failure".to_string()));
            }
            let user = s
                .users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or(OrderError::UserNotFound)?;
            user.tier = Some(tier.as_str().to_string());
            Ok(())
        })
    }
}
