use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::User;
use crate::business_rules::LoyaltyTier;
use crate::models::{Category, NewProduct, Product};
use crate::orders::error::OrderError;
use crate::orders::models::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderLine, OrderStatus, OrderWithItems,
    StatsIncrement,
};

const USER_COLUMNS: &str = "id, email, name, tier, points, total_spent, order_count";
const PRODUCT_COLUMNS: &str = "id, name, description, price, image, category_id";
const ORDER_COLUMNS: &str = "id, user_id, total, discount, vip_discount, shipping_fee, \
     applied_coupon, status, shipping_address, points_earned, created_at";

/// Spend and order count that count towards a loyalty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromRow)]
pub struct LoyaltySummary {
    pub qualifying_spend: Decimal,
    pub qualifying_orders: i64,
}

/// Persistence operations the order core depends on
#[axum::async_trait]
pub trait OrderStore: Send + Sync {
    /// Case-insensitive lookup by email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, OrderError>;

    async fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>, OrderError>;

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, OrderError>;

    /// Insert a product, or return the existing row with the same name
    async fn create_product(&self, product: NewProduct) -> Result<Product, OrderError>;

    async fn find_or_create_category(&self, name: &str) -> Result<Category, OrderError>;

    async fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, OrderError>;

    /// Insert the order, its items and the user's stat increments atomically
    ///
    /// Either everything is written or nothing is.
    async fn place_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        stats: StatsIncrement,
    ) -> Result<Order, OrderError>;

    async fn count_orders_by_status(
        &self,
        user_id: i32,
        statuses: &[OrderStatus],
    ) -> Result<i64, OrderError>;

    /// Most recent order of the user in the given status
    async fn find_latest_order_by_status(
        &self,
        user_id: i32,
        status: OrderStatus,
    ) -> Result<Option<OrderWithItems>, OrderError>;

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<OrderWithItems>, OrderError>;

    /// All orders of the user, newest first
    async fn find_orders_by_user(&self, user_id: i32) -> Result<Vec<OrderWithItems>, OrderError>;

    /// Sum of order totals excluding the given statuses
    async fn loyalty_summary(
        &self,
        user_id: i32,
        excluded: &[OrderStatus],
    ) -> Result<LoyaltySummary, OrderError>;

    async fn update_user_tier(&self, user_id: i32, tier: LoyaltyTier) -> Result<(), OrderError>;
}

fn status_names(statuses: &[OrderStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// PostgreSQL implementation of [`OrderStore`]
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new PgOrderStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load items and their surviving products for a batch of orders
    async fn attach_items(&self, orders: Vec<Order>) -> Result<Vec<OrderWithItems>, OrderError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, size, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
        let products: HashMap<Uuid, Product> = self
            .find_products_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines_by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for item in items {
            let product = item.product_id.and_then(|id| products.get(&id).cloned());
            lines_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderLine { item, product });
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = lines_by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    async fn place_order_tx(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        stats: StatsIncrement,
    ) -> Result<Order, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (user_id, total, discount, vip_discount, shipping_fee,
                                applied_coupon, status, shipping_address, points_earned)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.user_id)
        .bind(order.total)
        .bind(order.discount)
        .bind(order.vip_discount)
        .bind(order.shipping_fee)
        .bind(&order.applied_coupon)
        .bind(OrderStatus::Pending)
        .bind(&order.shipping_address)
        .bind(order.points_earned)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, size, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(inserted.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.size)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET points = points + $1,
                total_spent = total_spent + $2,
                order_count = order_count + $3
            WHERE id = $4
            "#,
        )
        .bind(stats.points)
        .bind(stats.spent)
        .bind(stats.orders)
        .bind(order.user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(inserted)
    }
}

#[axum::async_trait]
impl OrderStore for PgOrderStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, OrderError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>, OrderError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_product_by_name(&self, name: &str) -> Result<Option<Product>, OrderError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE name = $1",
            PRODUCT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, OrderError> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let created = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, description, price, image, category_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .bind(product.category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_or_create_category(&self, name: &str) -> Result<Category, OrderError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, OrderError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ANY($1)",
            PRODUCT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn place_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
        stats: StatsIncrement,
    ) -> Result<Order, OrderError> {
        let user_id = order.user_id;
        self.place_order_tx(order, items, stats).await.map_err(|e| {
            OrderError::TransactionFailed(format!("user {}: {}", user_id, e))
        })
    }

    async fn count_orders_by_status(
        &self,
        user_id: i32,
        statuses: &[OrderStatus],
    ) -> Result<i64, OrderError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND status = ANY($2)",
        )
        .bind(user_id)
        .bind(status_names(statuses))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_latest_order_by_status(
        &self,
        user_id: i32,
        status: OrderStatus,
    ) -> Result<Option<OrderWithItems>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = $1 AND status = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(order) => Ok(self.attach_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_order_by_id(&self, order_id: Uuid) -> Result<Option<OrderWithItems>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(order) => Ok(self.attach_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_orders_by_user(&self, user_id: i32) -> Result<Vec<OrderWithItems>, OrderError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(orders).await
    }

    async fn loyalty_summary(
        &self,
        user_id: i32,
        excluded: &[OrderStatus],
    ) -> Result<LoyaltySummary, OrderError> {
        let summary = sqlx::query_as::<_, LoyaltySummary>(
            r#"
            SELECT COALESCE(SUM(total), 0) AS qualifying_spend,
                   COUNT(*) AS qualifying_orders
            FROM orders
            WHERE user_id = $1 AND NOT (status = ANY($2))
            "#,
        )
        .bind(user_id)
        .bind(status_names(excluded))
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    async fn update_user_tier(&self, user_id: i32, tier: LoyaltyTier) -> Result<(), OrderError> {
        let result = sqlx::query("UPDATE users SET tier = $1 WHERE id = $2")
            .bind(tier.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OrderError::UserNotFound);
        }

        Ok(())
    }
}
