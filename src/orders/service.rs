use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Principal, User};
use crate::business_rules::{
    is_reengagement_eligible, BusinessRulesError, CouponRule, CouponTable, LoyaltyEngine,
    LoyaltyTier, OrderHistorySnapshot, TierBenefits, REENGAGEMENT_COUPON,
};
use crate::models::Product;
use crate::orders::notifier::{OrderNotifier, TracingNotifier};
use crate::orders::reifier::{self, ReifiedLine};
use crate::orders::{
    CartLine, CreateOrderRequest, CreateOrderResponse, NewOrder, OrderError, OrderResponse,
    OrderStatus, OrderStore, PriceCalculator, ReengagementHint, ReorderResponse, StatsIncrement,
};

/// Longest a create-order request waits for the loyalty refresh to report
///
/// `loyaltyUpgrade` is best-effort: a refresh slower than this still runs
/// to completion but is not reported.
pub const LOYALTY_REPORT_TIMEOUT: Duration = Duration::from_millis(200);

/// Service for order business logic
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    coupons: Arc<CouponTable>,
    loyalty: Arc<LoyaltyEngine>,
    notifier: Arc<dyn OrderNotifier>,
    loyalty_timeout: Duration,
}

impl OrderService {
    /// Create a new OrderService with the default coupon table and a
    /// log-only notifier
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            loyalty: Arc::new(LoyaltyEngine::new(store.clone())),
            store,
            coupons: Arc::new(CouponTable::default()),
            notifier: Arc::new(TracingNotifier),
            loyalty_timeout: LOYALTY_REPORT_TIMEOUT,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn OrderNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_coupons(mut self, coupons: CouponTable) -> Self {
        self.coupons = Arc::new(coupons);
        self
    }

    pub fn with_loyalty_timeout(mut self, timeout: Duration) -> Self {
        self.loyalty_timeout = timeout;
        self
    }

    /// Resolve the persisted user behind a principal
    async fn resolve_user(&self, principal: Option<&Principal>) -> Result<User, OrderError> {
        let principal = principal.ok_or(OrderError::Unauthorized)?;
        self.store
            .find_user_by_email(&principal.email)
            .await?
            .ok_or(OrderError::UserNotFound)
    }

    /// Create a new order
    ///
    /// Checks run in a fixed order: principal, empty cart, request shape,
    /// then the persisted user. Custom lines are reified before pricing.
    /// Only the order insert and the user stat increments are atomic.
    ///
    /// After commit the loyalty refresh runs as its own task. Its result is
    /// reported if it arrives within the loyalty timeout; otherwise the
    /// response carries no upgrade and the task finishes on its own.
    pub async fn create_order(
        &self,
        principal: Option<&Principal>,
        mut request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, OrderError> {
        let principal = principal.ok_or(OrderError::Unauthorized)?;

        if request.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        if request
            .coupon_code
            .as_deref()
            .is_some_and(|code| code.trim().is_empty())
        {
            request.coupon_code = None;
        }

        request
            .validate()
            .map_err(|e| OrderError::ValidationError(format!("Invalid order: {}", e)))?;

        let user = self.resolve_user(Some(principal)).await?;

        let lines = reifier::reify(self.store.as_ref(), &request.items).await?;
        let catalog = self.load_catalog(&lines).await?;
        let items = PriceCalculator::price_lines(&lines, &catalog)?;
        let subtotal = PriceCalculator::items_subtotal(&items)?;
        PriceCalculator::check_submitted_total(request.total, subtotal)?;

        let tier = LoyaltyTier::from_stored(user.tier.as_deref());
        let benefits = TierBenefits::for_tier(tier);
        let coupon = match request.coupon_code.as_deref() {
            Some(code) => self.resolve_coupon(user.id, code).await,
            None => None,
        };

        let priced = PriceCalculator::price_order(subtotal, &benefits, coupon.as_ref());

        let new_order = NewOrder {
            user_id: user.id,
            total: priced.total,
            discount: priced.coupon_discount,
            vip_discount: priced.vip_discount,
            shipping_fee: priced.shipping_fee,
            applied_coupon: priced.applied_coupon.clone(),
            shipping_address: request.shipping_address,
            points_earned: priced.points_earned,
        };
        let stats = StatsIncrement {
            points: priced.points_earned,
            spent: priced.total,
            orders: 1,
        };

        let order = self.store.place_order(new_order, items, stats).await?;
        tracing::info!(
            "Order {} created for user {}: total {}, {} points",
            order.id,
            user.id,
            order.total,
            order.points_earned
        );

        self.dispatch_confirmation(principal, order.id);
        let loyalty_upgrade = self.report_loyalty(user.id).await;

        Ok(CreateOrderResponse {
            order_id: order.id,
            points_earned: priced.points_earned,
            applied_coupon: priced.applied_coupon,
            discount: priced.coupon_discount,
            vip_discount: priced.vip_discount,
            shipping_fee: priced.shipping_fee,
            total: priced.total,
            user_tier: tier,
            loyalty_upgrade,
        })
    }

    /// Current catalog entries for the lines that reference the catalog
    async fn load_catalog(
        &self,
        lines: &[ReifiedLine],
    ) -> Result<HashMap<Uuid, Product>, OrderError> {
        let ids: Vec<Uuid> = lines
            .iter()
            .filter(|line| !line.custom)
            .map(|line| line.product_id)
            .collect();

        Ok(self
            .store
            .find_products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect())
    }

    /// A coupon that cannot be evaluated is treated as not applicable
    async fn resolve_coupon(&self, user_id: i32, code: &str) -> Option<CouponRule> {
        match self.coupons.resolve(self.store.as_ref(), user_id, code).await {
            Ok(rule) => rule,
            Err(e) => {
                tracing::warn!("Ignoring coupon {:?} for user {}: {}", code, user_id, e);
                None
            }
        }
    }

    /// Confirmations go to the session principal, not the stored profile
    fn dispatch_confirmation(&self, principal: &Principal, order_id: Uuid) {
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let email = principal.email.clone();
        let name = principal.name.clone();

        tokio::spawn(async move {
            let order = match store.find_order_by_id(order_id).await {
                Ok(Some(order)) => order,
                Ok(None) => {
                    tracing::warn!("Order {} vanished before confirmation", order_id);
                    return;
                }
                Err(e) => {
                    tracing::warn!("Failed to load order {} for confirmation: {}", order_id, e);
                    return;
                }
            };

            if let Err(e) = notifier.send_order_confirmation(&email, &name, &order).await {
                tracing::warn!("Failed to send confirmation for order {}: {}", order_id, e);
            }
        });
    }

    async fn report_loyalty(&self, user_id: i32) -> Option<LoyaltyTier> {
        let engine = self.loyalty.clone();
        let task = tokio::spawn(async move { engine.refresh_tier(user_id).await });

        match tokio::time::timeout(self.loyalty_timeout, task).await {
            Ok(Ok(Ok(upgrade))) => upgrade,
            Ok(Ok(Err(e))) => {
                tracing::warn!("Loyalty refresh failed for user {}: {}", user_id, e);
                None
            }
            Ok(Err(join_error)) => {
                let e = BusinessRulesError::TaskFailed(join_error.to_string());
                tracing::warn!("Loyalty refresh for user {} aborted: {}", user_id, e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Loyalty refresh for user {} still running after {:?}",
                    user_id,
                    self.loyalty_timeout
                );
                None
            }
        }
    }

    /// Place a new order from the lines of a previous one
    ///
    /// Lines are re-priced at today's catalog prices. Lines whose product
    /// has since been deleted are dropped. No coupon is carried over.
    pub async fn quick_reorder(
        &self,
        principal: Option<&Principal>,
        order_id: Uuid,
    ) -> Result<ReorderResponse, OrderError> {
        let user = self.resolve_user(principal).await?;

        let previous = self
            .store
            .find_order_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if previous.order.user_id != user.id {
            return Err(OrderError::Forbidden(
                "You do not have permission to reorder this order".to_string(),
            ));
        }

        let items: Vec<CartLine> = previous
            .items
            .into_iter()
            .filter_map(|line| {
                let product = line.product?;
                Some(CartLine {
                    id: product.id.to_string(),
                    name: product.name,
                    price: product.price,
                    quantity: line.item.quantity,
                    size: Some(line.item.size),
                    image: product.image,
                })
            })
            .collect();

        if items.is_empty() {
            return Err(OrderError::NoAvailableProducts);
        }

        let subtotals = items
            .iter()
            .map(|line| PriceCalculator::calculate_subtotal(line.quantity, line.price))
            .collect::<Result<Vec<_>, _>>()?;
        let request = CreateOrderRequest {
            total: PriceCalculator::calculate_total(&subtotals)?,
            items,
            shipping_address: previous.order.shipping_address,
            coupon_code: None,
        };

        let created = self.create_order(principal, request).await?;
        tracing::info!("Order {} reordered as {}", order_id, created.order_id);

        Ok(ReorderResponse {
            order_id: created.order_id,
        })
    }

    /// Win-back hint for a customer who cancelled and never completed
    ///
    /// Only the name and image of a product from the most recent cancelled
    /// order are exposed.
    pub async fn reengagement_hint(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Option<ReengagementHint>, OrderError> {
        let user = self.resolve_user(principal).await?;

        let history = OrderHistorySnapshot::load(self.store.as_ref(), user.id)
            .await
            .map_err(|e| match e {
                BusinessRulesError::StoreError(inner) => inner,
                other => OrderError::DatabaseError(other.to_string()),
            })?;

        if !is_reengagement_eligible(&history) {
            return Ok(None);
        }

        let latest = self
            .store
            .find_latest_order_by_status(user.id, OrderStatus::Cancelled)
            .await?;

        Ok(latest
            .and_then(|order| order.items.into_iter().find_map(|line| line.product))
            .map(|product| ReengagementHint {
                product_name: product.name,
                product_image: product.image,
                coupon_code: REENGAGEMENT_COUPON.to_string(),
            }))
    }

    /// Get all orders of the caller, newest first
    pub async fn get_user_orders(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let user = self.resolve_user(principal).await?;
        let orders = self.store.find_orders_by_user(user.id).await?;

        Ok(orders.into_iter().map(Into::into).collect())
    }

    /// Get a specific order of the caller
    pub async fn get_order_by_id(
        &self,
        principal: Option<&Principal>,
        order_id: Uuid,
    ) -> Result<OrderResponse, OrderError> {
        let user = self.resolve_user(principal).await?;

        let order = self
            .store
            .find_order_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if order.order.user_id != user.id {
            return Err(OrderError::Forbidden(
                "You do not have permission to access this order".to_string(),
            ));
        }

        Ok(order.into())
    }
}
