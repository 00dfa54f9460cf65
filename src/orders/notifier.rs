// Order confirmation dispatch

use crate::orders::models::OrderWithItems;

/// Error raised by a notification channel
#[derive(Debug, thiserror::Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Sends order confirmations to customers
///
/// Dispatch happens after the order has committed and is never awaited by
/// the request, so implementations may be slow or fail without consequence
/// for the order.
#[axum::async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn send_order_confirmation(
        &self,
        email: &str,
        name: &str,
        order: &OrderWithItems,
    ) -> Result<(), NotifyError>;
}

/// Notifier that records confirmations in the log
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[axum::async_trait]
impl OrderNotifier for TracingNotifier {
    async fn send_order_confirmation(
        &self,
        email: &str,
        name: &str,
        order: &OrderWithItems,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %order.order.id,
            items = order.items.len(),
            total = %order.order.total,
            "Order confirmation for {} <{}>",
            name,
            email
        );
        Ok(())
    }
}
