use crate::{
    entities::{order, order_item, Order, OrderItem, OrderModel, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Order service: reads over placed orders and the status lifecycle.
///
/// All lookups are scoped to the requesting user; an order belonging to
/// someone else is reported as not found.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Retrieves one of the user's orders.
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Retrieves the snapshot lines of one of the user's orders.
    pub async fn get_order_items(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        // Ownership check first; the line query itself is unscoped.
        self.get_order(user_id, order_id).await?;

        Ok(OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Lists the user's orders, newest first, with pagination. Returns the
    /// page and the total count.
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((data, total))
    }

    /// Moves an order to `next` if the lifecycle allows it. Anything else,
    /// including repeating the current status, fails with
    /// `IllegalTransition` and leaves the order untouched.
    #[instrument(skip(self))]
    pub async fn transition_status(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let current = order.status;
        if !current.can_transition_to(next) {
            return Err(ServiceError::IllegalTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(next);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: current.to_string(),
                new_status: next.to_string(),
            })
            .await;

        info!(
            "Order {} transitioned {} -> {}",
            order_id, current, next
        );
        Ok(updated)
    }
}
