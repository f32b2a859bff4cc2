use crate::{
    entities::{
        billing_address, cart, cart_item, order, order_item, BillingAddress, Cart, CartItem,
        OrderStatus, Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::carts::CartService,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Checkout service: converts a cart into an order.
///
/// The whole conversion is one transaction. Order lines snapshot the
/// product name and unit price as they are at checkout, so later catalog
/// edits never rewrite billing history. The source cart is emptied in the
/// same transaction; a crash mid-checkout leaves both the order absent and
/// the cart intact.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    cart_service: Arc<CartService>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        cart_service: Arc<CartService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            cart_service,
        }
    }

    /// Places an order from the user's cart. An empty (or absent) cart
    /// yields `EmptyCart` and creates nothing.
    #[instrument(skip(self, input))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        input: BillingAddressInput,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or(ServiceError::EmptyCart)?;

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(&txn)
            .await?;

        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let billing_address = self.find_or_create_billing_address(&txn, user_id, input).await?;

        let order_id = Uuid::new_v4();
        let now = Utc::now();

        // Snapshot each line before totalling so the stored total and the
        // stored lines can never disagree.
        let mut total_price = Decimal::ZERO;
        let mut order_lines = Vec::with_capacity(lines.len());
        for (line, product) in lines {
            let product = product.ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product {} is no longer available",
                    line.product_id
                ))
            })?;

            total_price += product.price * Decimal::from(line.quantity);
            order_lines.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name),
                quantity: Set(line.quantity),
                unit_price: Set(product.price),
                created_at: Set(now),
            });
        }

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!(
                "ORD-{}",
                order_id.to_string()[..8].to_uppercase()
            )),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            total_price: Set(total_price),
            billing_address_id: Set(billing_address.id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order.insert(&txn).await?;

        for order_line in order_lines {
            order_line.insert(&txn).await?;
        }

        self.cart_service.clear_cart_items(&txn, cart.id).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;
        self.event_sender
            .send_or_log(Event::CartCleared(cart.id))
            .await;

        info!(
            "Checkout completed: order {} ({}) created from cart {}",
            order_id, order.order_number, cart.id
        );
        Ok(order)
    }

    /// Reuses the user's existing billing address, creating one from the
    /// submitted fields when none is on file.
    async fn find_or_create_billing_address<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
        input: BillingAddressInput,
    ) -> Result<billing_address::Model, ServiceError> {
        if let Some(existing) = BillingAddress::find()
            .filter(billing_address::Column::UserId.eq(user_id))
            .one(conn)
            .await?
        {
            return Ok(existing);
        }

        let address = billing_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            full_name: Set(input.full_name),
            line1: Set(input.line1),
            line2: Set(input.line2),
            city: Set(input.city),
            state: Set(input.state),
            postal_code: Set(input.postal_code),
            country: Set(input.country),
            phone: Set(input.phone),
            created_at: Set(Utc::now()),
        };

        Ok(address.insert(conn).await?)
    }
}

/// Billing fields submitted at checkout
#[derive(Debug, Deserialize)]
pub struct BillingAddressInput {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}
