use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartModel, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Shopping cart service.
///
/// Each user has exactly one cart, created lazily on first touch. All
/// read-then-write paths run in a single transaction; the unique keys on
/// `carts.user_id` and `cart_items(cart_id, product_id)` make the two
/// get-or-create patterns race-safe. Totals are always computed from the
/// current catalog price; the cached `item_count`/`subtotal` columns on the
/// cart row are refreshed in the same transaction as the mutation that
/// invalidated them.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the user's cart, creating it if it does not exist yet.
    /// Idempotent under concurrent calls for the same user.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, user_id: Uuid) -> Result<CartModel, ServiceError> {
        let (cart, created) = self.find_or_create_cart(&*self.db, user_id).await?;

        if created {
            self.event_sender
                .send_or_log(Event::CartCreated(cart.id))
                .await;
            info!("Created cart {} for user {}", cart.id, user_id);
        }

        Ok(cart)
    }

    /// Adds a product to the user's cart, incrementing the existing line's
    /// quantity when the product is already present.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartView, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let (cart, _) = self.find_or_create_cart(&txn, user_id).await?;

        // The product must exist before a line can reference it.
        Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        self.upsert_line(&txn, cart.id, input.product_id, input.quantity)
            .await?;

        let cart = self.refresh_cart_totals(&txn, cart.id).await?;
        let view = self.build_cart_view(&txn, cart).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: view.id,
                product_id: input.product_id,
            })
            .await;

        info!(
            "Added product {} x{} to cart {}",
            input.product_id, input.quantity, view.id
        );
        Ok(view)
    }

    /// Sets the absolute quantity of a cart line. A quantity of zero or
    /// less deletes the line.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, user_id).await?;
        let item = self.find_owned_item(&txn, cart.id, item_id).await?;

        if quantity <= 0 {
            item.delete(&txn).await?;
        } else {
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        }

        let cart = self.refresh_cart_totals(&txn, cart.id).await?;
        let view = self.build_cart_view(&txn, cart).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: view.id,
                item_id,
            })
            .await;

        Ok(view)
    }

    /// Removes a line from the user's cart. Removing a line that is not
    /// there (including a second removal of the same line) is an error.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = self.find_cart(&txn, user_id).await?;
        let item = self.find_owned_item(&txn, cart.id, item_id).await?;
        item.delete(&txn).await?;

        let cart = self.refresh_cart_totals(&txn, cart.id).await?;
        let view = self.build_cart_view(&txn, cart).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: view.id,
                item_id,
            })
            .await;

        Ok(view)
    }

    /// Returns the user's cart with lines and freshly computed totals.
    /// Reading never mutates line quantities, so two consecutive reads
    /// yield the same totals.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;
        self.build_cart_view(&*self.db, cart).await
    }

    /// Deletes every line of a cart and zeroes its cached totals. Runs on
    /// the caller's connection so checkout can include it in its own
    /// transaction.
    pub async fn clear_cart_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
    ) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(conn)
            .await?;

        let mut cart: cart::ActiveModel = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?
            .into();

        cart.item_count = Set(0);
        cart.subtotal = Set(Decimal::ZERO);
        cart.updated_at = Set(Utc::now());
        cart.update(conn).await?;

        Ok(())
    }

    /// Find-or-insert keyed on the unique `user_id` column. A lost insert
    /// race is resolved by re-reading. Returns whether this call created
    /// the cart.
    async fn find_or_create_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<(CartModel, bool), ServiceError> {
        if let Some(cart) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await?
        {
            return Ok((cart, false));
        }

        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            item_count: Set(0),
            subtotal: Set(Decimal::ZERO),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        match cart.insert(conn).await {
            Ok(cart) => Ok((cart, true)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let cart = Cart::find()
                    .filter(cart::Column::UserId.eq(user_id))
                    .one(conn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "Cart for user {} vanished after conflicting insert",
                            user_id
                        ))
                    })?;
                Ok((cart, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart for user {} not found", user_id)))
    }

    async fn find_owned_item<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
        item_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        // A foreign item is reported the same as a missing one so a user
        // cannot probe other carts' line ids.
        if item.cart_id != cart_id {
            return Err(ServiceError::NotFound(format!(
                "Cart item {} not found",
                item_id
            )));
        }

        Ok(item)
    }

    /// Insert a line for (cart, product) or increment the existing one.
    /// A unique violation on insert means a concurrent request created the
    /// line first; the lookup is retried once and the increment applied to
    /// the winner's row.
    async fn upsert_line<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(conn)
            .await?;

        if let Some(item) = existing {
            return self.increment_line(conn, item, quantity).await;
        }

        let line = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        match line.insert(conn).await {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let item = CartItem::find()
                    .filter(cart_item::Column::CartId.eq(cart_id))
                    .filter(cart_item::Column::ProductId.eq(product_id))
                    .one(conn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "Cart line for product {} vanished after conflicting insert",
                            product_id
                        ))
                    })?;
                self.increment_line(conn, item, quantity).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn increment_line<C: ConnectionTrait>(
        &self,
        conn: &C,
        item: cart_item::Model,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let current = item.quantity;
        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(current + quantity);
        item.updated_at = Set(Utc::now());
        item.update(conn).await?;
        Ok(())
    }

    /// Recomputes the cached `item_count` and `subtotal` from the lines
    /// and current catalog prices.
    async fn refresh_cart_totals<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        let mut item_count = 0i32;
        let mut subtotal = Decimal::ZERO;
        for (line, product) in &lines {
            match product {
                Some(product) => {
                    item_count += line.quantity;
                    subtotal += product.price * Decimal::from(line.quantity);
                }
                None => {
                    warn!(
                        "Cart {} line {} references missing product {}",
                        cart_id, line.id, line.product_id
                    );
                }
            }
        }

        let mut cart: cart::ActiveModel = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?
            .into();

        cart.item_count = Set(item_count);
        cart.subtotal = Set(subtotal);
        cart.updated_at = Set(Utc::now());

        Ok(cart.update(conn).await?)
    }

    /// Builds the response view: lines joined to products, line totals and
    /// the cart total computed from the current catalog prices.
    async fn build_cart_view<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: CartModel,
    ) -> Result<CartView, ServiceError> {
        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(conn)
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        let mut total_price = Decimal::ZERO;
        let mut item_count = 0i32;

        for (line, product) in lines {
            let Some(product) = product else {
                warn!(
                    "Cart {} line {} references missing product {}",
                    cart.id, line.id, line.product_id
                );
                continue;
            };

            let line_total = product.price * Decimal::from(line.quantity);
            total_price += line_total;
            item_count += line.quantity;

            items.push(CartLineView {
                id: line.id,
                product_id: product.id,
                product_name: product.name,
                unit_price: product.price,
                quantity: line.quantity,
                line_total,
            });
        }

        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            items,
            item_count,
            total_price,
            updated_at: cart.updated_at,
        })
    }
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Cart line as returned to clients. Prices reflect the catalog at read
/// time.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Cart with lines and computed totals
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLineView>,
    /// Total number of units across all lines
    pub item_count: i32,
    /// Sum of line totals at current catalog prices
    pub total_price: Decimal,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_to_cart_input_deserialization() {
        let json = r#"{
            "product_id": "550e8400-e29b-41d4-a716-446655440000",
            "quantity": 3
        }"#;

        let input: AddToCartInput =
            serde_json::from_str(json).expect("deserialization should succeed");
        assert_eq!(input.quantity, 3);
        assert_eq!(
            input.product_id.to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn line_total_is_quantity_times_unit_price() {
        let unit_price = dec!(19.99);
        let quantity = 3;
        assert_eq!(unit_price * Decimal::from(quantity), dec!(59.97));
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let lines = [(dec!(10.00), 2), (dec!(5.50), 1), (dec!(0.99), 10)];
        let subtotal: Decimal = lines
            .iter()
            .map(|(price, qty)| *price * Decimal::from(*qty))
            .sum();
        assert_eq!(subtotal, dec!(35.40));
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        let lines: [(Decimal, i32); 0] = [];
        let subtotal: Decimal = lines
            .iter()
            .map(|(price, qty)| *price * Decimal::from(*qty))
            .sum();
        assert_eq!(subtotal, Decimal::ZERO);
    }
}
