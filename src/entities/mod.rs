//! Database entities for the storefront.

pub mod billing_address;
pub mod cart;
pub mod cart_item;
pub mod contact;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

// Re-export entities
pub use billing_address::{Entity as BillingAddress, Model as BillingAddressModel};
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use contact::{Entity as Contact, Model as ContactModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use user::{Entity as User, Model as UserModel};
