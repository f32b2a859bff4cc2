//! Business logic services for the storefront.

pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod orders;
pub mod users;

pub use carts::CartService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use contact::ContactService;
pub use orders::OrderService;
pub use users::UserService;
