pub mod auth;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod contact;
pub mod orders;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::CatalogService>,
    pub cart: Arc<crate::services::CartService>,
    pub checkout: Arc<crate::services::CheckoutService>,
    pub order: Arc<crate::services::OrderService>,
    pub user: Arc<crate::services::UserService>,
    pub contact: Arc<crate::services::ContactService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<crate::auth::AuthService>,
        config: Arc<crate::config::AppConfig>,
    ) -> Self {
        let catalog = Arc::new(crate::services::CatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let cart = Arc::new(crate::services::CartService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(crate::services::CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            cart.clone(),
        ));
        let order = Arc::new(crate::services::OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let user = Arc::new(crate::services::UserService::new(
            db_pool.clone(),
            event_sender.clone(),
            auth_service,
            config,
        ));
        let contact = Arc::new(crate::services::ContactService::new(
            db_pool,
            event_sender,
        ));

        Self {
            catalog,
            cart,
            checkout,
            order,
            user,
            contact,
        }
    }
}
