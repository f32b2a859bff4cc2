use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

An online storefront backend: product catalog, user accounts, shopping
carts, checkout, and order history.

## Authentication

Register via `POST /auth/register`, log in via `POST /auth/login`, and
send the returned JWT on guarded endpoints:

```
Authorization: Bearer <your-jwt-token>
```

Catalog reads and the contact form are public. Cart, checkout, and order
endpoints operate on the authenticated user's own data.

## Error Handling

Errors use a consistent JSON shape with appropriate HTTP status codes:

```json
{
  "error": "Product not found",
  "status": 404
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20)
query parameters.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "products", description = "Product catalog endpoints"),
        (name = "cart", description = "Shopping cart endpoints"),
        (name = "checkout", description = "Order placement"),
        (name = "orders", description = "Order history and lifecycle"),
        (name = "contact", description = "Contact form")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,

        // Catalog
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,

        // Cart
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_to_cart,
        crate::handlers::carts::update_cart_item,
        crate::handlers::carts::remove_cart_item,

        // Checkout & orders
        crate::handlers::checkout::checkout,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_items,
        crate::handlers::orders::update_order_status,

        // Contact
        crate::handlers::contact::submit_contact,
    ),
    components(
        schemas(
            // Auth types
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::auth::TokenPair,

            // Catalog types
            crate::handlers::products::CreateProductRequest,

            // Cart types
            crate::handlers::carts::AddItemRequest,
            crate::handlers::carts::UpdateQuantityRequest,
            crate::services::carts::CartView,
            crate::services::carts::CartLineView,

            // Checkout & order types
            crate::handlers::checkout::CheckoutRequest,
            crate::handlers::orders::UpdateStatusRequest,
            crate::entities::OrderStatus,

            // Contact types
            crate::handlers::contact::ContactRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_covers_core_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/products"));
        assert!(json.contains("/api/v1/checkout"));
        assert!(json.contains("bearer_auth"));
    }
}
