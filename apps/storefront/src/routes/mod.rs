//! # HTTP Routes
//!
//! ```text
//! GET  /api/health                 health::health
//! GET  /api/products               products::list_products
//! GET  /api/products/{id}          products::get_product
//! POST /api/orders                 orders::place_order
//! GET  /api/orders/{orderNumber}   orders::get_order
//! ```

pub mod health;
pub mod orders;
pub mod products;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .route("/orders", post(orders::place_order))
        .route("/orders/{order_number}", get(orders::get_order));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use esales_core::Money;
    use esales_db::{Database, DbConfig, NewProduct, NewVariant};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::notification::RecordingNotificationSender;
    use crate::payment::{FixedOutcomeProcessor, PaymentOutcome};
    use crate::services::OrderService;
    use crate::AppState;

    pub struct TestApp {
        pub router: Router,
        pub db: Database,
        pub sender: Arc<RecordingNotificationSender>,
        pub product_id: i64,
        pub variant_id: i64,
    }

    /// One product at $20.00 with a +$5.00 variant holding `stock` units.
    pub async fn test_app(outcome: PaymentOutcome, stock: i64) -> TestApp {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product_id = db
            .catalog()
            .insert_product(&NewProduct {
                name: "Classic Sneaker".into(),
                description: Some("Everyday sneaker".into()),
                price: Money::from_cents(2000),
                image_url: None,
            })
            .await
            .unwrap();
        let variant_id = db
            .catalog()
            .insert_variant(&NewVariant {
                product_id,
                name: "Color".into(),
                value: "Red".into(),
                price_adjustment: Money::from_cents(500),
                stock,
            })
            .await
            .unwrap();

        let sender = Arc::new(RecordingNotificationSender::new());
        let orders = OrderService::new(
            db.clone(),
            Arc::new(FixedOutcomeProcessor::new(outcome)),
            sender.clone(),
        );
        let state = AppState::new(db.clone(), orders);

        TestApp {
            router: super::build_router(state),
            db,
            sender,
            product_id,
            variant_id,
        }
    }

    pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
