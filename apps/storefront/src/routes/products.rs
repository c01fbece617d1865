//! Catalog endpoints.

use axum::extract::{Path, State};
use axum::Json;
use esales_core::Product;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `GET /api/products`
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    let products = state.orders.list_products().await?;
    Ok(Json(products))
}

/// `GET /api/products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    // A non-numeric id can't name a product
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::not_found("Product not found"))?;

    let product = state.orders.get_product(id).await?;
    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use crate::payment::PaymentOutcome;
    use crate::routes::test_support::{get, send, test_app};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_list_products_has_numeric_fields() {
        let app = test_app(PaymentOutcome::Completed, 7).await;
        let (status, body) = send(&app.router, get("/api/products")).await;

        assert_eq!(status, StatusCode::OK);
        let products = body.as_array().unwrap();
        assert_eq!(products.len(), 1);

        let product = &products[0];
        assert_eq!(product["name"], "Classic Sneaker");
        assert!(product["price"].is_number());
        assert_eq!(product["price"].as_f64(), Some(20.0));

        let variant = &product["variants"][0];
        assert_eq!(variant["value"], "Red");
        assert_eq!(variant["price_adjustment"].as_f64(), Some(5.0));
        assert_eq!(variant["stock"].as_i64(), Some(7));
    }

    #[tokio::test]
    async fn test_get_product() {
        let app = test_app(PaymentOutcome::Completed, 7).await;

        let (status, body) =
            send(&app.router, get(&format!("/api/products/{}", app.product_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"].as_i64(), Some(app.product_id));

        let (status, _) = send(&app.router, get("/api/products/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app.router, get("/api/products/abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Product not found");
    }
}
