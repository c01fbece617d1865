//! # Catalog Repository
//!
//! Products, their variants and variant stock.
//!
//! ## Stock Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Guarded Conditional Decrement                            │
//! │                                                                         │
//! │  UPDATE variants                                                       │
//! │     SET stock = stock - :qty                                           │
//! │   WHERE id = :variant AND product_id = :product AND stock >= :qty      │
//! │       │                                                                 │
//! │       ├── 1 row  ──► Reserved { remaining }                            │
//! │       │                                                                 │
//! │       └── 0 rows ──► SELECT stock ...                                  │
//! │                        ├── found   ──► Insufficient { available }      │
//! │                        └── missing ──► VariantMissing                  │
//! │                                                                         │
//! │  One statement decides. There is no read-then-write window, so two     │
//! │  placements racing for the last units cannot both succeed.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reservation and release take a `&mut SqliteConnection` so they run inside
//! the caller's transaction (`&mut *tx`).

use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use esales_core::{Money, Product, Variant};

// =============================================================================
// Records
// =============================================================================

/// Row of the `products` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub image_url: Option<String>,
}

impl ProductRecord {
    fn into_product(self, variants: Vec<Variant>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: Money::from_cents(self.price_cents),
            image_url: self.image_url,
            variants,
        }
    }
}

/// Row of the `variants` table.
#[derive(Debug, Clone, FromRow)]
pub struct VariantRecord {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub value: String,
    pub price_adjustment_cents: i64,
    pub stock: i64,
}

impl From<VariantRecord> for Variant {
    fn from(r: VariantRecord) -> Self {
        Variant {
            id: r.id,
            product_id: r.product_id,
            name: r.name,
            value: r.value,
            price_adjustment: Money::from_cents(r.price_adjustment_cents),
            stock: r.stock,
        }
    }
}

/// Input for inserting a product (seeding and tests).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub image_url: Option<String>,
}

/// Input for inserting a variant (seeding and tests).
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub product_id: i64,
    pub name: String,
    pub value: String,
    pub price_adjustment: Money,
    pub stock: i64,
}

/// Result of a guarded stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockReservation {
    /// Stock was decremented; `remaining` is the new level.
    Reserved { remaining: i64 },
    /// The variant exists but holds fewer units than requested.
    Insufficient { available: i64 },
    /// No variant with that id belongs to the product.
    VariantMissing,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let products = db.catalog().list_products().await?;
/// let product = db.catalog().get_product(1).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, image_url";
const VARIANT_COLUMNS: &str = "id, product_id, name, value, price_adjustment_cents, stock";

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Lists all products ordered by id, each with its variants ordered by id.
    pub async fn list_products(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let variants = sqlx::query_as::<_, VariantRecord>(&format!(
            "SELECT {} FROM variants ORDER BY product_id, id",
            VARIANT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut variants = variants.into_iter().peekable();
        let mut result = Vec::with_capacity(products.len());

        // Both lists are sorted by product id, so one pass groups them.
        for product in products {
            let mut own = Vec::new();
            while let Some(v) = variants.peek() {
                if v.product_id < product.id {
                    variants.next();
                } else if v.product_id == product.id {
                    if let Some(v) = variants.next() {
                        own.push(Variant::from(v));
                    }
                } else {
                    break;
                }
            }
            result.push(product.into_product(own));
        }

        debug!(count = result.len(), "Listed products");
        Ok(result)
    }

    /// Gets a product with its variants.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_product(&self, id: i64) -> DbResult<Option<Product>> {
        let Some(product) = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let variants = sqlx::query_as::<_, VariantRecord>(&format!(
            "SELECT {} FROM variants WHERE product_id = ?1 ORDER BY id",
            VARIANT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(product.into_product(
            variants.into_iter().map(Variant::from).collect(),
        )))
    }

    /// Gets a single variant.
    pub async fn get_variant(&self, id: i64) -> DbResult<Option<Variant>> {
        let variant = sqlx::query_as::<_, VariantRecord>(&format!(
            "SELECT {} FROM variants WHERE id = ?1",
            VARIANT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant.map(Variant::from))
    }

    /// Inserts a product and returns its id.
    pub async fn insert_product(&self, product: &NewProduct) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (name, description, price_cents, image_url)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.image_url)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, name = %product.name, "Inserted product");
        Ok(id)
    }

    /// Inserts a variant and returns its id.
    pub async fn insert_variant(&self, variant: &NewVariant) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO variants (product_id, name, value, price_adjustment_cents, stock)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(variant.product_id)
        .bind(&variant.name)
        .bind(&variant.value)
        .bind(variant.price_adjustment.cents())
        .bind(variant.stock)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, product_id = variant.product_id, value = %variant.value, "Inserted variant");
        Ok(id)
    }

    /// Atomically decrements stock if, and only if, enough is on hand.
    ///
    /// Runs on the caller's connection so the decrement commits or rolls
    /// back with the rest of the order.
    pub async fn reserve_stock(
        conn: &mut SqliteConnection,
        product_id: i64,
        variant_id: i64,
        quantity: i64,
    ) -> DbResult<StockReservation> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE variants
            SET stock = stock - ?1
            WHERE id = ?2 AND product_id = ?3 AND stock >= ?1
            RETURNING stock
            "#,
        )
        .bind(quantity)
        .bind(variant_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(remaining) = remaining {
            debug!(variant_id, quantity, remaining, "Reserved stock");
            return Ok(StockReservation::Reserved { remaining });
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM variants WHERE id = ?1 AND product_id = ?2")
                .bind(variant_id)
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(match available {
            Some(available) => StockReservation::Insufficient { available },
            None => StockReservation::VariantMissing,
        })
    }

    /// Returns previously reserved units to a variant.
    pub async fn release_stock(
        conn: &mut SqliteConnection,
        variant_id: i64,
        quantity: i64,
    ) -> DbResult<()> {
        sqlx::query("UPDATE variants SET stock = stock + ?1 WHERE id = ?2")
            .bind(quantity)
            .bind(variant_id)
            .execute(&mut *conn)
            .await?;

        debug!(variant_id, quantity, "Released stock");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
