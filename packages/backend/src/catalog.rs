//! Read-only registry queries backing the catalog endpoints.

use serde::Serialize;
use sqlx::PgPool;

use crate::error::{BackendError, Result};
use crate::models::{CropMeta, PestMeta, Product};

/// An approval with its condition texts joined in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApprovalDetail {
    pub id: i64,
    pub product_id: i64,
    pub crop_id: i64,
    pub pest_id: i64,
    pub dosage: String,
    pub dosage_from: String,
    pub dosage_to: String,
    pub dosage_unit: String,
    pub waiting_period: String,
    pub max_applications: String,
    pub conditions: Vec<String>,
}

pub async fn list_crops(pool: &PgPool) -> Result<Vec<CropMeta>> {
    let crops = sqlx::query_as::<_, CropMeta>(r#"SELECT * FROM crop_meta ORDER BY name"#)
        .fetch_all(pool)
        .await?;

    Ok(crops)
}

/// List products, optionally restricted to those approved for a crop.
pub async fn list_products(pool: &PgPool, crop_id: Option<i64>) -> Result<Vec<Product>> {
    let products = match crop_id {
        Some(crop_id) => {
            sqlx::query_as::<_, Product>(
                r#"
                SELECT DISTINCT p.*
                FROM products p
                JOIN approvals a ON a.product_id = p.id
                WHERE a.crop_id = $1
                ORDER BY p.name
                "#,
            )
            .bind(crop_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Product>(r#"SELECT * FROM products ORDER BY name"#)
                .fetch_all(pool)
                .await?
        }
    };

    Ok(products)
}

/// List pests; with both a crop and a product the list narrows to pests
/// those two have an approval for.
pub async fn list_pests(
    pool: &PgPool,
    crop_id: Option<i64>,
    product_id: Option<i64>,
) -> Result<Vec<PestMeta>> {
    let pests = match (crop_id, product_id) {
        (Some(crop_id), Some(product_id)) => {
            sqlx::query_as::<_, PestMeta>(
                r#"
                SELECT DISTINCT pm.*
                FROM pest_meta pm
                JOIN approvals a ON a.pest_id = pm.id
                WHERE a.crop_id = $1 AND a.product_id = $2
                ORDER BY pm.name
                "#,
            )
            .bind(crop_id)
            .bind(product_id)
            .fetch_all(pool)
            .await?
        }
        _ => {
            sqlx::query_as::<_, PestMeta>(r#"SELECT * FROM pest_meta ORDER BY name"#)
                .fetch_all(pool)
                .await?
        }
    };

    Ok(pests)
}

/// List approvals for a (crop, product, pest) triple.
///
/// All three filters are required; anything less answers empty rather than
/// dumping the whole fact table.
pub async fn list_approvals(
    pool: &PgPool,
    crop_id: Option<i64>,
    product_id: Option<i64>,
    pest_id: Option<i64>,
) -> Result<Vec<ApprovalDetail>> {
    let (Some(crop_id), Some(product_id), Some(pest_id)) = (crop_id, product_id, pest_id) else {
        return Ok(Vec::new());
    };

    let approvals = sqlx::query_as::<_, ApprovalDetail>(
        r#"
        SELECT a.id, a.product_id, a.crop_id, a.pest_id, a.dosage, a.dosage_from,
               a.dosage_to, a.dosage_unit, a.waiting_period, a.max_applications,
               COALESCE(
                   array_agg(c.text ORDER BY c.text) FILTER (WHERE c.id IS NOT NULL),
                   '{}'
               ) AS conditions
        FROM approvals a
        LEFT JOIN approval_conditions ac ON ac.approval_id = a.id
        LEFT JOIN condition_meta c ON ac.condition_id = c.id
        WHERE a.crop_id = $1 AND a.product_id = $2 AND a.pest_id = $3
        GROUP BY a.id
        "#,
    )
    .bind(crop_id)
    .bind(product_id)
    .bind(pest_id)
    .fetch_all(pool)
    .await?;

    Ok(approvals)
}

/// Delete a product. Products referenced by treatment lines are protected
/// by the schema; the violation surfaces as [`BackendError::ProductInUse`].
#[tracing::instrument(skip(pool))]
pub async fn delete_product(pool: &PgPool, product_id: i64) -> Result<()> {
    let result = sqlx::query(r#"DELETE FROM products WHERE id = $1"#)
        .bind(product_id)
        .execute(pool)
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => {
            Err(BackendError::ProductNotFound(product_id))
        }
        Ok(_) => Ok(()),
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                // 23503: foreign_key_violation
                if db_err.code().as_deref() == Some("23503") {
                    return Err(BackendError::ProductInUse(product_id));
                }
            }
            Err(e.into())
        }
    }
}
