//! Transactional replacement of the registry tables from a parsed feed.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use feldplan_importer::types::{MetaEntry, ParsedRegistry};

use crate::error::Result;

/// Counts reported after a successful import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub crops: usize,
    pub pests: usize,
    pub conditions: usize,
    pub products: usize,
    pub approvals: usize,
    /// Indications dropped because their crop or pest metadata was missing.
    pub skipped_indications: usize,
}

const INSERT_CROP: &str =
    "INSERT INTO crop_meta (blv_id, name) VALUES ($1, $2) ON CONFLICT (blv_id) DO NOTHING RETURNING id";
const INSERT_PEST: &str =
    "INSERT INTO pest_meta (blv_id, name) VALUES ($1, $2) ON CONFLICT (blv_id) DO NOTHING RETURNING id";
const INSERT_CONDITION: &str =
    "INSERT INTO condition_meta (blv_id, text) VALUES ($1, $2) ON CONFLICT (blv_id) DO NOTHING RETURNING id";

/// Replace the registry tables with the parsed feed.
///
/// Runs in a single transaction: metadata and approvals are deleted and
/// rebuilt, products are upserted by registration number (they may be
/// referenced by treatment lines and are never deleted). Readers keep the
/// previous registry until commit, so a mid-import failure leaves the old
/// data fully intact.
///
/// Not safe against a concurrent import of itself; the import binary is an
/// offline batch job.
#[tracing::instrument(skip(pool, parsed))]
pub async fn replace_registry(pool: &PgPool, parsed: &ParsedRegistry) -> Result<ImportStats> {
    let mut tx = pool.begin().await?;

    // Approvals reference the metadata tables, so they go first.
    sqlx::query("DELETE FROM approval_conditions")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM approvals").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM crop_meta").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM pest_meta").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM condition_meta")
        .execute(&mut *tx)
        .await?;

    let crop_ids = insert_meta(&mut *tx, INSERT_CROP, &parsed.crops).await?;
    let pest_ids = insert_meta(&mut *tx, INSERT_PEST, &parsed.pests).await?;
    let condition_ids = insert_meta(&mut *tx, INSERT_CONDITION, &parsed.conditions).await?;

    let mut approvals = 0usize;
    let mut skipped_indications = 0usize;

    for product in &parsed.products {
        let product_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (registration_no, name)
            VALUES ($1, $2)
            ON CONFLICT (registration_no) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(&product.registration_no)
        .bind(&product.name)
        .fetch_one(&mut *tx)
        .await?;

        for indication in &product.indications {
            let Some(&crop_id) = crop_ids.get(indication.crop_id.as_str()) else {
                skipped_indications += 1;
                continue;
            };
            let Some(&pest_id) = pest_ids.get(indication.pest_id.as_str()) else {
                skipped_indications += 1;
                continue;
            };

            // First writer wins: a repeated (product, crop, pest) triple in
            // the feed keeps the attributes of the first occurrence.
            let inserted: Option<i64> = sqlx::query_scalar(
                r#"
                INSERT INTO approvals
                    (product_id, crop_id, pest_id, dosage, dosage_from, dosage_to,
                     dosage_unit, waiting_period, max_applications)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (product_id, crop_id, pest_id) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(product_id)
            .bind(crop_id)
            .bind(pest_id)
            .bind(&indication.dosage)
            .bind(&indication.dosage_from)
            .bind(&indication.dosage_to)
            .bind(&indication.dosage_unit)
            .bind(&indication.waiting_period)
            .bind(&indication.max_applications)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(approval_id) = inserted else {
                continue;
            };
            approvals += 1;

            for condition in &indication.condition_ids {
                let Some(&condition_id) = condition_ids.get(condition.as_str()) else {
                    continue;
                };
                sqlx::query(
                    r#"
                    INSERT INTO approval_conditions (approval_id, condition_id)
                    VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(approval_id)
                .bind(condition_id)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;

    let stats = ImportStats {
        crops: crop_ids.len(),
        pests: pest_ids.len(),
        conditions: condition_ids.len(),
        products: parsed.products.len(),
        approvals,
        skipped_indications,
    };

    tracing::info!(
        crops = stats.crops,
        pests = stats.pests,
        conditions = stats.conditions,
        products = stats.products,
        approvals = stats.approvals,
        skipped = stats.skipped_indications,
        "registry replaced"
    );

    Ok(stats)
}

/// Insert one metadata category and return the external-id to row-id map.
/// Duplicate external ids in the feed keep the first entry.
async fn insert_meta(
    conn: &mut PgConnection,
    query: &str,
    entries: &[MetaEntry],
) -> Result<HashMap<String, i64>> {
    let mut ids = HashMap::with_capacity(entries.len());
    for entry in entries {
        if ids.contains_key(entry.blv_id.as_str()) {
            continue;
        }
        if let Some(id) = sqlx::query_scalar::<_, i64>(query)
            .bind(&entry.blv_id)
            .bind(&entry.name)
            .fetch_optional(&mut *conn)
            .await?
        {
            ids.insert(entry.blv_id.clone(), id);
        }
    }
    Ok(ids)
}
