//! Plan tree storage: create, full-replacement update, retrieval, delete.
//!
//! A plan owns its crops, each crop its treatments, each treatment its
//! product lines. Create and update materialize the whole tree in one
//! transaction; update deletes the existing crops first and rebuilds from
//! the payload, so omitted crops are destroyed by design.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::error::{BackendError, Result};
use crate::farms;
use crate::models::{Plan, PlanCrop, PlanStatus, Treatment};

#[derive(Debug, Clone, Deserialize)]
pub struct PlanPayload {
    pub farm_id: i64,
    pub year: i32,
    pub status: Option<PlanStatus>,
    #[serde(default)]
    pub crops: Vec<PlanCropPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanUpdatePayload {
    pub year: Option<i32>,
    pub status: Option<PlanStatus>,
    #[serde(default)]
    pub crops: Vec<PlanCropPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanCropPayload {
    /// Row id of the crop metadata; the display name is snapshotted from it.
    pub meta_id: i64,
    #[serde(default)]
    pub area_ha: f64,
    pub parcel: Option<String>,
    #[serde(default)]
    pub treatments: Vec<TreatmentPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentPayload {
    pub title: String,
    pub timing: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub products: Vec<TreatmentProductPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentProductPayload {
    pub product_id: i64,
    #[serde(default)]
    pub quantity: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanTree {
    #[serde(flatten)]
    pub plan: Plan,
    pub crops: Vec<PlanCropTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanCropTree {
    #[serde(flatten)]
    pub crop: PlanCrop,
    pub treatments: Vec<TreatmentTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreatmentTree {
    #[serde(flatten)]
    pub treatment: Treatment,
    pub products: Vec<TreatmentProductLine>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TreatmentProductLine {
    pub id: i64,
    #[serde(skip_serializing)]
    pub treatment_id: i64,
    pub product_id: i64,
    pub registration_no: String,
    pub product_name: String,
    pub quantity: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlanSummary {
    pub id: i64,
    pub farm_id: i64,
    pub farm_name: String,
    pub year: i32,
    pub status: PlanStatus,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Create a plan and its full tree.
///
/// Farm ownership is checked before anything is written; an unowned or
/// unknown farm is an authorization failure, not a plain not-found.
#[tracing::instrument(skip(pool, payload), fields(farm_id = payload.farm_id))]
pub async fn create_plan(pool: &PgPool, advisor_id: i64, payload: &PlanPayload) -> Result<PlanTree> {
    validate_year(payload.year)?;
    let farm = farms::get_farm(pool, advisor_id, payload.farm_id)
        .await
        .map_err(|e| match e {
            BackendError::FarmNotFound(id) => BackendError::FarmNotOwned(id),
            other => other,
        })?;

    let mut tx = pool.begin().await?;

    let plan = sqlx::query_as::<_, Plan>(
        r#"
        INSERT INTO plans (farm_id, year, status)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(farm.id)
    .bind(payload.year)
    .bind(payload.status.unwrap_or(PlanStatus::Draft))
    .fetch_one(&mut *tx)
    .await?;

    insert_tree(&mut *tx, plan.id, &payload.crops).await?;

    tx.commit().await?;

    tracing::info!(plan_id = plan.id, "plan created");
    get_plan(pool, advisor_id, plan.id).await
}

/// Replace a plan's tree with the payload.
///
/// Year and status fall back to the stored values when omitted. The crop
/// list is authoritative: existing crops are deleted (cascading their
/// treatments and product lines) and the tree is rebuilt from scratch.
#[tracing::instrument(skip(pool, payload))]
pub async fn update_plan(
    pool: &PgPool,
    advisor_id: i64,
    plan_id: i64,
    payload: &PlanUpdatePayload,
) -> Result<PlanTree> {
    if let Some(year) = payload.year {
        validate_year(year)?;
    }
    let plan = get_owned_plan(pool, advisor_id, plan_id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE plans
        SET year = $2, status = $3, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(plan.id)
    .bind(payload.year.unwrap_or(plan.year))
    .bind(payload.status.unwrap_or(plan.status))
    .execute(&mut *tx)
    .await?;

    sqlx::query(r#"DELETE FROM plan_crops WHERE plan_id = $1"#)
        .bind(plan.id)
        .execute(&mut *tx)
        .await?;

    insert_tree(&mut *tx, plan.id, &payload.crops).await?;

    tx.commit().await?;

    tracing::info!(plan_id, "plan replaced");
    get_plan(pool, advisor_id, plan_id).await
}

/// Get a plan with its full tree. Plans under other advisors' farms read
/// as not found.
pub async fn get_plan(pool: &PgPool, advisor_id: i64, plan_id: i64) -> Result<PlanTree> {
    let plan = get_owned_plan(pool, advisor_id, plan_id).await?;
    fetch_tree(pool, plan).await
}

/// List the advisor's plans across all their farms.
pub async fn list_plans(pool: &PgPool, advisor_id: i64) -> Result<Vec<PlanSummary>> {
    let plans = sqlx::query_as::<_, PlanSummary>(
        r#"
        SELECT p.id, p.farm_id, f.farm_name, p.year, p.status, p.updated_at
        FROM plans p
        JOIN farms f ON p.farm_id = f.id
        WHERE f.advisor_id = $1
        ORDER BY p.year DESC, f.farm_name
        "#,
    )
    .bind(advisor_id)
    .fetch_all(pool)
    .await?;

    Ok(plans)
}

/// Delete a plan; the schema cascades through crops, treatments and
/// product lines.
#[tracing::instrument(skip(pool))]
pub async fn delete_plan(pool: &PgPool, advisor_id: i64, plan_id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM plans p
        USING farms f
        WHERE p.id = $1 AND p.farm_id = f.id AND f.advisor_id = $2
        "#,
    )
    .bind(plan_id)
    .bind(advisor_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BackendError::PlanNotFound(plan_id));
    }

    tracing::info!(plan_id, "plan deleted");
    Ok(())
}

fn validate_year(year: i32) -> Result<()> {
    if year <= 0 {
        return Err(BackendError::InvalidInput(
            "plan year must be positive".to_string(),
        ));
    }
    Ok(())
}

async fn get_owned_plan(pool: &PgPool, advisor_id: i64, plan_id: i64) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        r#"
        SELECT p.*
        FROM plans p
        JOIN farms f ON p.farm_id = f.id
        WHERE p.id = $1 AND f.advisor_id = $2
        "#,
    )
    .bind(plan_id)
    .bind(advisor_id)
    .fetch_optional(pool)
    .await?
    .ok_or(BackendError::PlanNotFound(plan_id))?;

    Ok(plan)
}

/// Depth-first insert of the crop/treatment/product tree under a plan.
///
/// Unknown crop metadata ids are skipped (the same best-effort policy as
/// the importer); unknown product ids abort the whole operation, since a
/// treatment line without a product is meaningless.
async fn insert_tree(
    conn: &mut PgConnection,
    plan_id: i64,
    crops: &[PlanCropPayload],
) -> Result<()> {
    for crop in crops {
        let name: Option<String> =
            sqlx::query_scalar(r#"SELECT name FROM crop_meta WHERE id = $1"#)
                .bind(crop.meta_id)
                .fetch_optional(&mut *conn)
                .await?;
        let Some(name) = name else {
            tracing::warn!(meta_id = crop.meta_id, "unknown crop metadata id, skipping crop");
            continue;
        };

        let plan_crop_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO plan_crops (plan_id, name, area_ha, parcel)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(plan_id)
        .bind(&name)
        .bind(crop.area_ha)
        .bind(crop.parcel.as_deref().unwrap_or(""))
        .fetch_one(&mut *conn)
        .await?;

        for treatment in &crop.treatments {
            let treatment_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO treatments (plan_crop_id, title, timing, notes)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(plan_crop_id)
            .bind(&treatment.title)
            .bind(treatment.timing.as_deref().unwrap_or(""))
            .bind(treatment.notes.as_deref().unwrap_or(""))
            .fetch_one(&mut *conn)
            .await?;

            for line in &treatment.products {
                let product: Option<i64> =
                    sqlx::query_scalar(r#"SELECT id FROM products WHERE id = $1"#)
                        .bind(line.product_id)
                        .fetch_optional(&mut *conn)
                        .await?;
                if product.is_none() {
                    return Err(BackendError::ProductNotFound(line.product_id));
                }

                sqlx::query(
                    r#"
                    INSERT INTO treatment_products (treatment_id, product_id, quantity, unit)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(treatment_id)
                .bind(line.product_id)
                .bind(line.quantity)
                .bind(line.unit.as_deref().unwrap_or("l/ha"))
                .execute(&mut *conn)
                .await?;
            }
        }
    }
    Ok(())
}

/// Assemble the nested tree for one plan.
async fn fetch_tree(pool: &PgPool, plan: Plan) -> Result<PlanTree> {
    let crops = sqlx::query_as::<_, PlanCrop>(
        r#"SELECT * FROM plan_crops WHERE plan_id = $1 ORDER BY id"#,
    )
    .bind(plan.id)
    .fetch_all(pool)
    .await?;

    let treatments = sqlx::query_as::<_, Treatment>(
        r#"
        SELECT t.*
        FROM treatments t
        JOIN plan_crops pc ON t.plan_crop_id = pc.id
        WHERE pc.plan_id = $1
        ORDER BY t.id
        "#,
    )
    .bind(plan.id)
    .fetch_all(pool)
    .await?;

    let lines = sqlx::query_as::<_, TreatmentProductLine>(
        r#"
        SELECT tp.id, tp.treatment_id, tp.product_id, p.registration_no,
               p.name AS product_name, tp.quantity, tp.unit
        FROM treatment_products tp
        JOIN products p ON tp.product_id = p.id
        JOIN treatments t ON tp.treatment_id = t.id
        JOIN plan_crops pc ON t.plan_crop_id = pc.id
        WHERE pc.plan_id = $1
        ORDER BY tp.id
        "#,
    )
    .bind(plan.id)
    .fetch_all(pool)
    .await?;

    let mut lines_by_treatment: HashMap<i64, Vec<TreatmentProductLine>> = HashMap::new();
    for line in lines {
        lines_by_treatment
            .entry(line.treatment_id)
            .or_default()
            .push(line);
    }

    let mut treatments_by_crop: HashMap<i64, Vec<TreatmentTree>> = HashMap::new();
    for treatment in treatments {
        let products = lines_by_treatment
            .remove(&treatment.id)
            .unwrap_or_default();
        treatments_by_crop
            .entry(treatment.plan_crop_id)
            .or_default()
            .push(TreatmentTree {
                treatment,
                products,
            });
    }

    let crops = crops
        .into_iter()
        .map(|crop| {
            let treatments = treatments_by_crop.remove(&crop.id).unwrap_or_default();
            PlanCropTree { crop, treatments }
        })
        .collect();

    Ok(PlanTree { plan, crops })
}
