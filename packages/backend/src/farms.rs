//! Farm CRUD, scoped to the owning advisor.

use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{BackendError, Result};
use crate::models::Farm;

#[derive(Debug, Clone, Deserialize)]
pub struct FarmPayload {
    pub farm_name: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[tracing::instrument(skip(pool, payload))]
pub async fn create_farm(pool: &PgPool, advisor_id: i64, payload: &FarmPayload) -> Result<Farm> {
    let farm = sqlx::query_as::<_, Farm>(
        r#"
        INSERT INTO farms (advisor_id, farm_name, first_name, last_name, address, email, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(advisor_id)
    .bind(&payload.farm_name)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.address)
    .bind(&payload.email)
    .bind(&payload.phone)
    .fetch_one(pool)
    .await?;

    tracing::info!(farm_id = farm.id, "farm created");
    Ok(farm)
}

pub async fn list_farms(pool: &PgPool, advisor_id: i64) -> Result<Vec<Farm>> {
    let farms = sqlx::query_as::<_, Farm>(
        r#"SELECT * FROM farms WHERE advisor_id = $1 ORDER BY farm_name"#,
    )
    .bind(advisor_id)
    .fetch_all(pool)
    .await?;

    Ok(farms)
}

/// Get a farm by id. Farms owned by other advisors read as not found.
pub async fn get_farm(pool: &PgPool, advisor_id: i64, farm_id: i64) -> Result<Farm> {
    let farm = sqlx::query_as::<_, Farm>(
        r#"SELECT * FROM farms WHERE id = $1 AND advisor_id = $2"#,
    )
    .bind(farm_id)
    .bind(advisor_id)
    .fetch_optional(pool)
    .await?
    .ok_or(BackendError::FarmNotFound(farm_id))?;

    Ok(farm)
}

#[tracing::instrument(skip(pool, payload))]
pub async fn update_farm(
    pool: &PgPool,
    advisor_id: i64,
    farm_id: i64,
    payload: &FarmPayload,
) -> Result<Farm> {
    let farm = sqlx::query_as::<_, Farm>(
        r#"
        UPDATE farms
        SET farm_name = $3, first_name = $4, last_name = $5,
            address = $6, email = $7, phone = $8
        WHERE id = $1 AND advisor_id = $2
        RETURNING *
        "#,
    )
    .bind(farm_id)
    .bind(advisor_id)
    .bind(&payload.farm_name)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.address)
    .bind(&payload.email)
    .bind(&payload.phone)
    .fetch_optional(pool)
    .await?
    .ok_or(BackendError::FarmNotFound(farm_id))?;

    Ok(farm)
}

#[tracing::instrument(skip(pool))]
pub async fn delete_farm(pool: &PgPool, advisor_id: i64, farm_id: i64) -> Result<()> {
    let result = sqlx::query(r#"DELETE FROM farms WHERE id = $1 AND advisor_id = $2"#)
        .bind(farm_id)
        .bind(advisor_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BackendError::FarmNotFound(farm_id));
    }

    tracing::info!(farm_id, "farm deleted");
    Ok(())
}
