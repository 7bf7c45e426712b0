use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Draft,
    Finalized,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Advisor {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Farm {
    pub id: i64,
    pub advisor_id: i64,
    pub farm_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CropMeta {
    pub id: i64,
    pub blv_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PestMeta {
    pub id: i64,
    pub blv_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConditionMeta {
    pub id: i64,
    pub blv_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub registration_no: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Approval {
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
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Plan {
    pub id: i64,
    pub farm_id: i64,
    pub year: i32,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PlanCrop {
    pub id: i64,
    pub plan_id: i64,
    pub name: String,
    pub area_ha: f64,
    pub parcel: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Treatment {
    pub id: i64,
    pub plan_crop_id: i64,
    pub title: String,
    pub timing: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TreatmentProduct {
    pub id: i64,
    pub treatment_id: i64,
    pub product_id: i64,
    pub quantity: f64,
    pub unit: String,
}
