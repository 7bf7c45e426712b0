//! Bearer-token authentication.
//!
//! Tokens are provisioned out of band (one per advisor row); this module
//! only validates them. Handlers read the resolved advisor from request
//! extensions.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::Advisor;
use crate::state::AppState;

/// The authenticated advisor for the current request.
#[derive(Debug, Clone)]
pub struct CurrentAdvisor {
    pub id: i64,
    pub username: String,
}

/// Resolve a bearer token to its advisor, if any.
pub async fn authenticate(pool: &PgPool, token: &str) -> Result<Option<CurrentAdvisor>> {
    let advisor = sqlx::query_as::<_, Advisor>(
        r#"SELECT * FROM advisors WHERE api_token = $1"#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(advisor.map(|a| CurrentAdvisor {
        id: a.id,
        username: a.username,
    }))
}

/// Create an advisor with a fixed token. Used by provisioning scripts and
/// the integration tests.
pub async fn create_advisor(pool: &PgPool, username: &str, api_token: &str) -> Result<Advisor> {
    let advisor = sqlx::query_as::<_, Advisor>(
        r#"
        INSERT INTO advisors (username, api_token)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(api_token)
    .fetch_one(pool)
    .await?;

    Ok(advisor)
}

/// Require a valid bearer token; injects [`CurrentAdvisor`] on success.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match authenticate(&state.pool, token).await {
        Ok(Some(advisor)) => {
            request.extensions_mut().insert(advisor);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!(error = %e, "token lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
