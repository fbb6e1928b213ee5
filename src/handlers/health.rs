use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::{db::DbPool, error::AppError};

// GET /health
pub async fn health_handler(State(pool): State<DbPool>) -> Result<impl IntoResponse, AppError> {
    let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()").fetch_one(&pool).await?;
    Ok(Json(json!({ "status": "ok", "db_time": now })))
}
