use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;

use crate::{db::DbPool, error::AppError, maintenance, models::user::Claims};

// POST /api/admin/limpiar-db (supremo)
pub async fn limpiar_db_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    tracing::warn!(por = %claims.sub, "Limpieza total solicitada");
    let resumen = maintenance::limpiar_db(&pool).await?;

    Ok(Json(json!({
        "ok": true,
        "mensaje": "Base de datos limpiada",
        "eliminados": resumen,
    })))
}
