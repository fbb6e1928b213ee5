use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use sqlx::types::Json as SqlJson;

use crate::{
    db::DbPool,
    error::{ApiJson, AppError},
    models::{
        ensayo::{CreateEnsayoSchema, Ensayo, UpdateEnsayoSchema},
        user::{Claims, Role},
    },
};

fn puede_ver(ensayo: &Ensayo, claims: &Claims) -> bool {
    match claims.role {
        Role::Supremo => true,
        Role::Admin => ensayo.director_phone.as_deref() == Some(claims.sub.as_str()),
        Role::Vendedor | Role::Invitado => ensayo.incluye_actor(&claims.sub),
    }
}

fn puede_editar(ensayo: &Ensayo, claims: &Claims) -> bool {
    claims.role == Role::Supremo
        || ensayo.director_phone.as_deref() == Some(claims.sub.as_str())
}

async fn load_ensayo(pool: &DbPool, id: i64) -> Result<Ensayo, AppError> {
    sqlx::query_as::<_, Ensayo>("SELECT * FROM ensayos WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Ensayo no encontrado"))
}

fn limpiar_actores(actores: Vec<String>) -> Vec<String> {
    let mut limpios: Vec<String> = actores
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    limpios.sort();
    limpios.dedup();
    limpios
}

// GET /api/ensayos
pub async fn list_ensayos_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let ensayos = match claims.role {
        Role::Supremo => {
            sqlx::query_as::<_, Ensayo>("SELECT * FROM ensayos ORDER BY fecha")
                .fetch_all(&pool)
                .await?
        }
        Role::Admin => {
            sqlx::query_as::<_, Ensayo>(
                "SELECT * FROM ensayos WHERE director_phone = $1 ORDER BY fecha",
            )
            .bind(&claims.sub)
            .fetch_all(&pool)
            .await?
        }
        Role::Vendedor | Role::Invitado => {
            // actores es un arreglo JSON de teléfonos
            sqlx::query_as::<_, Ensayo>(
                "SELECT * FROM ensayos WHERE actores ? $1 ORDER BY fecha",
            )
            .bind(&claims.sub)
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(Json(ensayos))
}

// GET /api/ensayos/:id
pub async fn get_ensayo_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let ensayo = load_ensayo(&pool, id).await?;
    if !puede_ver(&ensayo, &claims) {
        return Err(AppError::forbidden("No tenés acceso a este ensayo"));
    }
    Ok(Json(ensayo))
}

// POST /api/ensayos (admin)
pub async fn create_ensayo_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<CreateEnsayoSchema>,
) -> Result<impl IntoResponse, AppError> {
    let titulo = body.titulo.trim();
    let lugar = body.lugar.trim();
    if titulo.is_empty() || lugar.is_empty() {
        return Err(AppError::bad_request("titulo, fecha y lugar son obligatorios"));
    }

    let ensayo = sqlx::query_as::<_, Ensayo>(
        r#"
        INSERT INTO ensayos (titulo, fecha, lugar, descripcion, director_phone, actores)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(titulo)
    .bind(body.fecha)
    .bind(lugar)
    .bind(body.descripcion.as_deref())
    .bind(&claims.sub)
    .bind(SqlJson(limpiar_actores(body.actores)))
    .fetch_one(&pool)
    .await?;

    tracing::info!(id = ensayo.id, director = %claims.sub, "Ensayo creado");
    Ok((StatusCode::CREATED, Json(ensayo)))
}

// PUT /api/ensayos/:id (admin, solo el director que lo creó o el supremo)
pub async fn update_ensayo_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<UpdateEnsayoSchema>,
) -> Result<impl IntoResponse, AppError> {
    let ensayo = load_ensayo(&pool, id).await?;
    if !puede_editar(&ensayo, &claims) {
        return Err(AppError::forbidden("Solo el director del ensayo puede modificarlo"));
    }

    let actores = body.actores.map(|a| SqlJson(limpiar_actores(a)));

    let ensayo = sqlx::query_as::<_, Ensayo>(
        r#"
        UPDATE ensayos SET
            titulo = COALESCE($1, titulo),
            fecha = COALESCE($2, fecha),
            lugar = COALESCE($3, lugar),
            descripcion = COALESCE($4, descripcion),
            actores = COALESCE($5, actores),
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(body.titulo.as_deref().map(str::trim))
    .bind(body.fecha)
    .bind(body.lugar.as_deref().map(str::trim))
    .bind(body.descripcion.as_deref())
    .bind(actores)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::not_found("Ensayo no encontrado"))?;

    Ok(Json(ensayo))
}

// DELETE /api/ensayos/:id (admin, solo el director que lo creó o el supremo)
pub async fn delete_ensayo_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let ensayo = load_ensayo(&pool, id).await?;
    if !puede_editar(&ensayo, &claims) {
        return Err(AppError::forbidden("Solo el director del ensayo puede eliminarlo"));
    }

    sqlx::query("DELETE FROM ensayos WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    tracing::info!(id, por = %claims.sub, "Ensayo eliminado");
    Ok(Json(json!({ "ok": true, "mensaje": "Ensayo eliminado" })))
}
