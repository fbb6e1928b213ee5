use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use crate::{
    db::DbPool,
    error::{ApiJson, AppError},
    maintenance,
    models::user::{
        ChangePasswordPayload, Claims, CreateUserPayload, ResetPasswordPayload, Role, User,
    },
    utils::security::{hash_password, validate_new_password, verify_password},
};

async fn find_active_user(pool: &DbPool, phone: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1 AND active = TRUE")
        .bind(phone)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Usuario no encontrado"))
}

/// Vendedor activo, para asignar o transferir entradas.
pub(crate) async fn find_vendedor<'e, E>(executor: E, phone: &str) -> Result<User, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE phone = $1 AND role = $2 AND active = TRUE",
    )
    .bind(phone)
    .bind(Role::Vendedor.as_str())
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::not_found("Vendedor no encontrado"))
}

// GET /api/users/me
pub async fn me_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_active_user(&pool, &claims.sub).await?;
    Ok(Json(user))
}

// POST /api/users/change-password
pub async fn change_password_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<ChangePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_active_user(&pool, &claims.sub).await?;

    let current_ok = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&body.current_password, hash));
    if !current_ok {
        return Err(AppError::unauthorized("La contraseña actual no es correcta"));
    }
    validate_new_password(&body.new_password)?;

    let hashed = hash_password(&body.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE phone = $2")
        .bind(hashed)
        .bind(&user.phone)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "ok": true, "mensaje": "Contraseña actualizada" })))
}

// POST /api/users (admin)
pub async fn create_user_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<CreateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let phone = body.phone.trim();
    let name = body.name.trim();
    if phone.is_empty() || name.is_empty() {
        return Err(AppError::bad_request("phone, name y role son obligatorios"));
    }

    if !claims.role.can_create(body.role) {
        return Err(AppError::forbidden(format!(
            "Un usuario {} no puede crear usuarios {}",
            claims.role, body.role
        )));
    }

    // Sin contraseña el usuario la elige en su primer ingreso
    let hashed = match body.password.as_deref() {
        Some(password) => {
            validate_new_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (phone, name, role, password_hash)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(phone)
    .bind(name)
    .bind(body.role.as_str())
    .bind(hashed)
    .fetch_one(&pool)
    .await;

    match result {
        Ok(user) => {
            tracing::info!(phone = %user.phone, role = %user.role, creado_por = %claims.sub, "Usuario creado");
            Ok((StatusCode::CREATED, Json(user)))
        }
        Err(e) => match AppError::from(e) {
            AppError::Conflict(_) => Err(AppError::conflict("Ya existe un usuario con ese teléfono")),
            other => Err(other),
        },
    }
}

// GET /api/users (admin)
pub async fn list_users_handler(State(pool): State<DbPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE active = TRUE ORDER BY created_at",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}

// GET /api/users/vendedores
pub async fn list_vendedores_handler(
    State(pool): State<DbPool>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE role = $1 AND active = TRUE ORDER BY name",
    )
    .bind(Role::Vendedor.as_str())
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}

// DELETE /api/users/:phone (admin) - baja lógica
pub async fn deactivate_user_handler(
    Path(phone): Path<String>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let target = find_active_user(&pool, &phone).await?;

    if target.role == Role::Supremo {
        return Err(AppError::forbidden("El usuario supremo no se puede desactivar"));
    }
    if target.role == Role::Admin && claims.role != Role::Supremo {
        return Err(AppError::forbidden("Solo el supremo puede desactivar directores"));
    }

    sqlx::query("UPDATE users SET active = FALSE WHERE phone = $1")
        .bind(&target.phone)
        .execute(&pool)
        .await?;

    tracing::info!(phone = %target.phone, por = %claims.sub, "Usuario desactivado");
    Ok(Json(json!({ "ok": true, "mensaje": "Usuario desactivado" })))
}

// POST /api/users/:phone/reset-password (supremo)
pub async fn reset_password_handler(
    Path(phone): Path<String>,
    State(pool): State<DbPool>,
    ApiJson(body): ApiJson<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    maintenance::reset_password(&pool, phone.trim(), &body.new_password).await?;
    Ok(Json(json!({ "ok": true, "mensaje": "Contraseña reseteada" })))
}
