use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    db::AppState,
    error::{ApiJson, AppError},
    models::user::{AuthResponse, Claims, CompletarRegistroPayload, LoginPayload, User, UserSummary},
    utils::{
        jwt::issue_token,
        security::{hash_password, validate_new_password, verify_password},
    },
};

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        token: issue_token(&state.config, user)?,
        token_type: "Bearer".to_string(),
        user: UserSummary::from(user),
    })
}

// POST /api/auth/login
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> Result<Response, AppError> {
    let phone = payload.phone.trim();
    if phone.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("phone y password son obligatorios"));
    }

    // 1. Buscar usuario activo por teléfono
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1 AND active = TRUE")
        .bind(phone)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::unauthorized("Credenciales inválidas"))?;

    // Usuario creado por un admin que todavía no eligió contraseña
    let Some(password_hash) = user.password_hash.as_deref() else {
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Debe completar registro",
                "requires_setup": true,
                "phone": user.phone,
            })),
        )
            .into_response());
    };

    // 2. Verificar contraseña (Argon2)
    if !verify_password(&payload.password, password_hash) {
        return Err(AppError::unauthorized("Credenciales inválidas"));
    }

    // 3. Generar JWT
    let response = auth_response(&state, &user)?;
    tracing::info!(phone = %user.phone, role = %user.role, "Login exitoso");

    Ok((StatusCode::OK, Json(response)).into_response())
}

// POST /api/auth/completar-registro
pub async fn completar_registro_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CompletarRegistroPayload>,
) -> Result<impl IntoResponse, AppError> {
    let phone = payload.phone.trim();
    let name = payload.name.trim();
    if phone.is_empty() || name.is_empty() {
        return Err(AppError::bad_request("phone, name y password son obligatorios"));
    }
    validate_new_password(&payload.password)?;

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1 AND active = TRUE")
        .bind(phone)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Usuario no encontrado"))?;

    if existing.password_hash.is_some() {
        return Err(AppError::bad_request("Usuario ya completó registro"));
    }

    let hashed = hash_password(&payload.password)?;

    // El filtro por password_hash IS NULL evita pisar un registro concurrente
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET name = $1, password_hash = $2
         WHERE phone = $3 AND password_hash IS NULL
         RETURNING *",
    )
    .bind(name)
    .bind(hashed)
    .bind(phone)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::bad_request("Usuario ya completó registro"))?;

    tracing::info!(phone = %user.phone, "Registro completado");
    Ok((StatusCode::OK, Json(auth_response(&state, &user)?)))
}

// GET /api/auth/verificar
pub async fn verificar_handler(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    Json(json!({ "ok": true, "user": claims }))
}
