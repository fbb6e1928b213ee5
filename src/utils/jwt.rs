use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, authorization::Bearer};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    config::Config,
    error::AppError,
    models::user::{Claims, Role, User},
};

pub fn issue_token(config: &Config, user: &User) -> Result<String, AppError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::days(config.jwt_expiration_days))
        .ok_or_else(|| AppError::internal("Fecha de expiración inválida"))?;

    let claims = Claims {
        sub: user.phone.clone(),
        name: user.name.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("Error generando token: {e}")))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    // Token falso, expirado o manipulado
    .map_err(|_| AppError::unauthorized("Token inválido o expirado"))
}

fn claims_from_header(
    config: &Config,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Claims, AppError> {
    let TypedHeader(auth) = auth.ok_or_else(|| AppError::unauthorized("Token requerido"))?;
    decode_token(&config.jwt_secret, auth.token())
}

pub fn require_role(claims: &Claims, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(AppError::forbidden("No tienes permisos para esta acción"))
    }
}

// Cualquier usuario con token válido
pub async fn auth_middleware(
    State(config): State<Arc<Config>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_header(&config, auth)?;
    // Adjuntamos claims para que los handlers sepan quién es el usuario
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

// Admin o supremo
pub async fn admin_middleware(
    State(config): State<Arc<Config>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_header(&config, auth)?;
    require_role(&claims, &[Role::Admin, Role::Supremo])?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

pub async fn supremo_middleware(
    State(config): State<Arc<Config>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_header(&config, auth)?;
    require_role(&claims, &[Role::Supremo])?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
