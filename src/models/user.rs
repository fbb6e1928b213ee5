use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Roles planos, sin composición de permisos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Supremo,
    Admin,
    Vendedor,
    Invitado,
}

#[derive(Debug, Error)]
#[error("rol desconocido: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Supremo => "supremo",
            Role::Admin => "admin",
            Role::Vendedor => "vendedor",
            Role::Invitado => "invitado",
        }
    }

    /// Admin o supremo.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Supremo | Role::Admin)
    }

    /// Qué roles puede dar de alta cada rol. Nadie crea supremos por la API.
    pub fn can_create(self, target: Role) -> bool {
        match (self, target) {
            (_, Role::Supremo) => false,
            (Role::Supremo, _) => true,
            (Role::Admin, Role::Vendedor | Role::Invitado) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supremo" | "super" => Ok(Role::Supremo),
            "admin" | "director" => Ok(Role::Admin),
            "vendedor" | "actor" => Ok(Role::Vendedor),
            "invitado" => Ok(Role::Invitado),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// Fila de la tabla users
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub phone: String,
    pub name: String,
    #[serde(skip)] // ¡Jamás envíes el hash de la contraseña en el JSON!
    pub password_hash: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub phone: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            phone: user.phone.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginPayload {
    pub phone: String,
    pub password: String,
}

// Primer login de un usuario creado sin contraseña
#[derive(Debug, Deserialize, Serialize)]
pub struct CompletarRegistroPayload {
    pub phone: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub user: UserSummary,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateUserPayload {
    pub phone: String,
    pub name: String,
    pub role: Role,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChangePasswordPayload {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResetPasswordPayload {
    pub new_password: String,
}

// Lo que viaja DENTRO del token (Claims)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // teléfono del usuario
    pub name: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}
