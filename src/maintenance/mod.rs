//! Tareas de mantenimiento de la base.
//!
//! Las usan tanto el binario `teatro-admin` como el endpoint
//! `POST /api/admin/limpiar-db`.

use serde::Serialize;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{Role, User, UserSummary},
    utils::security::{hash_password, validate_new_password},
};

#[derive(Debug, Serialize)]
pub struct LimpiezaResumen {
    pub reportes: u64,
    pub ensayos: u64,
    pub tickets: u64,
    pub shows: u64,
    pub usuarios: u64,
    pub usuarios_restantes: Vec<UserSummary>,
}

/// Función cuyo contador no coincidía con sus tickets.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ConteoCorregido {
    pub show_id: i64,
    pub obra: String,
    pub antes: i32,
    pub despues: i32,
    pub capacidad: i32,
}

/// Borra todo salvo los usuarios supremo.
pub async fn limpiar_db(pool: &DbPool) -> Result<LimpiezaResumen, AppError> {
    let mut tx = pool.begin().await?;

    let reportes = sqlx::query("DELETE FROM reportes").execute(&mut *tx).await?.rows_affected();
    let ensayos = sqlx::query("DELETE FROM ensayos").execute(&mut *tx).await?.rows_affected();
    let tickets = sqlx::query("DELETE FROM tickets").execute(&mut *tx).await?.rows_affected();
    let shows = sqlx::query("DELETE FROM shows").execute(&mut *tx).await?.rows_affected();
    let usuarios = sqlx::query("DELETE FROM users WHERE role <> $1")
        .bind(Role::Supremo.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let restantes = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY phone")
        .fetch_all(&mut *tx)
        .await?;

    let resumen = LimpiezaResumen {
        reportes,
        ensayos,
        tickets,
        shows,
        usuarios,
        usuarios_restantes: restantes.iter().map(UserSummary::from).collect(),
    };

    tx.commit().await?;

    tracing::warn!(
        tickets = resumen.tickets,
        shows = resumen.shows,
        usuarios = resumen.usuarios,
        "Base de datos limpiada"
    );
    Ok(resumen)
}

/// Borra las funciones con fecha anterior a hoy. Sus tickets caen en cascada.
pub async fn purgar_funciones_pasadas(pool: &DbPool) -> Result<u64, AppError> {
    let borradas = sqlx::query("DELETE FROM shows WHERE fecha < date_trunc('day', NOW())")
        .execute(pool)
        .await?
        .rows_affected();

    tracing::info!(borradas, "Funciones pasadas eliminadas");
    Ok(borradas)
}

pub async fn reset_password(pool: &DbPool, phone: &str, new_password: &str) -> Result<(), AppError> {
    validate_new_password(new_password)?;
    let hashed = hash_password(new_password)?;

    let updated = sqlx::query("UPDATE users SET password_hash = $1 WHERE phone = $2")
        .bind(hashed)
        .bind(phone)
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::not_found("Usuario no encontrado"));
    }

    tracing::warn!(%phone, "Contraseña reseteada");
    Ok(())
}

/// Crea el usuario supremo si todavía no existe. Devuelve `true` si lo creó.
pub async fn asegurar_supremo(
    pool: &DbPool,
    phone: &str,
    name: &str,
    password: &str,
) -> Result<bool, AppError> {
    validate_new_password(password)?;
    let hashed = hash_password(password)?;

    let creado = sqlx::query(
        "INSERT INTO users (phone, name, role, password_hash)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (phone) DO NOTHING",
    )
    .bind(phone)
    .bind(name)
    .bind(Role::Supremo.as_str())
    .bind(hashed)
    .execute(pool)
    .await?
    .rows_affected()
        > 0;

    if creado {
        tracing::info!(%phone, "Usuario supremo creado");
    } else {
        tracing::info!(%phone, "El usuario ya existía, no se modificó");
    }
    Ok(creado)
}

/// Recalcula `entradas_vendidas` a partir de las filas de tickets.
/// Si hay más tickets que capacidad, la capacidad sube hasta el conteo real.
pub async fn reconciliar_conteos(pool: &DbPool) -> Result<Vec<ConteoCorregido>, AppError> {
    let corregidos = sqlx::query_as::<_, ConteoCorregido>(
        r#"
        WITH reales AS (
            SELECT s.id, s.entradas_vendidas AS antes, COUNT(t.code)::INT AS despues
            FROM shows s
            LEFT JOIN tickets t ON t.show_id = s.id
            GROUP BY s.id
        )
        UPDATE shows s
        SET entradas_vendidas = r.despues,
            capacidad = GREATEST(s.capacidad, r.despues)
        FROM reales r
        WHERE s.id = r.id AND r.antes <> r.despues
        RETURNING s.id AS show_id, s.obra, r.antes, r.despues, s.capacidad
        "#,
    )
    .fetch_all(pool)
    .await?;

    for c in &corregidos {
        tracing::warn!(
            show_id = c.show_id,
            antes = c.antes,
            despues = c.despues,
            capacidad = c.capacidad,
            "Contador corregido"
        );
    }
    Ok(corregidos)
}
