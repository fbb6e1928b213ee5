use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::types::Json as SqlJson;

use crate::{
    db::DbPool,
    error::AppError,
    handlers::show::load_show,
    models::{
        reporte::{Deudores, Reporte, ResumenFuncion, ResumenVendedor},
        ticket::{StateCounts, TicketState},
        user::{Claims, Role},
    },
};

async fn resumen_por_vendedor<'e, E>(executor: E, show_id: i64) -> Result<Vec<ResumenVendedor>, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let filas = sqlx::query_as::<_, ResumenVendedor>(
        r#"
        SELECT
            u.phone AS vendedor_phone,
            u.name AS vendedor_nombre,
            COUNT(*) FILTER (WHERE t.estado = $2) AS en_stock,
            COUNT(*) FILTER (WHERE t.estado = $3) AS reservadas,
            COUNT(*) FILTER (WHERE t.estado = $4) AS reportadas_vendidas,
            COUNT(*) FILTER (WHERE t.estado = $5) AS pagadas,
            COUNT(*) FILTER (WHERE t.estado = $6) AS usadas,
            COALESCE(SUM(t.precio) FILTER (WHERE t.estado = $4), 0) AS monto_debe,
            COALESCE(SUM(t.precio) FILTER (WHERE t.estado IN ($5, $6)), 0) AS monto_pagado
        FROM tickets t
        JOIN users u ON u.phone = t.vendedor_phone
        WHERE t.show_id = $1
        GROUP BY u.phone, u.name
        ORDER BY u.name
        "#,
    )
    .bind(show_id)
    .bind(TicketState::StockVendedor.as_str())
    .bind(TicketState::Reservado.as_str())
    .bind(TicketState::ReportadaVendida.as_str())
    .bind(TicketState::Pagado.as_str())
    .bind(TicketState::Usado.as_str())
    .fetch_all(executor)
    .await?;

    Ok(filas)
}

async fn conteos_por_estado<'e, E>(executor: E, show_id: i64) -> Result<(StateCounts, Decimal), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let filas: Vec<(String, i64, Decimal)> = sqlx::query_as(
        r#"
        SELECT estado, COUNT(*), COALESCE(SUM(precio), 0)
        FROM tickets
        WHERE show_id = $1
        GROUP BY estado
        "#,
    )
    .bind(show_id)
    .fetch_all(executor)
    .await?;

    let mut conteos = StateCounts::default();
    let mut monto_total = Decimal::ZERO;
    for (estado, n, monto) in filas {
        let estado: TicketState = estado
            .parse()
            .map_err(|e| AppError::internal(format!("Estado de ticket inválido en la base: {e}")))?;
        conteos.add(estado, n);
        if estado.is_sold() {
            monto_total += monto;
        }
    }
    Ok((conteos, monto_total))
}

fn deudores(show_id: i64, vendedores: Vec<ResumenVendedor>) -> Deudores {
    let vendedores_deudores: Vec<ResumenVendedor> = vendedores
        .into_iter()
        .filter(|v| v.monto_debe > Decimal::ZERO)
        .collect();
    let total_deuda = vendedores_deudores.iter().map(|v| v.monto_debe).sum();

    Deudores {
        show_id,
        total_deuda,
        vendedores_deudores,
    }
}

// GET /api/shows/:id/resumen (admin)
pub async fn resumen_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
) -> Result<impl IntoResponse, AppError> {
    let show = load_show(&pool, id).await?;
    let (conteos, monto_total) = conteos_por_estado(&pool, id).await?;

    Ok(Json(ResumenFuncion {
        show,
        conteos,
        monto_total,
    }))
}

// GET /api/shows/:id/resumen-por-vendedor (admin)
pub async fn resumen_por_vendedor_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
) -> Result<impl IntoResponse, AppError> {
    load_show(&pool, id).await?;
    let vendedores = resumen_por_vendedor(&pool, id).await?;
    Ok(Json(vendedores))
}

// GET /api/shows/:id/deudores (admin)
pub async fn deudores_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
) -> Result<impl IntoResponse, AppError> {
    load_show(&pool, id).await?;
    let vendedores = resumen_por_vendedor(&pool, id).await?;
    Ok(Json(deudores(id, vendedores)))
}

// POST /api/reportes-obras/generar/:show_id (admin)
pub async fn generar_reporte_handler(
    Path(show_id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    // Una sola transacción para que conteos y desglose sean coherentes
    let mut tx = pool.begin().await?;

    let show = load_show(&mut *tx, show_id).await?;
    let (conteos, ingresos) = conteos_por_estado(&mut *tx, show_id).await?;
    let vendedores = resumen_por_vendedor(&mut *tx, show_id).await?;

    let total = conteos.disponibles
        + conteos.en_stock
        + conteos.reservadas
        + conteos.reportadas_vendidas
        + conteos.pagadas
        + conteos.usadas;
    let vendidos = conteos.reservadas + conteos.reportadas_vendidas + conteos.pagadas + conteos.usadas;

    let reporte = sqlx::query_as::<_, Reporte>(
        r#"
        INSERT INTO reportes (
            show_id, nombre_obra, fecha_show, generado_por,
            total_tickets, tickets_vendidos, tickets_usados,
            ingresos_totales, datos_vendedores
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(show.id)
    .bind(&show.obra)
    .bind(show.fecha)
    .bind(&claims.sub)
    .bind(total)
    .bind(vendidos)
    .bind(conteos.usadas)
    .bind(ingresos)
    .bind(SqlJson(vendedores))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(reporte = reporte.id, show_id, por = %claims.sub, "Reporte generado");
    Ok((StatusCode::CREATED, Json(reporte)))
}

// GET /api/reportes-obras (admin) - el supremo ve todos
pub async fn list_reportes_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let autor = (claims.role != Role::Supremo).then_some(claims.sub.as_str());

    let reportes = sqlx::query_as::<_, Reporte>(
        r#"
        SELECT * FROM reportes
        WHERE ($1::text IS NULL OR generado_por = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(autor)
    .fetch_all(&pool)
    .await?;

    Ok(Json(reportes))
}

async fn load_reporte(pool: &DbPool, id: i64, claims: &Claims) -> Result<Reporte, AppError> {
    let reporte = sqlx::query_as::<_, Reporte>("SELECT * FROM reportes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Reporte no encontrado"))?;

    if claims.role != Role::Supremo && reporte.generado_por.as_deref() != Some(claims.sub.as_str()) {
        return Err(AppError::forbidden("No tenés acceso a este reporte"));
    }
    Ok(reporte)
}

// GET /api/reportes-obras/:id (admin)
pub async fn get_reporte_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let reporte = load_reporte(&pool, id, &claims).await?;
    Ok(Json(reporte))
}

// DELETE /api/reportes-obras/:id (admin)
pub async fn delete_reporte_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let reporte = load_reporte(&pool, id, &claims).await?;

    sqlx::query("DELETE FROM reportes WHERE id = $1")
        .bind(reporte.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "ok": true, "mensaje": "Reporte eliminado" })))
}
