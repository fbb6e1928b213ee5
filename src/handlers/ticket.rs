use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use crate::{
    config::Config,
    db::DbPool,
    error::{ApiJson, AppError},
    handlers::user::find_vendedor,
    models::{
        ticket::{
            MisTicketsQuery, ReportSoldPayload, ReservePayload, SearchQuery, StateCounts, Ticket,
            TicketState, TransferPayload,
        },
        user::Claims,
    },
    utils::qr::{qr_data_url, validation_url},
};

const SEARCH_LIMIT: i64 = 50;

pub(crate) async fn load_ticket(pool: &DbPool, code: &str) -> Result<Ticket, AppError> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Ticket no encontrado"))
}

fn ensure_owner(ticket: &Ticket, claims: &Claims) -> Result<(), AppError> {
    if ticket.vendedor_phone.as_deref() == Some(claims.sub.as_str()) {
        Ok(())
    } else {
        Err(AppError::forbidden("Este ticket no está en tu stock"))
    }
}

// Cero filas en un UPDATE condicionado al estado = otra petición ganó la carrera
fn moved_concurrently() -> AppError {
    AppError::conflict("El ticket cambió de estado mientras se procesaba, reintentá")
}

/// Escapa los comodines de LIKE para buscar el texto tal cual.
fn escape_like(q: &str) -> String {
    let mut out = String::with_capacity(q.len());
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Motivo por el que una entrada no puede entrar a sala, o `None` si está pagada.
pub fn motivo_rechazo(estado: TicketState) -> Option<&'static str> {
    match estado {
        TicketState::Pagado => None,
        TicketState::Usado => Some("Ticket ya fue usado"),
        TicketState::ReportadaVendida => {
            Some("Ticket reportado vendido pero aún no aprobado por admin")
        }
        TicketState::Reservado => Some("Ticket reservado pero no cobrado"),
        TicketState::Disponible | TicketState::StockVendedor => Some("Ticket nunca fue vendido"),
    }
}

// GET /api/tickets/mis-tickets?show_id=
pub async fn mis_tickets_handler(
    Query(query): Query<MisTicketsQuery>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let tickets = sqlx::query_as::<_, Ticket>(
        r#"
        SELECT t.*
        FROM tickets t
        JOIN shows s ON s.id = t.show_id
        WHERE t.vendedor_phone = $1
          AND ($2::bigint IS NULL OR t.show_id = $2)
        ORDER BY s.fecha, t.code
        "#,
    )
    .bind(&claims.sub)
    .bind(query.show_id)
    .fetch_all(&pool)
    .await?;

    let counts = StateCounts::from_tickets(&tickets);
    Ok(Json(json!({
        "vendedor_phone": claims.sub,
        "total": tickets.len(),
        "conteos": counts,
        "tickets": tickets,
    })))
}

// GET /api/tickets/:code
pub async fn get_ticket_handler(
    Path(code): Path<String>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = load_ticket(&pool, &code).await?;
    if !claims.role.is_admin() {
        ensure_owner(&ticket, &claims)?;
    }
    Ok(Json(ticket))
}

// GET /api/tickets/:code/qr - el dueño o un admin
pub async fn ticket_qr_handler(
    Path(code): Path<String>,
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = load_ticket(&pool, &code).await?;
    if !claims.role.is_admin() {
        ensure_owner(&ticket, &claims)?;
    }

    let url = validation_url(&config.public_url, &ticket.code);
    let qr = qr_data_url(&url)?;
    Ok(Json(json!({ "code": ticket.code, "url": url, "qr": qr })))
}

// POST /api/tickets/:code/reserve (vendedor dueño)
pub async fn reserve_ticket_handler(
    Path(code): Path<String>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<ReservePayload>,
) -> Result<impl IntoResponse, AppError> {
    let comprador = body.comprador_nombre.trim();
    if comprador.is_empty() {
        return Err(AppError::bad_request("comprador_nombre es obligatorio"));
    }

    let ticket = load_ticket(&pool, &code).await?;
    ensure_owner(&ticket, &claims)?;
    ticket.estado.check_transition(TicketState::Reservado)?;

    let updated = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET estado = $1,
            comprador_nombre = $2,
            comprador_contacto = $3,
            reservado_at = NOW()
        WHERE code = $4 AND estado = $5 AND vendedor_phone = $6
        RETURNING *
        "#,
    )
    .bind(TicketState::Reservado.as_str())
    .bind(comprador)
    .bind(body.comprador_contacto.as_deref().map(str::trim))
    .bind(&code)
    .bind(ticket.estado.as_str())
    .bind(&claims.sub)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(moved_concurrently)?;

    tracing::info!(code = %updated.code, vendedor = %claims.sub, "Ticket reservado");
    Ok(Json(json!({ "mensaje": "Ticket reservado exitosamente", "ticket": updated })))
}

// POST /api/tickets/:code/report-sold (vendedor dueño)
pub async fn report_sold_handler(
    Path(code): Path<String>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<ReportSoldPayload>,
) -> Result<impl IntoResponse, AppError> {
    let medio_pago = body.medio_pago.trim();
    if medio_pago.is_empty() {
        return Err(AppError::bad_request("precio y medio_pago son obligatorios"));
    }
    if body.precio < Decimal::ZERO {
        return Err(AppError::bad_request("El precio no puede ser negativo"));
    }

    let ticket = load_ticket(&pool, &code).await?;
    ensure_owner(&ticket, &claims)?;
    ticket.estado.check_transition(TicketState::ReportadaVendida)?;

    let updated = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET estado = $1,
            precio = $2,
            medio_pago = $3,
            reportada_at = NOW()
        WHERE code = $4 AND estado = $5 AND vendedor_phone = $6
        RETURNING *
        "#,
    )
    .bind(TicketState::ReportadaVendida.as_str())
    .bind(body.precio)
    .bind(medio_pago)
    .bind(&code)
    .bind(ticket.estado.as_str())
    .bind(&claims.sub)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(moved_concurrently)?;

    tracing::info!(code = %updated.code, vendedor = %claims.sub, precio = %body.precio, "Venta reportada");
    Ok(Json(json!({
        "mensaje": "Venta reportada. Ahora debes entregarle la plata al admin.",
        "ticket": updated,
    })))
}

// POST /api/tickets/:code/transfer (vendedor dueño)
pub async fn transfer_ticket_handler(
    Path(code): Path<String>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<TransferPayload>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = load_ticket(&pool, &code).await?;
    ensure_owner(&ticket, &claims)?;

    if ticket.estado != TicketState::StockVendedor {
        return Err(AppError::bad_request(format!(
            "Solo se pueden transferir tickets en {}. Estado: {}",
            TicketState::StockVendedor,
            ticket.estado
        )));
    }
    let destino_phone = body.vendedor_destino.trim();
    if destino_phone == claims.sub {
        return Err(AppError::bad_request("El ticket ya es tuyo"));
    }

    let destino = find_vendedor(&pool, destino_phone)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::not_found("Vendedor destino no encontrado"),
            other => other,
        })?;

    let updated = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET vendedor_phone = $1, asignado_at = NOW()
        WHERE code = $2 AND estado = $3 AND vendedor_phone = $4
        RETURNING *
        "#,
    )
    .bind(&destino.phone)
    .bind(&code)
    .bind(TicketState::StockVendedor.as_str())
    .bind(&claims.sub)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(moved_concurrently)?;

    tracing::info!(code = %updated.code, de = %claims.sub, a = %destino.phone, "Ticket transferido");
    Ok(Json(json!({
        "mensaje": format!("Ticket transferido a {}", destino.name),
        "ticket": updated,
    })))
}

// POST /api/tickets/:code/approve-payment (admin)
pub async fn approve_payment_handler(
    Path(code): Path<String>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = load_ticket(&pool, &code).await?;
    ticket.estado.check_transition(TicketState::Pagado)?;

    let updated = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET estado = $1, pagado_at = NOW()
        WHERE code = $2 AND estado = $3
        RETURNING *
        "#,
    )
    .bind(TicketState::Pagado.as_str())
    .bind(&code)
    .bind(ticket.estado.as_str())
    .fetch_optional(&pool)
    .await?
    .ok_or_else(moved_concurrently)?;

    tracing::info!(code = %updated.code, admin = %claims.sub, "Pago aprobado");
    Ok(Json(json!({ "mensaje": "Pago aprobado. Ticket listo para usar.", "ticket": updated })))
}

// POST /api/tickets/:code/validate (admin, en la puerta)
pub async fn validate_ticket_handler(
    Path(code): Path<String>,
    State(pool): State<DbPool>,
) -> Result<Response, AppError> {
    let ticket = match sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE code = $1")
        .bind(&code)
        .fetch_optional(&pool)
        .await?
    {
        Some(t) => t,
        None => {
            let motivo = "Ticket inexistente";
            return Ok((
                StatusCode::NOT_FOUND,
                Json(json!({ "valido": false, "motivo": motivo, "error": motivo })),
            )
                .into_response());
        }
    };

    if let Some(motivo) = motivo_rechazo(ticket.estado) {
        tracing::warn!(code = %ticket.code, estado = %ticket.estado, "Ticket rechazado en puerta");
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "valido": false, "motivo": motivo, "error": motivo, "ticket": ticket })),
        )
            .into_response());
    }

    let updated = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET estado = $1, usado_at = NOW()
        WHERE code = $2 AND estado = $3
        RETURNING *
        "#,
    )
    .bind(TicketState::Usado.as_str())
    .bind(&code)
    .bind(TicketState::Pagado.as_str())
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::conflict("Ticket ya fue usado"))?;

    let obra: Option<String> = sqlx::query_scalar("SELECT obra FROM shows WHERE id = $1")
        .bind(updated.show_id)
        .fetch_optional(&pool)
        .await?;

    let bienvenida = format!(
        "Bienvenido {}!",
        updated.comprador_nombre.as_deref().unwrap_or("al teatro")
    );
    Ok(Json(json!({
        "valido": true,
        "mensaje": bienvenida,
        "obra": obra,
        "ticket": updated,
    }))
    .into_response())
}

// GET /api/tickets/search?q= (admin)
pub async fn search_tickets_handler(
    Query(query): Query<SearchQuery>,
    State(pool): State<DbPool>,
) -> Result<impl IntoResponse, AppError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request("query (q) es obligatorio"))?;
    let patron = escape_like(q);

    let tickets = sqlx::query_as::<_, Ticket>(
        r#"
        SELECT * FROM tickets
        WHERE code ILIKE '%' || $1 || '%' ESCAPE '\'
           OR comprador_nombre ILIKE '%' || $1 || '%' ESCAPE '\'
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(&patron)
    .bind(SEARCH_LIMIT)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({ "query": q, "total": tickets.len(), "tickets": tickets })))
}
