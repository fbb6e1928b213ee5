use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgConnection;

use crate::{
    db::DbPool,
    error::{ApiJson, AppError},
    handlers::user::find_vendedor,
    models::{
        show::{
            AssignTicketsPayload, CerrarShowPayload, CreateShowSchema, IssueTicketsPayload, Show,
            ShowResponse, UpdateShowSchema, PUNTUACION_MAX, PUNTUACION_MIN,
        },
        ticket::{Ticket, TicketState},
        user::{Claims, Role},
    },
    utils::codes::generate_ticket_code,
};

const MAX_CODE_ATTEMPTS: usize = 5;
/// Tope de entradas por pedido de emisión.
pub const MAX_EMISION: i32 = 500;

pub(crate) async fn load_show<'e, E>(executor: E, id: i64) -> Result<Show, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Show>("SELECT * FROM shows WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Función no encontrada"))
}

// GET /api/shows (público)
pub async fn list_shows_handler(State(pool): State<DbPool>) -> Result<impl IntoResponse, AppError> {
    let shows = sqlx::query_as::<_, Show>("SELECT * FROM shows ORDER BY fecha DESC")
        .fetch_all(&pool)
        .await?;

    let shows: Vec<ShowResponse> = shows.into_iter().map(ShowResponse::from).collect();
    Ok(Json(shows))
}

// GET /api/shows/:id (público)
pub async fn get_show_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
) -> Result<impl IntoResponse, AppError> {
    let show = load_show(&pool, id).await?;
    Ok(Json(ShowResponse::from(show)))
}

// POST /api/shows (admin)
pub async fn create_show_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<CreateShowSchema>,
) -> Result<impl IntoResponse, AppError> {
    let obra = body.obra.trim();
    if obra.is_empty() {
        return Err(AppError::bad_request("obra, fecha, capacidad y base_price son obligatorios"));
    }
    if body.capacidad <= 0 {
        return Err(AppError::bad_request("capacidad debe ser mayor a 0"));
    }
    if body.base_price < Decimal::ZERO {
        return Err(AppError::bad_request("base_price no puede ser negativo"));
    }

    let show = sqlx::query_as::<_, Show>(
        r#"
        INSERT INTO shows (obra, fecha, lugar, capacidad, base_price, creado_por)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(obra)
    .bind(body.fecha)
    .bind(body.lugar.as_deref())
    .bind(body.capacidad)
    .bind(body.base_price)
    .bind(&claims.sub)
    .fetch_one(&pool)
    .await?;

    tracing::info!(id = show.id, obra = %show.obra, capacidad = show.capacidad, "Función creada");
    Ok((StatusCode::CREATED, Json(ShowResponse::from(show))))
}

// PATCH /api/shows/:id (admin)
pub async fn update_show_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    ApiJson(body): ApiJson<UpdateShowSchema>,
) -> Result<impl IntoResponse, AppError> {
    if body.capacidad.is_some_and(|c| c <= 0) {
        return Err(AppError::bad_request("capacidad debe ser mayor a 0"));
    }
    if body.base_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(AppError::bad_request("base_price no puede ser negativo"));
    }

    // COALESCE: si el campo viene NULL se conserva el valor actual.
    // La capacidad nunca puede quedar por debajo de lo ya emitido.
    let updated = sqlx::query_as::<_, Show>(
        r#"
        UPDATE shows SET
            obra = COALESCE($1, obra),
            fecha = COALESCE($2, fecha),
            lugar = COALESCE($3, lugar),
            capacidad = COALESCE($4, capacidad),
            base_price = COALESCE($5, base_price)
        WHERE id = $6 AND COALESCE($4, capacidad) >= entradas_vendidas
        RETURNING *
        "#,
    )
    .bind(body.obra.as_deref().map(str::trim))
    .bind(body.fecha)
    .bind(body.lugar.as_deref())
    .bind(body.capacidad)
    .bind(body.base_price)
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    match updated {
        Some(show) => Ok(Json(ShowResponse::from(show))),
        None => {
            let show = load_show(&pool, id).await?;
            Err(AppError::conflict(format!(
                "La capacidad no puede ser menor a las {} entradas ya emitidas",
                show.entradas_vendidas
            )))
        }
    }
}

// DELETE /api/shows/:id (admin)
pub async fn delete_show_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    // Bloqueamos la función para que nadie venda mientras se decide
    sqlx::query("SELECT id FROM shows WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Función no encontrada"))?;

    let vendidas: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tickets WHERE show_id = $1 AND estado NOT IN ($2, $3)",
    )
    .bind(id)
    .bind(TicketState::Disponible.as_str())
    .bind(TicketState::StockVendedor.as_str())
    .fetch_one(&mut *tx)
    .await?;

    if vendidas > 0 {
        return Err(AppError::conflict(format!(
            "No se puede eliminar: la función tiene {vendidas} entradas vendidas"
        )));
    }

    sqlx::query("DELETE FROM shows WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(id, "Función eliminada");
    Ok(Json(json!({ "ok": true, "mensaje": "Función eliminada correctamente" })))
}

/// Inserta `cantidad` entradas DISPONIBLE en un solo INSERT por intento.
/// Los códigos repetidos se descartan y se regeneran en el siguiente intento.
async fn insert_tickets(
    conn: &mut PgConnection,
    show_id: i64,
    cantidad: usize,
) -> Result<Vec<Ticket>, AppError> {
    let mut tickets = Vec::with_capacity(cantidad);

    for _ in 0..MAX_CODE_ATTEMPTS {
        let faltan = cantidad - tickets.len();
        if faltan == 0 {
            break;
        }
        let codes: Vec<String> = (0..faltan).map(|_| generate_ticket_code()).collect();

        let nuevos = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (code, show_id, estado)
            SELECT code, $2::bigint, $3::text FROM UNNEST($1::text[]) AS code
            ON CONFLICT (code) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(codes)
        .bind(show_id)
        .bind(TicketState::Disponible.as_str())
        .fetch_all(&mut *conn)
        .await?;

        tickets.extend(nuevos);
    }

    if tickets.len() < cantidad {
        return Err(AppError::internal("No se pudo generar un código de ticket único"));
    }
    Ok(tickets)
}

async fn assign_to_vendedor(
    conn: &mut PgConnection,
    codes: Vec<String>,
    vendedor_phone: &str,
) -> Result<Vec<Ticket>, AppError> {
    TicketState::Disponible.check_transition(TicketState::StockVendedor)?;

    let tickets = sqlx::query_as::<_, Ticket>(
        r#"
        UPDATE tickets
        SET estado = $1, vendedor_phone = $2, asignado_at = NOW()
        WHERE code = ANY($3::text[]) AND estado = $4
        RETURNING *
        "#,
    )
    .bind(TicketState::StockVendedor.as_str())
    .bind(vendedor_phone)
    .bind(codes)
    .bind(TicketState::Disponible.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(tickets)
}

// POST /api/shows/:id/tickets (admin) - emitir entradas contra la capacidad
pub async fn issue_tickets_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<IssueTicketsPayload>,
) -> Result<impl IntoResponse, AppError> {
    if body.cantidad <= 0 {
        return Err(AppError::bad_request("cantidad debe ser mayor a 0"));
    }

    // El contador y las filas de tickets cambian en la misma transacción
    let mut tx = pool.begin().await?;

    let vendedor = match body.vendedor_phone.as_deref().map(str::trim) {
        Some(phone) => Some(find_vendedor(&mut *tx, phone).await?),
        None => None,
    };

    let actual = sqlx::query_as::<_, Show>("SELECT * FROM shows WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Función no encontrada"))?;

    if actual.concluida() {
        return Err(AppError::conflict("La función ya está concluida"));
    }
    if body.cantidad > actual.disponibles() {
        return Err(AppError::conflict(format!(
            "Solo quedan {} entradas disponibles",
            actual.disponibles()
        )));
    }
    if body.cantidad > MAX_EMISION {
        return Err(AppError::bad_request(format!(
            "No se pueden emitir más de {MAX_EMISION} entradas por vez"
        )));
    }

    // La fila está bloqueada: el guard en bigint solo cubre desbordes
    let show = sqlx::query_as::<_, Show>(
        r#"
        UPDATE shows
        SET entradas_vendidas = entradas_vendidas + $1
        WHERE id = $2 AND entradas_vendidas::bigint + $1::bigint <= capacidad
        RETURNING *
        "#,
    )
    .bind(body.cantidad)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::conflict("No quedan entradas suficientes"))?;

    let mut tickets = insert_tickets(&mut tx, show.id, body.cantidad as usize).await?;

    if let Some(vendedor) = &vendedor {
        let codes = tickets.iter().map(|t| t.code.clone()).collect();
        tickets = assign_to_vendedor(&mut tx, codes, &vendedor.phone).await?;
    }

    tx.commit().await?;

    tracing::info!(
        show_id = show.id,
        cantidad = body.cantidad,
        vendedor = ?vendedor.as_ref().map(|v| v.phone.as_str()),
        admin = %claims.sub,
        "Entradas emitidas"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": format!("{} entradas emitidas", tickets.len()),
            "show": ShowResponse::from(show),
            "tickets": tickets,
        })),
    ))
}

// POST /api/shows/:id/assign-tickets (admin) - DISPONIBLE -> STOCK_VENDEDOR
pub async fn assign_tickets_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    ApiJson(body): ApiJson<AssignTicketsPayload>,
) -> Result<impl IntoResponse, AppError> {
    if body.cantidad <= 0 {
        return Err(AppError::bad_request("cantidad debe ser mayor a 0"));
    }

    let mut tx = pool.begin().await?;
    if load_show(&mut *tx, id).await?.concluida() {
        return Err(AppError::conflict("La función ya está concluida"));
    }
    let vendedor = find_vendedor(&mut *tx, body.vendedor_phone.trim()).await?;

    // SKIP LOCKED: dos asignaciones simultáneas nunca toman la misma entrada
    let codes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT code FROM tickets
        WHERE show_id = $1 AND estado = $2
        ORDER BY created_at, code
        LIMIT $3
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(id)
    .bind(TicketState::Disponible.as_str())
    .bind(i64::from(body.cantidad))
    .fetch_all(&mut *tx)
    .await?;

    if codes.len() < body.cantidad as usize {
        return Err(AppError::conflict(format!(
            "Solo hay {} tickets disponibles",
            codes.len()
        )));
    }

    let tickets = assign_to_vendedor(&mut tx, codes, &vendedor.phone).await?;
    tx.commit().await?;

    tracing::info!(show_id = id, vendedor = %vendedor.phone, cantidad = tickets.len(), "Tickets asignados");
    Ok(Json(json!({
        "mensaje": format!("{} tickets asignados a {}", tickets.len(), vendedor.name),
        "vendedor": { "phone": vendedor.phone, "name": vendedor.name },
        "tickets": tickets,
    })))
}

// GET /api/shows/:id/tickets - admin ve todo, el resto solo lo suyo
pub async fn list_show_tickets_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    load_show(&pool, id).await?;

    let vendedor_filter = if claims.role.is_admin() {
        None
    } else {
        Some(claims.sub.as_str())
    };

    let tickets = sqlx::query_as::<_, Ticket>(
        r#"
        SELECT * FROM tickets
        WHERE show_id = $1
          AND ($2::text IS NULL OR vendedor_phone = $2)
        ORDER BY code
        "#,
    )
    .bind(id)
    .bind(vendedor_filter)
    .fetch_all(&pool)
    .await?;

    Ok(Json(tickets))
}

// POST /api/shows/:id/cerrar (admin) - marca la función como concluida
pub async fn cerrar_show_handler(
    Path(id): Path<i64>,
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<CerrarShowPayload>,
) -> Result<impl IntoResponse, AppError> {
    if !body.puntuacion_valida() {
        return Err(AppError::bad_request(format!(
            "La puntuación debe estar entre {PUNTUACION_MIN} y {PUNTUACION_MAX}"
        )));
    }

    let cerrada = sqlx::query_as::<_, Show>(
        r#"
        UPDATE shows SET
            fecha_conclusion = NOW(),
            conclusion_director = $1,
            puntuacion = $2
        WHERE id = $3 AND fecha_conclusion IS NULL
        RETURNING *
        "#,
    )
    .bind(body.conclusion_director.as_deref().map(str::trim))
    .bind(body.puntuacion)
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    let Some(show) = cerrada else {
        load_show(&pool, id).await?;
        return Err(AppError::bad_request("La función ya está concluida"));
    };

    tracing::info!(id, por = %claims.sub, puntuacion = ?show.puntuacion, "Función cerrada");
    Ok(Json(json!({
        "ok": true,
        "mensaje": "Función cerrada exitosamente",
        "show": ShowResponse::from(show),
    })))
}

// GET /api/shows/concluidas (admin) - el supremo ve todas
pub async fn list_concluidas_handler(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let creador = (claims.role != Role::Supremo).then_some(claims.sub.as_str());

    let shows = sqlx::query_as::<_, Show>(
        r#"
        SELECT * FROM shows
        WHERE fecha_conclusion IS NOT NULL
          AND ($1::text IS NULL OR creado_por = $1)
        ORDER BY fecha DESC
        "#,
    )
    .bind(creador)
    .fetch_all(&pool)
    .await?;

    let shows: Vec<ShowResponse> = shows.into_iter().map(ShowResponse::from).collect();
    Ok(Json(shows))
}
