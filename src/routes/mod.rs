use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    db::AppState,
    handlers::{admin, auth, ensayo, health, reporte, show, ticket, upload, user},
    utils::jwt::{admin_middleware, auth_middleware, supremo_middleware},
};

// Margen para las cabeceras multipart además de la imagen
const UPLOAD_BODY_LIMIT: usize = upload::MAX_IMAGE_BYTES + 64 * 1024;

pub fn create_routes(state: AppState) -> Router {
    // 1. Rutas Públicas (Todo el mundo)
    let public_routes = Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/completar-registro", post(auth::completar_registro_handler))
        .route("/api/shows", get(show::list_shows_handler))
        .route("/api/shows/:id", get(show::get_show_handler));

    // 2. Cualquier usuario con token válido
    let auth_routes = Router::new()
        .route("/api/auth/verificar", get(auth::verificar_handler))
        .route("/api/users/me", get(user::me_handler))
        .route("/api/users/change-password", post(user::change_password_handler))
        .route("/api/users/vendedores", get(user::list_vendedores_handler))
        .route("/api/shows/:id/tickets", get(show::list_show_tickets_handler))
        .route("/api/tickets/mis-tickets", get(ticket::mis_tickets_handler))
        .route("/api/tickets/:code", get(ticket::get_ticket_handler))
        .route("/api/tickets/:code/reserve", post(ticket::reserve_ticket_handler))
        .route("/api/tickets/:code/report-sold", post(ticket::report_sold_handler))
        .route("/api/tickets/:code/transfer", post(ticket::transfer_ticket_handler))
        .route("/api/tickets/:code/qr", get(ticket::ticket_qr_handler))
        .route("/api/ensayos", get(ensayo::list_ensayos_handler))
        .route("/api/ensayos/:id", get(ensayo::get_ensayo_handler))
        .route(
            "/api/upload/image",
            post(upload::upload_image_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // 3. Rutas de ADMIN (director o supremo)
    let admin_routes = Router::new()
        .route("/api/users", get(user::list_users_handler).post(user::create_user_handler))
        .route("/api/users/:phone", delete(user::deactivate_user_handler))
        .route("/api/shows", post(show::create_show_handler))
        .route(
            "/api/shows/:id",
            patch(show::update_show_handler).delete(show::delete_show_handler),
        )
        .route("/api/shows/:id/tickets", post(show::issue_tickets_handler))
        .route("/api/shows/:id/assign-tickets", post(show::assign_tickets_handler))
        .route("/api/shows/:id/cerrar", post(show::cerrar_show_handler))
        .route("/api/shows/concluidas", get(show::list_concluidas_handler))
        .route("/api/shows/:id/resumen", get(reporte::resumen_handler))
        .route("/api/shows/:id/resumen-por-vendedor", get(reporte::resumen_por_vendedor_handler))
        .route("/api/shows/:id/deudores", get(reporte::deudores_handler))
        .route("/api/tickets/search", get(ticket::search_tickets_handler))
        .route("/api/tickets/:code/approve-payment", post(ticket::approve_payment_handler))
        .route("/api/tickets/:code/validate", post(ticket::validate_ticket_handler))
        .route("/api/ensayos", post(ensayo::create_ensayo_handler))
        .route(
            "/api/ensayos/:id",
            put(ensayo::update_ensayo_handler).delete(ensayo::delete_ensayo_handler),
        )
        .route("/api/reportes-obras", get(reporte::list_reportes_handler))
        .route("/api/reportes-obras/generar/:show_id", post(reporte::generar_reporte_handler))
        .route(
            "/api/reportes-obras/:id",
            get(reporte::get_reporte_handler).delete(reporte::delete_reporte_handler),
        )
        .route("/api/upload/image", delete(upload::delete_image_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_middleware));

    // 4. Solo el supremo
    let supremo_routes = Router::new()
        .route("/api/users/:phone/reset-password", post(user::reset_password_handler))
        .route("/api/admin/limpiar-db", post(admin::limpiar_db_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), supremo_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Fusionamos todo
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(admin_routes)
        .merge(supremo_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
