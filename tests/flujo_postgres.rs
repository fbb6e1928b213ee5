//! Pruebas contra un Postgres real.
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test --test flujo_postgres -- --ignored
//! ```
//!
//! Cada prueba limpia la base, así que no correr contra datos reales.

use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use teatro_tickets_backend::{
    config::Config,
    db::{self, AppState, DbPool},
    maintenance,
    routes::create_routes,
};

const SUPREMO_PHONE: &str = "0990000001";
const SUPREMO_PASSWORD: &str = "clave-supremo";

// Todas comparten la misma base: de a una por vez
static BASE: Mutex<()> = Mutex::new(());

async fn setup() -> (TestServer, DbPool, MutexGuard<'static, ()>) {
    let guard = BASE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let config = Config::from_lookup(|var| match var {
        "JWT_SECRET" => Some("secreto-de-prueba".into()),
        "UPLOAD_DIR" => Some(std::env::temp_dir().join("teatro-uploads").display().to_string()),
        other => std::env::var(other).ok(),
    })
    .expect("DATABASE_URL es obligatorio para estas pruebas");

    let pool = db::init_db(&config).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    maintenance::limpiar_db(&pool).await.unwrap();
    maintenance::asegurar_supremo(&pool, SUPREMO_PHONE, "Dirección", SUPREMO_PASSWORD)
        .await
        .unwrap();

    let server = TestServer::new(create_routes(AppState::new(pool.clone(), config))).unwrap();
    (server, pool, guard)
}

async fn login(server: &TestServer, phone: &str, password: &str) -> HeaderValue {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "phone": phone, "password": password }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let token = body["token"].as_str().unwrap();
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

/// Crea un usuario con contraseña y devuelve su cabecera de autorización.
async fn alta(server: &TestServer, admin: &HeaderValue, phone: &str, role: &str) -> HeaderValue {
    server
        .post("/api/users")
        .add_header(AUTHORIZATION, admin.clone())
        .json(&json!({ "phone": phone, "name": format!("Usuario {phone}"), "role": role, "password": "clave-larga" }))
        .await
        .assert_status(StatusCode::CREATED);
    login(server, phone, "clave-larga").await
}

async fn crear_show(server: &TestServer, admin: &HeaderValue, capacidad: i32) -> i64 {
    let show: Value = server
        .post("/api/shows")
        .add_header(AUTHORIZATION, admin.clone())
        .json(&json!({
            "obra": "Bodas de sangre",
            "fecha": "2099-06-20T21:00:00Z",
            "capacidad": capacidad,
            "base_price": "2000.00"
        }))
        .await
        .json();
    show["id"].as_i64().unwrap()
}

/// Emite entradas ya asignadas a un vendedor y devuelve sus códigos.
async fn emitir_para(
    server: &TestServer,
    admin: &HeaderValue,
    show_id: i64,
    vendedor: &str,
    cantidad: i32,
) -> Vec<String> {
    let respuesta = server
        .post(&format!("/api/shows/{show_id}/tickets"))
        .add_header(AUTHORIZATION, admin.clone())
        .json(&json!({ "cantidad": cantidad, "vendedor_phone": vendedor }))
        .await;
    respuesta.assert_status(StatusCode::CREATED);
    respuesta.json::<Value>()["tickets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["code"].as_str().unwrap().to_string())
        .collect()
}

async fn vender(server: &TestServer, vendedor: &HeaderValue, code: &str) {
    server
        .post(&format!("/api/tickets/{code}/reserve"))
        .add_header(AUTHORIZATION, vendedor.clone())
        .json(&json!({ "comprador_nombre": "Julia" }))
        .await
        .assert_status_ok();
    server
        .post(&format!("/api/tickets/{code}/report-sold"))
        .add_header(AUTHORIZATION, vendedor.clone())
        .json(&json!({ "precio": "2000.00", "medio_pago": "efectivo" }))
        .await
        .assert_status_ok();
}

async fn estado(pool: &DbPool, code: &str) -> String {
    sqlx::query_scalar("SELECT estado FROM tickets WHERE code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn venta_completa_de_una_entrada() {
    let (server, pool, _base) = setup().await;

    // Login: contraseña incorrecta
    server
        .post("/api/auth/login")
        .json(&json!({ "phone": SUPREMO_PHONE, "password": "incorrecta" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;

    // Vendedor creado sin contraseña: primer ingreso pide completar registro
    server
        .post("/api/users")
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "phone": "0990000002", "name": "Marta", "role": "vendedor" }))
        .await
        .assert_status(StatusCode::CREATED);

    let pendiente = server
        .post("/api/auth/login")
        .json(&json!({ "phone": "0990000002", "password": "loquesea" }))
        .await;
    pendiente.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(pendiente.json::<Value>()["requires_setup"], true);

    server
        .post("/api/auth/completar-registro")
        .json(&json!({ "phone": "0990000002", "name": "Marta", "password": "clave-marta" }))
        .await
        .assert_status_ok();
    let vendedor = login(&server, "0990000002", "clave-marta").await;

    // Función con 3 lugares
    let show: Value = server
        .post("/api/shows")
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({
            "obra": "Yerma",
            "fecha": "2099-03-10T21:00:00Z",
            "capacidad": 3,
            "base_price": "2000.00"
        }))
        .await
        .json();
    let show_id = show["id"].as_i64().unwrap();
    assert_eq!(show["disponibles"], 3);

    // Emitir 2 entradas descuenta exactamente 2
    server
        .post(&format!("/api/shows/{show_id}/tickets"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "cantidad": 2 }))
        .await
        .assert_status(StatusCode::CREATED);

    let show: Value = server.get(&format!("/api/shows/{show_id}")).await.json();
    assert_eq!(show["disponibles"], 1);

    // Pasarse de la capacidad
    server
        .post(&format!("/api/shows/{show_id}/tickets"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "cantidad": 2 }))
        .await
        .assert_status(StatusCode::CONFLICT);

    // Asignar una entrada al vendedor
    let asignacion: Value = server
        .post(&format!("/api/shows/{show_id}/assign-tickets"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "vendedor_phone": "0990000002", "cantidad": 1 }))
        .await
        .json();
    let code = asignacion["tickets"][0]["code"].as_str().unwrap().to_string();
    assert_eq!(asignacion["tickets"][0]["estado"], "STOCK_VENDEDOR");

    // Saltar RESERVADO se rechaza
    server
        .post(&format!("/api/tickets/{code}/report-sold"))
        .add_header(AUTHORIZATION, vendedor.clone())
        .json(&json!({ "precio": "2000.00", "medio_pago": "efectivo" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post(&format!("/api/tickets/{code}/reserve"))
        .add_header(AUTHORIZATION, vendedor.clone())
        .json(&json!({ "comprador_nombre": "Julia" }))
        .await
        .assert_status_ok();
    server
        .post(&format!("/api/tickets/{code}/report-sold"))
        .add_header(AUTHORIZATION, vendedor.clone())
        .json(&json!({ "precio": "2000.00", "medio_pago": "efectivo" }))
        .await
        .assert_status_ok();

    let deudores: Value = server
        .get(&format!("/api/shows/{show_id}/deudores"))
        .add_header(AUTHORIZATION, supremo.clone())
        .await
        .json();
    assert_eq!(deudores["vendedores_deudores"][0]["vendedor_phone"], "0990000002");

    // En la puerta: sin aprobar no entra
    server
        .post(&format!("/api/tickets/{code}/validate"))
        .add_header(AUTHORIZATION, supremo.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post(&format!("/api/tickets/{code}/approve-payment"))
        .add_header(AUTHORIZATION, supremo.clone())
        .await
        .assert_status_ok();

    let entrada = server
        .post(&format!("/api/tickets/{code}/validate"))
        .add_header(AUTHORIZATION, supremo.clone())
        .await;
    entrada.assert_status_ok();
    assert_eq!(entrada.json::<Value>()["valido"], true);

    // Segunda lectura del mismo código
    let repetida = server
        .post(&format!("/api/tickets/{code}/validate"))
        .add_header(AUTHORIZATION, supremo.clone())
        .await;
    repetida.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(repetida.json::<Value>()["motivo"], "Ticket ya fue usado");

    // Con entradas vendidas la función no se puede borrar
    server
        .delete(&format!("/api/shows/{show_id}"))
        .add_header(AUTHORIZATION, supremo.clone())
        .await
        .assert_status(StatusCode::CONFLICT);

    assert!(maintenance::reconciliar_conteos(&pool).await.unwrap().is_empty());

    // Limpieza total: solo queda el supremo
    let limpieza: Value = server
        .post("/api/admin/limpiar-db")
        .add_header(AUTHORIZATION, supremo)
        .await
        .json();
    assert_eq!(limpieza["eliminados"]["tickets"], 2);
    assert_eq!(limpieza["eliminados"]["shows"], 1);
    assert_eq!(limpieza["eliminados"]["usuarios"], 1);
    let restantes = limpieza["eliminados"]["usuarios_restantes"].as_array().unwrap();
    assert_eq!(restantes.len(), 1);
    assert_eq!(restantes[0]["role"], "supremo");
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn login_de_telefono_desconocido_es_401() {
    let (server, _pool, _base) = setup().await;

    let respuesta = server
        .post("/api/auth/login")
        .json(&json!({ "phone": "0999999999", "password": "cualquiera" }))
        .await;

    respuesta.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(respuesta.json::<Value>()["error"], "Credenciales inválidas");
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn emitir_de_mas_no_toca_el_contador() {
    let (server, pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let show_id = crear_show(&server, &supremo, 5).await;

    for cantidad in [6, i32::MAX] {
        server
            .post(&format!("/api/shows/{show_id}/tickets"))
            .add_header(AUTHORIZATION, supremo.clone())
            .json(&json!({ "cantidad": cantidad }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    let show: Value = server.get(&format!("/api/shows/{show_id}")).await.json();
    assert_eq!(show["disponibles"], 5);
    let filas: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE show_id = $1")
        .bind(show_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(filas, 0);
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn asignar_sin_stock_suficiente_no_asigna_ninguna() {
    let (server, pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    alta(&server, &supremo, "0990000010", "vendedor").await;
    let show_id = crear_show(&server, &supremo, 10).await;

    server
        .post(&format!("/api/shows/{show_id}/tickets"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "cantidad": 2 }))
        .await
        .assert_status(StatusCode::CREATED);

    let respuesta = server
        .post(&format!("/api/shows/{show_id}/assign-tickets"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "vendedor_phone": "0990000010", "cantidad": 3 }))
        .await;
    respuesta.assert_status(StatusCode::CONFLICT);
    assert_eq!(respuesta.json::<Value>()["error"], "Solo hay 2 tickets disponibles");

    let asignadas: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tickets WHERE show_id = $1 AND vendedor_phone IS NOT NULL",
    )
    .bind(show_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(asignadas, 0);
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn reglas_de_transferencia() {
    let (server, pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let marta = alta(&server, &supremo, "0990000011", "vendedor").await;
    let pedro = alta(&server, &supremo, "0990000012", "vendedor").await;
    alta(&server, &supremo, "0990000013", "invitado").await;
    let show_id = crear_show(&server, &supremo, 10).await;
    let codes = emitir_para(&server, &supremo, show_id, "0990000011", 2).await;

    let transferir = |code: &str, destino: &str, quien: &HeaderValue| {
        server
            .post(&format!("/api/tickets/{code}/transfer"))
            .add_header(AUTHORIZATION, quien.clone())
            .json(&json!({ "vendedor_destino": destino }))
    };

    // A uno mismo
    transferir(&codes[0], "0990000011", &marta)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    // Destino que no es vendedor
    transferir(&codes[0], "0990000013", &marta)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    // Ticket ajeno
    transferir(&codes[0], "0990000011", &pedro)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    transferir(&codes[0], "0990000012", &marta).await.assert_status_ok();
    let dueno: Option<String> = sqlx::query_scalar("SELECT vendedor_phone FROM tickets WHERE code = $1")
        .bind(&codes[0])
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(dueno.as_deref(), Some("0990000012"));
    assert_eq!(estado(&pool, &codes[0]).await, "STOCK_VENDEDOR");

    // Reservado ya no se transfiere
    server
        .post(&format!("/api/tickets/{}/reserve", codes[1]))
        .add_header(AUTHORIZATION, marta.clone())
        .json(&json!({ "comprador_nombre": "Julia" }))
        .await
        .assert_status_ok();
    transferir(&codes[1], "0990000012", &marta)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn aprobar_un_pago_que_otro_ya_aprobo_es_409() {
    let (server, pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let marta = alta(&server, &supremo, "0990000014", "vendedor").await;
    let show_id = crear_show(&server, &supremo, 10).await;
    let code = emitir_para(&server, &supremo, show_id, "0990000014", 1).await.remove(0);
    vender(&server, &marta, &code).await;

    // Otra conexión aprueba primero y mantiene la fila bloqueada
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("UPDATE tickets SET estado = 'PAGADO', pagado_at = NOW() WHERE code = $1")
        .bind(&code)
        .execute(&mut *tx)
        .await
        .unwrap();

    let (respuesta, ()) = tokio::join!(
        async {
            server
                .post(&format!("/api/tickets/{code}/approve-payment"))
                .add_header(AUTHORIZATION, supremo.clone())
                .await
        },
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            tx.commit().await.unwrap();
        }
    );

    respuesta.assert_status(StatusCode::CONFLICT);
    assert_eq!(estado(&pool, &code).await, "PAGADO");
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn ensayos_visibles_solo_para_sus_actores() {
    let (server, _pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let marta = alta(&server, &supremo, "0990000015", "vendedor").await;
    let pedro = alta(&server, &supremo, "0990000016", "vendedor").await;

    let ensayo: Value = server
        .post("/api/ensayos")
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({
            "titulo": "Pasada general",
            "fecha": "2099-06-18T19:00:00Z",
            "lugar": "Sala chica",
            "actores": ["0990000015"]
        }))
        .await
        .json();
    let id = ensayo["id"].as_i64().unwrap();

    let de_marta: Value = server.get("/api/ensayos").add_header(AUTHORIZATION, marta.clone()).await.json();
    assert_eq!(de_marta.as_array().unwrap().len(), 1);
    let de_pedro: Value = server.get("/api/ensayos").add_header(AUTHORIZATION, pedro.clone()).await.json();
    assert!(de_pedro.as_array().unwrap().is_empty());

    server
        .get(&format!("/api/ensayos/{id}"))
        .add_header(AUTHORIZATION, pedro)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get(&format!("/api/ensayos/{id}"))
        .add_header(AUTHORIZATION, marta)
        .await
        .assert_status_ok();
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn reporte_de_obra_suma_por_estado_y_vendedor() {
    let (server, _pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let marta = alta(&server, &supremo, "0990000017", "vendedor").await;
    let show_id = crear_show(&server, &supremo, 10).await;
    let codes = emitir_para(&server, &supremo, show_id, "0990000017", 3).await;

    // Una usada, una adeudada, una en stock
    vender(&server, &marta, &codes[0]).await;
    vender(&server, &marta, &codes[1]).await;
    server
        .post(&format!("/api/tickets/{}/approve-payment", codes[0]))
        .add_header(AUTHORIZATION, supremo.clone())
        .await
        .assert_status_ok();
    server
        .post(&format!("/api/tickets/{}/validate", codes[0]))
        .add_header(AUTHORIZATION, supremo.clone())
        .await
        .assert_status_ok();

    let respuesta = server
        .post(&format!("/api/reportes-obras/generar/{show_id}"))
        .add_header(AUTHORIZATION, supremo.clone())
        .await;
    respuesta.assert_status(StatusCode::CREATED);
    let reporte: Value = respuesta.json();

    assert_eq!(reporte["total_tickets"], 3);
    assert_eq!(reporte["tickets_vendidos"], 2);
    assert_eq!(reporte["tickets_usados"], 1);
    let ingresos: Decimal = reporte["ingresos_totales"].as_str().unwrap().parse().unwrap();
    assert_eq!(ingresos, Decimal::new(4000, 0));

    let marta_fila = &reporte["datos_vendedores"][0];
    assert_eq!(marta_fila["vendedor_phone"], "0990000017");
    assert_eq!(marta_fila["en_stock"], 1);
    assert_eq!(marta_fila["reportadas_vendidas"], 1);
    assert_eq!(marta_fila["usadas"], 1);
    let debe: Decimal = marta_fila["monto_debe"].as_str().unwrap().parse().unwrap();
    assert_eq!(debe, Decimal::new(2000, 0));

    let listado: Value = server
        .get("/api/reportes-obras")
        .add_header(AUTHORIZATION, supremo)
        .await
        .json();
    assert_eq!(listado.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn cerrar_funcion_y_listar_concluidas() {
    let (server, _pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let director = alta(&server, &supremo, "0990000018", "admin").await;
    let show_id = crear_show(&server, &supremo, 10).await;
    crear_show(&server, &director, 10).await;

    server
        .post(&format!("/api/shows/{show_id}/cerrar"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "puntuacion": 11 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let cerrada = server
        .post(&format!("/api/shows/{show_id}/cerrar"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "conclusion_director": "Sala llena", "puntuacion": 9 }))
        .await;
    cerrada.assert_status_ok();
    assert_eq!(cerrada.json::<Value>()["show"]["concluida"], true);

    // Dos veces no
    server
        .post(&format!("/api/shows/{show_id}/cerrar"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .post("/api/shows/999999/cerrar")
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({}))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Concluida: no se emiten más entradas
    server
        .post(&format!("/api/shows/{show_id}/tickets"))
        .add_header(AUTHORIZATION, supremo.clone())
        .json(&json!({ "cantidad": 1 }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let todas: Value = server
        .get("/api/shows/concluidas")
        .add_header(AUTHORIZATION, supremo)
        .await
        .json();
    assert_eq!(todas.as_array().unwrap().len(), 1);
    assert_eq!(todas[0]["puntuacion"], 9);

    // El director solo ve las suyas
    let propias: Value = server
        .get("/api/shows/concluidas")
        .add_header(AUTHORIZATION, director)
        .await
        .json();
    assert!(propias.as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn qr_solo_para_el_dueno_o_un_admin() {
    let (server, _pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let marta = alta(&server, &supremo, "0990000019", "vendedor").await;
    let pedro = alta(&server, &supremo, "0990000020", "vendedor").await;
    let show_id = crear_show(&server, &supremo, 10).await;
    let code = emitir_para(&server, &supremo, show_id, "0990000019", 1).await.remove(0);

    let respuesta = server
        .get(&format!("/api/tickets/{code}/qr"))
        .add_header(AUTHORIZATION, marta)
        .await;
    respuesta.assert_status_ok();
    let body: Value = respuesta.json();
    assert!(body["url"].as_str().unwrap().ends_with(&format!("/tickets/validar/{code}")));
    assert!(body["qr"].as_str().unwrap().starts_with("data:image/png;base64,"));

    server
        .get(&format!("/api/tickets/{code}/qr"))
        .add_header(AUTHORIZATION, pedro)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get(&format!("/api/tickets/{code}/qr"))
        .add_header(AUTHORIZATION, supremo)
        .await
        .assert_status_ok();
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn reconciliar_corrige_contadores_y_sube_la_capacidad() {
    let (server, pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let chica = crear_show(&server, &supremo, 2).await;
    let desfasada = crear_show(&server, &supremo, 10).await;

    // Filas cargadas a mano, sin pasar por el contador
    sqlx::query(
        "INSERT INTO tickets (code, show_id, estado)
         VALUES ('T-0000000A', $1, 'DISPONIBLE'), ('T-0000000B', $1, 'DISPONIBLE'),
                ('T-0000000C', $1, 'DISPONIBLE'), ('T-0000000D', $2, 'DISPONIBLE')",
    )
    .bind(chica)
    .bind(desfasada)
    .execute(&pool)
    .await
    .unwrap();

    let corregidos = maintenance::reconciliar_conteos(&pool).await.unwrap();
    assert_eq!(corregidos.len(), 2);

    let c = corregidos.iter().find(|c| c.show_id == chica).unwrap();
    assert_eq!((c.antes, c.despues, c.capacidad), (0, 3, 3));
    let d = corregidos.iter().find(|c| c.show_id == desfasada).unwrap();
    assert_eq!((d.antes, d.despues, d.capacidad), (0, 1, 10));

    let show: Value = server.get(&format!("/api/shows/{chica}")).await.json();
    assert_eq!(show["disponibles"], 0);
    assert!(maintenance::reconciliar_conteos(&pool).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requiere DATABASE_URL"]
async fn busqueda_trata_comodines_como_texto() {
    let (server, _pool, _base) = setup().await;
    let supremo = login(&server, SUPREMO_PHONE, SUPREMO_PASSWORD).await;
    let marta = alta(&server, &supremo, "0990000021", "vendedor").await;
    let show_id = crear_show(&server, &supremo, 10).await;
    let code = emitir_para(&server, &supremo, show_id, "0990000021", 1).await.remove(0);
    vender(&server, &marta, &code).await;

    let buscar = |q: &str| {
        server
            .get("/api/tickets/search")
            .add_query_param("q", q)
            .add_header(AUTHORIZATION, supremo.clone())
    };

    let parcial: Value = buscar("uli").await.json();
    assert_eq!(parcial["total"], 1);
    for comodin in ["%", "_", "J%a"] {
        let body: Value = buscar(comodin).await.json();
        assert_eq!(body["total"], 0, "q={comodin}");
    }
}
