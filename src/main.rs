use anyhow::Context;
use teatro_tickets_backend::{
    config::Config,
    db::{self, AppState},
    routes,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Configuración inválida")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::init_db(&config)
        .await
        .context("No se pudo conectar a Postgres")?;
    tracing::info!("✅ Conexión a Postgres exitosa");

    db::run_migrations(&pool)
        .await
        .context("Fallaron las migraciones")?;

    let addr = config.bind_address();

    let app = routes::create_routes(AppState::new(pool, config));

    tracing::info!("🚀 Servidor del teatro corriendo en http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("Fallo al enlazar el puerto")?;
    axum::serve(listener, app).await?;
    Ok(())
}
