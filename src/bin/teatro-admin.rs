//! Tareas de mantenimiento por línea de comandos.
//!
//! ```text
//! teatro-admin seed-supremo --phone 1100000000 --name "Dirección" --password secreto
//! teatro-admin reconciliar
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use teatro_tickets_backend::{config::Config, db, maintenance};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "teatro-admin", about = "Mantenimiento de la base del teatro")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Borra todo menos los usuarios supremo
    Limpiar {
        /// Confirma la operación
        #[arg(long)]
        confirmar: bool,
    },
    /// Borra las funciones con fecha anterior a hoy
    PurgarPasadas,
    /// Cambia la contraseña de un usuario
    ResetPassword {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Crea el usuario supremo si no existe
    SeedSupremo {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Recalcula las entradas emitidas de cada función
    Reconciliar,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Configuración inválida")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::init_db(&config)
        .await
        .context("No se pudo conectar a Postgres")?;
    db::run_migrations(&pool).await.context("Fallaron las migraciones")?;

    match cli.command {
        Command::Limpiar { confirmar } => {
            if !confirmar {
                anyhow::bail!("La limpieza borra todos los datos; repetir con --confirmar");
            }
            let resumen = maintenance::limpiar_db(&pool).await?;
            println!("{}", serde_json::to_string_pretty(&resumen)?);
        }
        Command::PurgarPasadas => {
            let borradas = maintenance::purgar_funciones_pasadas(&pool).await?;
            println!("{borradas} funciones eliminadas");
        }
        Command::ResetPassword { phone, password } => {
            maintenance::reset_password(&pool, &phone, &password).await?;
            println!("Contraseña de {phone} actualizada");
        }
        Command::SeedSupremo { phone, name, password } => {
            if maintenance::asegurar_supremo(&pool, &phone, &name, &password).await? {
                println!("Usuario supremo {phone} creado");
            } else {
                println!("El usuario {phone} ya existía");
            }
        }
        Command::Reconciliar => {
            let corregidos = maintenance::reconciliar_conteos(&pool).await?;
            if corregidos.is_empty() {
                println!("Todos los contadores coinciden");
            }
            for c in corregidos {
                println!(
                    "#{} {}: {} -> {} (capacidad {})",
                    c.show_id, c.obra, c.antes, c.despues, c.capacidad
                );
            }
        }
    }

    Ok(())
}
