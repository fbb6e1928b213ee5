use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Una función (show) en la base de datos
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Show {
    pub id: i64,
    pub obra: String,
    pub fecha: DateTime<Utc>,
    pub lugar: Option<String>,
    pub capacidad: i32,
    pub base_price: Decimal,
    pub entradas_vendidas: i32,
    pub creado_por: Option<String>,
    pub created_at: DateTime<Utc>,
    // Cierre de la función
    pub fecha_conclusion: Option<DateTime<Utc>>,
    pub conclusion_director: Option<String>,
    pub puntuacion: Option<i32>,
}

impl Show {
    /// Capacidad todavía sin emitir.
    pub fn disponibles(&self) -> i32 {
        (self.capacidad - self.entradas_vendidas).max(0)
    }

    pub fn concluida(&self) -> bool {
        self.fecha_conclusion.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShowResponse {
    #[serde(flatten)]
    pub show: Show,
    pub disponibles: i32,
    pub concluida: bool,
}

impl From<Show> for ShowResponse {
    fn from(show: Show) -> Self {
        Self {
            disponibles: show.disponibles(),
            concluida: show.concluida(),
            show,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateShowSchema {
    pub obra: String,
    pub fecha: DateTime<Utc>,
    pub lugar: Option<String>,
    pub capacidad: i32,
    pub base_price: Decimal,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateShowSchema {
    pub obra: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
    pub lugar: Option<String>,
    pub capacidad: Option<i32>,
    pub base_price: Option<Decimal>,
}

// Emitir entradas contra la capacidad de la función
#[derive(Debug, Deserialize, Serialize)]
pub struct IssueTicketsPayload {
    pub cantidad: i32,
    pub vendedor_phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AssignTicketsPayload {
    pub vendedor_phone: String,
    pub cantidad: i32,
}

pub const PUNTUACION_MIN: i32 = 1;
pub const PUNTUACION_MAX: i32 = 10;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CerrarShowPayload {
    pub conclusion_director: Option<String>,
    pub puntuacion: Option<i32>,
}

impl CerrarShowPayload {
    pub fn puntuacion_valida(&self) -> bool {
        self.puntuacion
            .map_or(true, |p| (PUNTUACION_MIN..=PUNTUACION_MAX).contains(&p))
    }
}
