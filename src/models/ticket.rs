//! Entradas y su ciclo de vida.
//!
//! Una entrada avanza siempre hacia adelante por una secuencia fija:
//!
//! ```text
//! DISPONIBLE -> STOCK_VENDEDOR -> RESERVADO -> REPORTADA_VENDIDA -> PAGADO -> USADO
//! ```
//!
//! `USADO` es terminal. Los saltos y retrocesos se rechazan con
//! [`TransitionError`].

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketState {
    Disponible,
    StockVendedor,
    Reservado,
    ReportadaVendida,
    Pagado,
    Usado,
}

#[derive(Debug, Error)]
#[error("estado de ticket desconocido: {0}")]
pub struct UnknownTicketState(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("El ticket ya fue usado")]
    Terminal,
    #[error("No se puede pasar de {from} a {to}")]
    Invalid { from: TicketState, to: TicketState },
}

impl TicketState {
    pub const ALL: [TicketState; 6] = [
        TicketState::Disponible,
        TicketState::StockVendedor,
        TicketState::Reservado,
        TicketState::ReportadaVendida,
        TicketState::Pagado,
        TicketState::Usado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TicketState::Disponible => "DISPONIBLE",
            TicketState::StockVendedor => "STOCK_VENDEDOR",
            TicketState::Reservado => "RESERVADO",
            TicketState::ReportadaVendida => "REPORTADA_VENDIDA",
            TicketState::Pagado => "PAGADO",
            TicketState::Usado => "USADO",
        }
    }

    pub fn next(self) -> Option<TicketState> {
        match self {
            TicketState::Disponible => Some(TicketState::StockVendedor),
            TicketState::StockVendedor => Some(TicketState::Reservado),
            TicketState::Reservado => Some(TicketState::ReportadaVendida),
            TicketState::ReportadaVendida => Some(TicketState::Pagado),
            TicketState::Pagado => Some(TicketState::Usado),
            TicketState::Usado => None,
        }
    }

    /// Solo se permite avanzar exactamente un paso.
    pub fn check_transition(self, to: TicketState) -> Result<(), TransitionError> {
        match self.next() {
            None => Err(TransitionError::Terminal),
            Some(next) if next == to => Ok(()),
            Some(_) => Err(TransitionError::Invalid { from: self, to }),
        }
    }

    /// La entrada ya salió de manos del teatro hacia un comprador.
    pub fn is_sold(self) -> bool {
        matches!(
            self,
            TicketState::Reservado
                | TicketState::ReportadaVendida
                | TicketState::Pagado
                | TicketState::Usado
        )
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketState {
    type Err = UnknownTicketState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownTicketState(s.to_string()))
    }
}

impl TryFrom<String> for TicketState {
    type Error = UnknownTicketState;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub code: String,
    pub show_id: i64,
    #[sqlx(try_from = "String")]
    pub estado: TicketState,
    pub vendedor_phone: Option<String>,
    pub comprador_nombre: Option<String>,
    pub comprador_contacto: Option<String>,
    pub precio: Option<Decimal>,
    pub medio_pago: Option<String>,
    pub created_at: DateTime<Utc>,
    pub asignado_at: Option<DateTime<Utc>>,
    pub reservado_at: Option<DateTime<Utc>>,
    pub reportada_at: Option<DateTime<Utc>>,
    pub pagado_at: Option<DateTime<Utc>>,
    pub usado_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReservePayload {
    pub comprador_nombre: String,
    pub comprador_contacto: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReportSoldPayload {
    pub precio: Decimal,
    pub medio_pago: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransferPayload {
    pub vendedor_destino: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MisTicketsQuery {
    pub show_id: Option<i64>,
}

/// Conteos por estado de un conjunto de entradas.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    pub disponibles: i64,
    pub en_stock: i64,
    pub reservadas: i64,
    pub reportadas_vendidas: i64,
    pub pagadas: i64,
    pub usadas: i64,
}

impl StateCounts {
    pub fn add(&mut self, state: TicketState, n: i64) {
        let slot = match state {
            TicketState::Disponible => &mut self.disponibles,
            TicketState::StockVendedor => &mut self.en_stock,
            TicketState::Reservado => &mut self.reservadas,
            TicketState::ReportadaVendida => &mut self.reportadas_vendidas,
            TicketState::Pagado => &mut self.pagadas,
            TicketState::Usado => &mut self.usadas,
        };
        *slot += n;
    }

    pub fn from_tickets<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> Self {
        let mut counts = Self::default();
        for ticket in tickets {
            counts.add(ticket.estado, 1);
        }
        counts
    }
}
