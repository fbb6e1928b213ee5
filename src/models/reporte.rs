use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

use super::{show::Show, ticket::StateCounts};

/// Totales de una función agrupados por vendedor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumenVendedor {
    pub vendedor_phone: String,
    pub vendedor_nombre: String,
    pub en_stock: i64,
    pub reservadas: i64,
    pub reportadas_vendidas: i64,
    pub pagadas: i64,
    pub usadas: i64,
    // Plata cobrada por el vendedor que todavía no entregó
    pub monto_debe: Decimal,
    pub monto_pagado: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ResumenFuncion {
    pub show: Show,
    #[serde(flatten)]
    pub conteos: StateCounts,
    pub monto_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct Deudores {
    pub show_id: i64,
    pub total_deuda: Decimal,
    pub vendedores_deudores: Vec<ResumenVendedor>,
}

// Foto fija de una función concluida
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reporte {
    pub id: i64,
    pub show_id: Option<i64>,
    pub nombre_obra: String,
    pub fecha_show: DateTime<Utc>,
    pub generado_por: Option<String>,
    pub total_tickets: i64,
    pub tickets_vendidos: i64,
    pub tickets_usados: i64,
    pub ingresos_totales: Decimal,
    pub datos_vendedores: Json<Vec<ResumenVendedor>>,
    pub created_at: DateTime<Utc>,
}

