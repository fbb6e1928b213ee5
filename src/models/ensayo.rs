use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ensayo {
    pub id: i64,
    pub titulo: String,
    pub fecha: DateTime<Utc>,
    pub lugar: String,
    pub descripcion: Option<String>,
    pub director_phone: Option<String>,
    pub actores: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ensayo {
    pub fn incluye_actor(&self, phone: &str) -> bool {
        self.actores.0.iter().any(|a| a == phone)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateEnsayoSchema {
    pub titulo: String,
    pub fecha: DateTime<Utc>,
    pub lugar: String,
    pub descripcion: Option<String>,
    #[serde(default)]
    pub actores: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateEnsayoSchema {
    pub titulo: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
    pub lugar: Option<String>,
    pub descripcion: Option<String>,
    pub actores: Option<Vec<String>>,
}
