use std::{path::Path, sync::Arc};

use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Json},
};
use mime::Mime;
use serde::Deserialize;
use serde_json::json;
use tokio::fs; // Usamos el sistema de archivos asíncrono
use uuid::Uuid;

use crate::{
    config::Config,
    error::{ApiJson, AppError},
};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5MB
const PUBLIC_PREFIX: &str = "/uploads/";

#[derive(Debug, Deserialize)]
pub struct DeleteImagePayload {
    pub url: String,
}

/// Extensión con la que se guarda la imagen, según su tipo MIME.
/// Sin tipo, o con uno que no es imagen, no se acepta.
fn image_extension(content_type: Option<&Mime>) -> Option<&'static str> {
    let ct = content_type?;
    if ct.type_() != mime::IMAGE {
        return None;
    }
    match ct.subtype().as_str() {
        "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "gif" => Some("gif"),
        _ => None,
    }
}

/// Nombre de archivo dentro de la carpeta de uploads, o `None` si la URL apunta a otro lado.
fn stored_file_name(url: &str) -> Option<&str> {
    let name = url.strip_prefix(PUBLIC_PREFIX)?;
    let valid = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != ".."
        && !name.starts_with('.');
    valid.then_some(name)
}

// POST /api/upload/image
pub async fn upload_image_handler(
    State(config): State<Arc<Config>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    // 1. Crear la carpeta de uploads si no existe
    fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|e| AppError::internal(format!("No se pudo crear {}: {e}", config.upload_dir)))?;

    // 2. Buscar el campo "image" en el formulario enviado
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Formulario inválido: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("unknown.jpg").to_string();
        let content_type: Option<Mime> = field.content_type().and_then(|ct| ct.parse().ok());

        // La extensión sale del tipo MIME, nunca del nombre que manda el cliente
        let extension = image_extension(content_type.as_ref())
            .ok_or_else(|| AppError::bad_request("Solo se permiten imágenes (jpg, png, webp, gif)"))?;

        // 3. Generar nombre único (Ej: 550e8400-e29b....jpg)
        let new_filename = format!("{}.{}", Uuid::new_v4(), extension);
        let filepath = Path::new(&config.upload_dir).join(&new_filename);

        let data = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Error al leer el archivo"))?;

        if data.len() > MAX_IMAGE_BYTES {
            return Err(AppError::bad_request("La imagen excede el tamaño máximo de 5MB"));
        }

        fs::write(&filepath, data)
            .await
            .map_err(|e| AppError::internal(format!("No se pudo guardar la imagen: {e}")))?;

        tracing::info!(archivo = %new_filename, original = %file_name, "Imagen subida");
        return Ok(Json(json!({
            "url": format!("{PUBLIC_PREFIX}{new_filename}"),
            "original_name": file_name,
        })));
    }

    Err(AppError::bad_request("No se envió ningún campo 'image'"))
}

// DELETE /api/upload/image (admin)
pub async fn delete_image_handler(
    State(config): State<Arc<Config>>,
    ApiJson(body): ApiJson<DeleteImagePayload>,
) -> Result<impl IntoResponse, AppError> {
    let name = stored_file_name(body.url.trim())
        .ok_or_else(|| AppError::bad_request("URL de imagen inválida"))?;

    let filepath = Path::new(&config.upload_dir).join(name);
    match fs::remove_file(&filepath).await {
        Ok(()) => {
            tracing::info!(archivo = %name, "Imagen eliminada");
            Ok(Json(json!({ "ok": true, "mensaje": "Imagen eliminada" })))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::not_found("Imagen no encontrada"))
        }
        Err(e) => Err(AppError::internal(format!("No se pudo eliminar la imagen: {e}"))),
    }
}
