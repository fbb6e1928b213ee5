use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Luma};
use qrcode::QrCode;

use crate::error::AppError;

const QR_MIN_PX: u32 = 256;

/// URL que abre la validación de una entrada en la puerta.
pub fn validation_url(public_url: &str, code: &str) -> String {
    format!("{public_url}/tickets/validar/{code}")
}

/// QR en PNG como data URL (`data:image/png;base64,...`).
pub fn qr_data_url(contenido: &str) -> Result<String, AppError> {
    let code = QrCode::new(contenido.as_bytes())
        .map_err(|e| AppError::internal(format!("Error generando QR: {e}")))?;
    let imagen = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_PX, QR_MIN_PX)
        .build();

    let mut png = Vec::new();
    imagen
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| AppError::internal(format!("Error codificando QR: {e}")))?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
