use uuid::Uuid;

/// Código de entrada: `T-` seguido de 8 caracteres hexadecimales en mayúscula.
pub fn generate_ticket_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("T-{}", hex[..8].to_uppercase())
}
