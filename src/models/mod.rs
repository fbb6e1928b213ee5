pub mod ensayo;
pub mod reporte;
pub mod show;
pub mod ticket;
pub mod user;
