pub mod admin;
pub mod auth;
pub mod ensayo;
pub mod health;
pub mod reporte;
pub mod show;
pub mod ticket;
pub mod upload;
pub mod user;
