//! Backend de venta de entradas para un teatro.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod maintenance;
pub mod models;
pub mod routes;
pub mod utils;
