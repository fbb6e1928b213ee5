pub mod codes;
pub mod jwt;
pub mod qr;
pub mod security;
