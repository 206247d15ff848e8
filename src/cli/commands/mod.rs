pub mod database;
pub mod scoring;
pub mod server;
