pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod sanitize;
pub mod scoring;
pub mod services;
pub mod testing;
pub mod types;
