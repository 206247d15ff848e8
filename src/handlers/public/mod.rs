// handlers/public/mod.rs - endpoints reachable without a token
//
// Registration and token acquisition for both credential domains.
pub mod auth;
pub mod users;
