// handlers/protected/mod.rs - endpoints behind the bearer middleware
//
// Every handler here receives the resolved `Principal` as a request extension.
pub mod account;
pub mod auth;
pub mod households;
pub mod members;
pub mod scores;
pub mod tasks;
