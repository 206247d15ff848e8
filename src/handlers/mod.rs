// handlers/mod.rs - two-tier handler layout
//
// Public (no auth) → Protected (bearer token resolved to a Principal).
// Parent-only and member-only rules are enforced by the services the
// protected handlers call.
pub mod protected;
pub mod public;
