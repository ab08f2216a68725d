//! HTTP control surface for the channel supervisor.

pub mod bots_routes;
pub mod server;

pub use server::{AppState, StartDefaults, build_app, serve};
