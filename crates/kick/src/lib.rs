//! Kick HTTP API collaborators.

pub mod channels;
pub mod delivery;

pub use {channels::KickClient, delivery::KickDelivery};
