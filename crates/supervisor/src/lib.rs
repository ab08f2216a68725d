//! Channel lifecycle supervision.
//!
//! [`ChannelSupervisor`] keeps a registry of managed channels. Each entry is
//! owned by a monitoring task that probes liveness on an interval and runs a
//! bot session while the channel is live.

pub mod error;
pub mod probe;
pub mod state;
pub mod supervisor;
pub mod task;

pub use {
    error::{ProbeError, Result, SupervisorError},
    probe::LivenessProbe,
    state::ChannelState,
    supervisor::{ChannelStatus, ChannelSupervisor, SupervisorSettings},
    task::{TaskHandle, spawn_supervised},
};
