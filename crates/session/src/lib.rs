//! Per-channel bot sessions.
//!
//! A [`BotSession`] runs while its channel is live: one chat listener feeds
//! a [`GenerationScheduler`], which refills a [`MessagePool`] that a set of
//! paced sender actors ([`SenderPool`]) drains.

pub mod error;
pub mod generation;
pub mod pool;
pub mod recent;
pub mod sender;
pub mod session;

pub use {
    error::{DeliveryError, GenerationError, ResolveError, SessionError},
    generation::{CycleOutcome, GenerationScheduler, GenerationService},
    pool::MessagePool,
    recent::{RECENT_CAPACITY, RecentMessages},
    sender::{DeliveryService, Pacing, SenderPool},
    session::{BotSession, SessionDeps, SessionSettings, StreamTargetResolver},
};
