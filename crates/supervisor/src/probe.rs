use async_trait::async_trait;

use crate::error::ProbeError;

/// Reports whether a channel is currently broadcasting.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_live(&self, channel: &str) -> Result<bool, ProbeError>;
}
