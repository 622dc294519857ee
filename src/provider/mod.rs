mod simulated;

pub use simulated::SimulatedFixProvider;

use crate::domain::{FixBatch, LocationFix};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// Receives fix deliveries from an active subscription.
#[async_trait]
pub trait FixHandler: Debug + Send + Sync {
    async fn on_batch(&self, batch: FixBatch);
}

/// Boundary to the platform location API.
#[async_trait]
pub trait FixProvider: Debug + Send + Sync {
    /// One-shot lookup of the most recent known fix, if any.
    async fn last_fix(&self) -> Result<Option<LocationFix>, ProviderError>;

    /// Establishes a recurring fix subscription. Every `on_batch` callback must be
    /// dispatched on `context`; providers may not infer a delivery context ambiently.
    async fn subscribe(&self, descriptor: RequestDescriptor, handler: Arc<dyn FixHandler>, context: Handle) -> Result<SubscriptionHandle, SubscribeError>;

    /// Releases a subscription. Idempotent, unknown or already released handles are ignored.
    async fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Concrete fix request derived from the sampling configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub interval: Duration,
    pub fastest_interval: Duration,
    pub priority: Priority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    HighAccuracy,
}

/// Opaque token for an active subscription. Owned exclusively by the lifecycle controller
/// and invalidated by `unsubscribe`, which consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub(crate) fn new(id: u64) -> Self {
        SubscriptionHandle(id)
    }

    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("fix provider is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum SubscribeError {
    #[error("fine location capability is not granted")]
    CapabilityDenied,
}
