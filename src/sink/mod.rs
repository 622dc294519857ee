mod jsonl;

pub use jsonl::JsonlSink;

use crate::domain::LocationFix;
use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use thiserror::Error;

/// Storage boundary for accepted fixes. Every accepted fix is offered exactly once;
/// failures are local to that fix and never affect the sampling subscription.
#[async_trait]
pub trait FixSink: Debug + Send + Sync {
    async fn store(&self, fix: LocationFix) -> Result<(), SinkError>;
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink is unavailable: {0}")]
    Unavailable(#[from] io::Error),
    #[error("could not serialize fix: {0}")]
    Serialize(#[from] serde_json::Error),
}
